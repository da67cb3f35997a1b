// Copyright 2025 qlpc-rs developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dense linear algebra for the iterative solvers.

use nalgebra::DMatrix;

/// Marker returned when a pivot collapses during factorisation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct SingularMatrix;

/// Solves `a * x = b` for symmetric positive-definite `a` in place.
///
/// The strictly-lower triangle of `a` is overwritten with the Cholesky
/// factor scaled by the reciprocal pivot roots, which are stored in
/// `inv_diag`; the upper triangle holds the original matrix afterwards.
/// Back-substitution then runs in two passes over the factor.
///
/// A pivot `<= 0` means `a` was not positive definite and the solve fails
/// with [`SingularMatrix`] leaving `x` partially written.
///
/// The reciprocal square root goes through `powf(-0.5)`; `1.0 / sqrt()`
/// takes a different rounding path and would break stream interoperability
/// with the reference coder.
pub(crate) fn solve_symmetric_positive(
    a: &mut DMatrix<f64>,
    b: &[f64],
    x: &mut [f64],
    inv_diag: &mut [f64],
) -> Result<(), SingularMatrix> {
    let dim = b.len();
    debug_assert!(x.len() >= dim);
    debug_assert!(inv_diag.len() >= dim);
    debug_assert!(a.nrows() >= dim && a.ncols() >= dim);

    for i in 0..dim {
        let mut sum = a[(i, i)];
        for k in (0..i).rev() {
            sum -= a[(i, k)] * a[(i, k)];
        }
        if sum <= 0.0 {
            return Err(SingularMatrix);
        }
        inv_diag[i] = sum.powf(-0.5);
        for j in (i + 1)..dim {
            let mut sum = a[(i, j)];
            for k in (0..i).rev() {
                sum -= a[(i, k)] * a[(j, k)];
            }
            a[(j, i)] = sum * inv_diag[i];
        }
    }

    for i in 0..dim {
        let mut sum = b[i];
        for j in (0..i).rev() {
            sum -= a[(i, j)] * x[j];
        }
        x[i] = sum * inv_diag[i];
    }
    for i in (0..dim).rev() {
        let mut sum = x[i];
        for j in (i + 1)..dim {
            sum -= a[(j, i)] * x[j];
        }
        x[i] = sum * inv_diag[i];
    }

    Ok(())
}
