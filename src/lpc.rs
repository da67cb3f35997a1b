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

//! Estimation of (unquantized) linear-prediction coefficients.

use log::debug;
use log::trace;
use nalgebra::DMatrix;

use super::config::CalculatorConfig;
use super::constant::AF_OBJECTIVE_EPSILON;
use super::constant::AF_RESIDUAL_EPSILON;
use super::constant::LAPLACE_BETA;
use super::error::LpcError;
use super::error::Verify;
use super::error::VerifyError;
use super::linalg::solve_symmetric_positive;
use super::mem::Scratch;
use super::mem::Workspace;
use super::window::apply_window;
use super::window::Window;

/// Computes lagged autocorrelation of `data` for `dest.len()` lags.
///
/// For lags `t >= 1`, runs of terms sharing a multiplicand are folded as
/// `x[l+t] * (x[l] + x[l+2t])` so each load feeds two products; the
/// leftover tail is accumulated directly. The result equals the plain
/// `sum of x[i] * x[i+t]` up to floating-point associativity.
pub(crate) fn auto_correlation(data: &[f64], dest: &mut [f64]) {
    let num_samples = data.len();
    let order = dest.len();
    if order == 0 {
        return;
    }
    for p in dest.iter_mut() {
        *p = 0.0;
    }

    for &x in data {
        dest[0] += x * x;
    }

    for lag in 1..order {
        let lag2 = lag * 2;
        // number of whole groups sharing a multiplicand
        let num_groups = if 3 * lag < num_samples {
            1 + (num_samples - 3 * lag) / lag2
        } else {
            0
        };
        let grouped_end = num_groups * lag2;

        let mut acc = 0.0;
        for i in 0..lag {
            let mut l = 0;
            while l < grouped_end {
                acc += data[l + lag + i] * (data[l + i] + data[l + lag2 + i]);
                l += lag2;
            }
        }
        for i in 0..num_samples.saturating_sub(grouped_end + lag) {
            acc += data[grouped_end + lag + i] * data[grouped_end + i];
        }
        dest[lag] = acc;
    }
}

/// Levinson-Durbin recursion over `s.corr`, leaving LPC coefficients
/// (with `a[0] == 1`) in `s.lpc` and PARCOR coefficients in `s.parcor`.
fn levinson_durbin(s: &mut Scratch<'_>, coef_order: usize) {
    // A square sum this small is digital silence; predict it with an
    // all-zero system.
    if s.corr[0].abs() < f64::from(f32::EPSILON) {
        trace!("autocorrelation energy below epsilon; emitting a zero predictor");
        for i in 0..=coef_order {
            s.lpc[i] = 0.0;
            s.parcor[i] = 0.0;
        }
        return;
    }

    for i in 0..coef_order + 2 {
        s.a[i] = 0.0;
        s.u[i] = 0.0;
        s.v[i] = 0.0;
    }

    // order-1 step, unrolled
    s.a[0] = 1.0;
    let mut ek = s.corr[0];
    s.a[1] = -s.corr[1] / s.corr[0];
    s.parcor[0] = 0.0;
    s.parcor[1] = s.corr[1] / ek;
    ek += s.corr[1] * s.a[1];
    s.u[0] = 1.0;
    s.u[1] = 0.0;
    s.v[0] = 0.0;
    s.v[1] = 1.0;

    for k in 1..coef_order {
        let mut gamma = 0.0;
        for i in 0..=k {
            gamma += s.a[i] * s.corr[k + 1 - i];
        }
        gamma /= -ek;
        ek *= 1.0 - gamma * gamma;
        // prediction error power cannot go negative
        debug_assert!(ek >= 0.0);

        // u is a padded on the right, v is a reversed padded on the left
        for i in 0..k {
            s.u[i + 1] = s.a[i + 1];
            s.v[k - i] = s.a[i + 1];
        }
        s.u[0] = 1.0;
        s.u[k + 1] = 0.0;
        s.v[0] = 0.0;
        s.v[k + 1] = 1.0;

        for i in 0..k + 2 {
            s.a[i] = s.u[i] + gamma * s.v[i];
        }
        // PARCOR is the sign-flipped reflection coefficient
        s.parcor[k + 1] = -gamma;
        debug_assert!(gamma.abs() < 1.0);
    }

    s.lpc[..=coef_order].copy_from_slice(&s.a[..=coef_order]);
}

/// Accumulates the weighted normal equations of one IRLS step.
///
/// The weight of sample `t` is the reciprocal of its (floored) absolute
/// forward residual under the current coefficients `a_vec`. Returns the
/// objective, the mean absolute residual over `t in [order, n)`.
fn accumulate_normal_equations(
    data: &[f64],
    a_vec: &[f64],
    mat: &mut DMatrix<f64>,
    b_vec: &mut [f64],
) -> f64 {
    let coef_order = a_vec.len();
    let num_samples = data.len();

    for i in 0..coef_order {
        b_vec[i] = 0.0;
        for j in 0..coef_order {
            mat[(i, j)] = 0.0;
        }
    }

    let mut obj_value = 0.0;
    for t in coef_order..num_samples {
        let mut residual = data[t];
        for i in 0..coef_order {
            residual += a_vec[i] * data[t - i - 1];
        }
        let residual = residual.abs();
        obj_value += residual;
        // floor tiny residuals; their reciprocal weight would explode
        let inv_residual = 1.0 / residual.max(AF_RESIDUAL_EPSILON);
        for i in 0..coef_order {
            b_vec[i] -= data[t] * data[t - i - 1] * inv_residual;
            for j in i..coef_order {
                mat[(i, j)] += data[t - i - 1] * data[t - j - 1] * inv_residual;
            }
        }
    }

    for i in 0..coef_order {
        for j in (i + 1)..coef_order {
            mat[(j, i)] = mat[(i, j)];
        }
    }

    obj_value / (num_samples as f64 - coef_order as f64)
}

/// Reusable compute context for LPC estimation.
///
/// An estimator owns all of its scratch memory (sized by the caps in
/// [`CalculatorConfig`], see [`calculate_work_size`]) and performs no
/// allocation per call. It is not internally synchronised; use one
/// instance per worker.
///
/// [`calculate_work_size`]: crate::mem::calculate_work_size
pub struct LpcEstimator {
    max_order: usize,
    max_num_samples: usize,
    work: Workspace,
    rmat: DMatrix<f64>,
}

impl LpcEstimator {
    /// Creates an estimator for the given caps.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` when `config` fails verification.
    pub fn new(config: &CalculatorConfig) -> Result<Self, VerifyError> {
        config.verify()?;
        Ok(Self {
            max_order: config.max_order,
            max_num_samples: config.max_num_samples,
            work: Workspace::new(config),
            rmat: DMatrix::zeros(config.max_order + 1, config.max_order + 1),
        })
    }

    /// Returns the order cap this estimator was created with.
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Returns the block-length cap this estimator was created with.
    pub fn max_num_samples(&self) -> usize {
        self.max_num_samples
    }

    fn check_caps(&self, num_samples: usize, coef_order: usize) -> Result<(), LpcError> {
        if coef_order > self.max_order {
            return Err(LpcError::ExceedMaxOrder {
                order: coef_order,
                max_order: self.max_order,
            });
        }
        if num_samples > self.max_num_samples {
            return Err(LpcError::ExceedMaxNumSamples {
                num_samples,
                max_num_samples: self.max_num_samples,
            });
        }
        Ok(())
    }

    /// Windows the signal, computes its autocorrelation and runs the
    /// Levinson-Durbin recursion, leaving results in the workspace.
    fn calculate_coef(
        &mut self,
        signal: &[f64],
        coef_order: usize,
        window: Window,
    ) -> Result<(), LpcError> {
        let num_samples = signal.len();
        let mut s = self.work.scratch();

        apply_window(window, signal, &mut s.windowed[..]);
        auto_correlation(&s.windowed[..num_samples], &mut s.corr[..=coef_order]);
        if !s.corr[0].is_finite() {
            return Err(LpcError::FailedToCalculate);
        }

        // Short blocks make the recursion diverge; treat them as silence.
        if num_samples < coef_order {
            for i in 0..=coef_order {
                s.lpc[i] = 0.0;
                s.parcor[i] = 0.0;
            }
            return Ok(());
        }

        levinson_durbin(&mut s, coef_order);
        Ok(())
    }

    /// Estimates LPC coefficients with the autocorrelation method
    /// (Levinson-Durbin recursion).
    ///
    /// `dest.len()` selects the predictor order. On success `dest` holds
    /// the coefficients for taps 1 through `dest.len()`; the leading tap
    /// is the implicit 1.0 and is not written.
    ///
    /// # Errors
    ///
    /// Cap violations are reported before any buffer is touched;
    /// non-finite input surfaces as `FailedToCalculate`.
    pub fn lpc_coefficients(
        &mut self,
        signal: &[f64],
        window: Window,
        dest: &mut [f64],
    ) -> Result<(), LpcError> {
        let coef_order = dest.len();
        self.check_caps(signal.len(), coef_order)?;
        self.calculate_coef(signal, coef_order, window)?;
        dest.copy_from_slice(&self.work.lpc_coef()[1..=coef_order]);
        Ok(())
    }

    /// Estimates LPC coefficients with the auxiliary-function method,
    /// iteratively reweighted least squares minimising the mean absolute
    /// forward residual.
    ///
    /// The solution is seeded from [`Self::lpc_coefficients`] on the
    /// windowed signal; the reweighting iterations then run on the raw
    /// signal. Stability of the result is not guaranteed.
    ///
    /// Unlike [`Self::lpc_coefficients`], `dest` receives the solver's
    /// coefficients starting at index 0; no implicit leading tap was ever
    /// stored. The two layouts cannot be unified without breaking streams
    /// written by existing coders.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lpc_coefficients`].
    pub fn lpc_coefficients_af(
        &mut self,
        signal: &[f64],
        window: Window,
        dest: &mut [f64],
        max_iterations: usize,
    ) -> Result<(), LpcError> {
        let coef_order = dest.len();
        self.check_caps(signal.len(), coef_order)?;
        self.calculate_coef_af(signal, coef_order, max_iterations, window)?;
        dest.copy_from_slice(&self.work.lpc_coef()[..coef_order]);
        Ok(())
    }

    fn calculate_coef_af(
        &mut self,
        signal: &[f64],
        coef_order: usize,
        max_iterations: usize,
        window: Window,
    ) -> Result<(), LpcError> {
        self.calculate_coef(signal, coef_order, window)?;

        let rmat = &mut self.rmat;
        let Scratch {
            a: a_vec,
            u: r_vec,
            v: inv_diag,
            corr,
            lpc,
            ..
        } = self.work.scratch();

        a_vec[..coef_order].copy_from_slice(&lpc[1..=coef_order]);

        // Digital silence was already answered with a zero predictor.
        if corr[0].abs() < f64::from(f32::EPSILON) {
            for p in &mut lpc[..=coef_order] {
                *p = 0.0;
            }
            return Ok(());
        }

        let mut prev_obj = f64::from(f32::MAX);
        for iteration in 0..max_iterations {
            let obj = accumulate_normal_equations(
                signal,
                &a_vec[..coef_order],
                rmat,
                &mut r_vec[..coef_order],
            );
            if solve_symmetric_positive(
                rmat,
                &r_vec[..coef_order],
                &mut a_vec[..coef_order],
                &mut inv_diag[..coef_order],
            )
            .is_err()
            {
                // Singular normal equations mean the input was all-zero.
                debug!("normal equations are singular; emitting a zero predictor");
                for p in &mut lpc[..coef_order] {
                    *p = 0.0;
                }
                return Ok(());
            }
            trace!("af iteration {iteration}: mean |residual| = {obj}");
            if (prev_obj - obj).abs() < AF_OBJECTIVE_EPSILON {
                break;
            }
            prev_obj = obj;
        }

        lpc[..coef_order].copy_from_slice(&a_vec[..coef_order]);
        Ok(())
    }

    /// Estimates LPC coefficients with the Burg method (autocovariance
    /// lattice formulation). No window is applied.
    ///
    /// `dest` uses the same layout as [`Self::lpc_coefficients_af`]:
    /// coefficients from index 0, no implicit leading tap. Stability of
    /// the result is not guaranteed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lpc_coefficients`].
    pub fn lpc_coefficients_burg(
        &mut self,
        signal: &[f64],
        dest: &mut [f64],
    ) -> Result<(), LpcError> {
        let coef_order = dest.len();
        self.check_caps(signal.len(), coef_order)?;
        self.calculate_coef_burg(signal, coef_order)?;
        dest.copy_from_slice(&self.work.lpc_coef()[..coef_order]);
        Ok(())
    }

    fn calculate_coef_burg(&mut self, signal: &[f64], coef_order: usize) -> Result<(), LpcError> {
        let num_samples = signal.len();
        let cov = &mut self.rmat;
        let Scratch {
            a: a_vec,
            u: corr_scratch,
            lpc,
            ..
        } = self.work.scratch();

        // Autocovariance: row i is the autocorrelation of x[0..n-i) laid
        // out from its own diagonal element, mirrored to the lower half.
        for i in 0..=coef_order {
            let head = &signal[..num_samples.saturating_sub(i)];
            let row = &mut corr_scratch[..coef_order + 1 - i];
            auto_correlation(head, row);
            for (t, &value) in row.iter().enumerate() {
                cov[(i, i + t)] = value;
            }
            for j in (i + 1)..=coef_order {
                cov[(j, i)] = cov[(i, j)];
            }
        }

        if !cov[(0, 0)].is_finite() {
            return Err(LpcError::FailedToCalculate);
        }
        if cov[(0, 0)].abs() < f64::from(f32::EPSILON) {
            trace!("signal energy below epsilon; emitting a zero predictor");
            for p in &mut lpc[..=coef_order] {
                *p = 0.0;
            }
            return Ok(());
        }

        for p in &mut a_vec[..=coef_order] {
            *p = 0.0;
        }
        a_vec[0] = 1.0;

        for k in 0..coef_order {
            let mut fk_plus_bk = 0.0;
            let mut offdiag = 0.0;
            let mut ck = 0.0;
            for i in 0..=k {
                fk_plus_bk +=
                    a_vec[i] * a_vec[i] * (cov[(i, i)] + cov[(k + 1 - i, k + 1 - i)]);
                // off-diagonal terms folded once via symmetry
                for j in (i + 1)..=k {
                    offdiag += a_vec[i] * a_vec[j] * (cov[(i, j)] + cov[(k + 1 - i, k + 1 - j)]);
                }
            }
            fk_plus_bk += 2.0 * offdiag;
            for i in 0..=k {
                for j in 0..=k {
                    ck += a_vec[i] * a_vec[j] * cov[(i, k + 1 - j)];
                }
            }
            // negated reflection coefficient
            let mu = -2.0 * ck / fk_plus_bk;
            debug_assert!(mu.abs() <= 1.0);
            for i in 0..=(k + 1) / 2 {
                let tmp1 = a_vec[i];
                let tmp2 = a_vec[k + 1 - i];
                a_vec[i] = tmp1 + mu * tmp2;
                a_vec[k + 1 - i] = mu * tmp1 + tmp2;
            }
        }

        lpc[..coef_order].copy_from_slice(&a_vec[1..=coef_order]);
        Ok(())
    }

    /// Estimates the per-sample code length (in bits) of the residual a
    /// Laplacian entropy coder would produce for an order-`coef_order`
    /// predictor.
    ///
    /// `bits_per_sample` rescales the float signal to the amplitude of the
    /// underlying integer PCM. Near-silent input yields 0.0; estimates
    /// that come out non-positive are clamped to 1.0.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lpc_coefficients`].
    pub fn estimate_code_length(
        &mut self,
        signal: &[f64],
        bits_per_sample: usize,
        coef_order: usize,
        window: Window,
    ) -> Result<f64, LpcError> {
        self.check_caps(signal.len(), coef_order)?;
        self.calculate_coef(signal, coef_order, window)?;

        // lag-0 autocorrelation is the signal power
        let scaled_power =
            self.work.auto_corr()[0] * (2.0f64).powi(2 * (bits_per_sample as i32 - 1));
        if scaled_power.abs() <= f64::from(f32::MIN_POSITIVE) {
            return Ok(0.0);
        }
        let log2_mean_res_power = scaled_power.log2() - (signal.len() as f64).log2();

        // The order-0 PARCOR is pinned to zero, so the sum starts at 1.
        let parcor = self.work.parcor_coef();
        let mut log2_var_ratio = 0.0;
        for &k in &parcor[1..=coef_order] {
            log2_var_ratio += (1.0 - k * k).log2();
        }

        let estimate = LAPLACE_BETA + 0.5 * (log2_mean_res_power + log2_var_ratio);
        // Very low-power input can push the entropy estimate below zero;
        // one bit per sample is still needed.
        if estimate <= 0.0 {
            return Ok(1.0);
        }
        Ok(estimate)
    }

    /// Computes the minimum description length of an order-`coef_order`
    /// model of the signal. Smaller is better; no clamping is applied.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lpc_coefficients`].
    pub fn mdl(
        &mut self,
        signal: &[f64],
        coef_order: usize,
        window: Window,
    ) -> Result<f64, LpcError> {
        self.check_caps(signal.len(), coef_order)?;
        self.calculate_coef(signal, coef_order, window)?;

        let parcor = self.work.parcor_coef();
        let num_samples = signal.len() as f64;
        let mut mdl = 0.0;
        for &k in &parcor[1..=coef_order] {
            mdl += (1.0 - k * k).ln();
        }
        mdl *= num_samples;
        mdl += coef_order as f64 * num_samples.ln();
        Ok(mdl)
    }
}
