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

//! Configuration constants

/// Maximum LPC order supported by this crate.
///
/// This is the compile-time ceiling; the per-estimator cap
/// (`CalculatorConfig::max_order`) must not exceed it.
pub const MAX_LPC_ORDER: usize = 32;

/// Maximum LPC order plus one (size of the coefficient/PARCOR storage).
pub const MAX_LPC_ORDER_PLUS_1: usize = MAX_LPC_ORDER + 1;

/// Maximum number of samples in a block.
pub const MAX_BLOCK_SIZE: usize = 65536;

/// Default per-estimator order cap.
pub const QLPC_DEFAULT_MAX_ORDER: usize = 32;

/// Default per-estimator block-length cap.
pub const QLPC_DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

/// Default precision (in bits, sign included) for quantized coefficients.
pub const QLPC_DEFAULT_PRECISION: usize = 12;

/// Max precision for quantized coefficients.
///
/// Keeps the prediction dot product and its rounding constant inside the
/// 32-bit accumulator for every representable shift.
pub const QLPC_MAX_PRECISION: usize = 15;

/// Alignment (in bytes) of the buffers carved out of the workspace arena.
pub const WORK_ALIGNMENT: usize = 16;

/// Floor applied to `|residual|` in the IRLS weight update, avoiding a
/// division by zero on exactly-predicted samples.
pub(crate) const AF_RESIDUAL_EPSILON: f64 = 1e-6;

/// Convergence threshold on the IRLS objective (mean absolute residual).
pub(crate) const AF_OBJECTIVE_EPSILON: f64 = 1e-8;

/// `sqrt(2 * e * e)`: per-sample entropy offset of a Laplacian residual.
pub(crate) const LAPLACE_BETA: f64 = 1.942_695_040_888_963_4;
