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

#![doc = include_str!("../README.md")]
#![warn(clippy::all, clippy::nursery, clippy::pedantic, clippy::cargo)]
// Some of clippy::pedantic rules are actually useful, so use it with a lot of
// ad-hoc exceptions.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_const_for_fn,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate
)]
// Some from restriction lint-group
#![warn(
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::empty_structs_with_brackets,
    clippy::exit,
    clippy::if_then_some_else_none,
    clippy::let_underscore_must_use,
    clippy::lossy_float_literal,
    clippy::print_stdout,
    clippy::rc_buffer,
    clippy::rc_mutex,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::separated_literal_suffix,
    clippy::str_to_string,
    clippy::string_add,
    clippy::string_to_string,
    clippy::unnecessary_self_imports,
    clippy::wildcard_enum_match_arm
)]

pub mod config;
pub mod constant;
pub mod error;
pub(crate) mod linalg;
pub mod lpc;
pub mod mem;
pub mod qlpc;
pub mod sigen;
pub mod window;

#[cfg(any(test, feature = "test_helper"))]
pub mod test_helper;

// import global entry points
pub use config::CalculatorConfig;
pub use lpc::LpcEstimator;
pub use mem::calculate_work_size;
pub use qlpc::QuantizedParameters;
pub use window::Window;

#[cfg(test)]
mod test {
    // end-to-end, but transparent test.
    use super::*;
    use super::sigen::Signal;

    use rstest::rstest;

    fn estimate_quantize(
        estimator: &mut LpcEstimator,
        pcm: &[i32],
        order: usize,
        precision: usize,
        window: Window,
    ) -> QuantizedParameters {
        let signal: Vec<f64> = pcm.iter().map(|&x| f64::from(x)).collect();
        let mut coefs = vec![0.0f64; order];
        estimator
            .lpc_coefficients(&signal, window, &mut coefs)
            .expect("estimation failed");
        QuantizedParameters::quantize(&coefs, precision).expect("quantization failed")
    }

    fn assert_round_trip(qp: &QuantizedParameters, pcm: &[i32]) {
        let mut residual = vec![0i32; pcm.len()];
        qp.predict(pcm, &mut residual);
        let mut decoded = residual;
        qp.synthesize(&mut decoded);
        assert_eq!(decoded, pcm, "round trip is not bit-exact");
    }

    #[rstest]
    fn e2e_round_trip_with_noisy_sinusoid(
        #[values(2, 8, 32)] order: usize,
        #[values(10, 12, 15)] precision: usize,
        #[values(Window::Rectangular, Window::Sine, Window::Welch)] window: Window,
    ) {
        let pcm = test_helper::sinusoid_plus_noise(4096, 36, 10000.0, 123);
        let mut estimator =
            LpcEstimator::new(&CalculatorConfig::default()).expect("construction failed");
        let qp = estimate_quantize(&mut estimator, &pcm, order, precision, window);
        assert_round_trip(&qp, &pcm);
    }

    #[test]
    fn e2e_alternating_block() {
        let pcm: Vec<i32> = (0..64)
            .map(|t| if t % 2 == 0 { 1 << 14 } else { -(1 << 14) })
            .collect();
        let config = CalculatorConfig {
            max_order: 4,
            max_num_samples: 64,
        };
        let mut estimator = LpcEstimator::new(&config).expect("construction failed");
        let qp = estimate_quantize(&mut estimator, &pcm, 4, 12, Window::Rectangular);
        assert_round_trip(&qp, &pcm);

        // an alternating block is nearly perfectly predictable
        let mut residual = vec![0i32; pcm.len()];
        qp.predict(&pcm, &mut residual);
        let residual_abs: i64 = residual[4..].iter().map(|&x| i64::from(x.abs())).sum();
        let input_abs: i64 = pcm[4..].iter().map(|&x| i64::from(x.abs())).sum();
        assert!(residual_abs * 10 < input_abs);
    }

    #[rstest]
    fn e2e_round_trip_with_af_and_burg(#[values(1, 2, 8)] order: usize) {
        let pcm = test_helper::sinusoid_plus_noise(2048, 48, 8000.0, 64);
        let signal: Vec<f64> = pcm.iter().map(|&x| f64::from(x)).collect();
        let mut estimator =
            LpcEstimator::new(&CalculatorConfig::default()).expect("construction failed");

        let mut coefs = vec![0.0f64; order];
        estimator
            .lpc_coefficients_af(&signal, Window::Sine, &mut coefs, 8)
            .expect("estimation failed");
        let qp = QuantizedParameters::quantize(&coefs, 12).expect("quantization failed");
        assert_round_trip(&qp, &pcm);

        let mut coefs = vec![0.0f64; order];
        estimator
            .lpc_coefficients_burg(&signal, &mut coefs)
            .expect("estimation failed");
        let qp = QuantizedParameters::quantize(&coefs, 12).expect("quantization failed");
        assert_round_trip(&qp, &pcm);
    }

    #[test]
    fn e2e_long_block_high_order() {
        let pcm = sigen::Sine::new(100, 0.7)
            .noise_with_seed(2025, 0.01)
            .to_vec_quantized(16, 48000);
        let config = CalculatorConfig {
            max_order: 32,
            max_num_samples: 48000,
        };
        let mut estimator = LpcEstimator::new(&config).expect("construction failed");
        let qp = estimate_quantize(&mut estimator, &pcm, 32, 12, Window::Sine);
        assert_round_trip(&qp, &pcm);
    }

    #[test]
    fn e2e_silence() {
        let pcm = vec![0i32; 128];
        let config = CalculatorConfig {
            max_order: 10,
            max_num_samples: 128,
        };
        let mut estimator = LpcEstimator::new(&config).expect("construction failed");
        let qp = estimate_quantize(&mut estimator, &pcm, 10, 12, Window::Sine);
        assert_eq!(qp.coefs(), &[0i32; 10]);
        assert_eq!(qp.rshift(), 12);
        assert_round_trip(&qp, &pcm);
    }

    #[test]
    fn work_size_is_monotone_in_caps() {
        let small = calculate_work_size(&CalculatorConfig {
            max_order: 8,
            max_num_samples: 1024,
        });
        let large = calculate_work_size(&CalculatorConfig {
            max_order: 16,
            max_num_samples: 4096,
        });
        assert!(small > 0);
        assert!(small < large);
    }
}
