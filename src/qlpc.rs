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

//! Fixed-point coefficient quantization and integer prediction filters.

use super::constant::MAX_LPC_ORDER;
use super::constant::QLPC_MAX_PRECISION;
use super::error::LpcError;
use super::error::RangeError;

/// Rounds half away from zero, matching the reference coder's fixed-point
/// path (`floor(x + 0.5)` applied to the magnitude).
#[inline]
fn round_half_away(x: f64) -> f64 {
    if x >= 0.0 {
        (x + 0.5).floor()
    } else {
        -((-x + 0.5).floor())
    }
}

/// Binary exponent `e` of `x` with `x` in `[2^(e-1), 2^e)`.
///
/// Matches the exponent output of C `frexp`; reading the IEEE-754 bit
/// pattern keeps powers of two on the correct side of the boundary.
#[inline]
fn binary_exponent(x: f64) -> i32 {
    debug_assert!(x > 0.0 && x.is_finite());
    let biased = ((x.to_bits() >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: renormalize first
        return binary_exponent(x * (2.0f64).powi(64)) - 64;
    }
    biased - 1022
}

/// Quantized LPC coefficients.
///
/// The pair of the integer coefficient vector and the right-shift amount
/// `rshift` represents the rational predictor `coef * 2^(-rshift)`. Values
/// constructed by [`QuantizedParameters::quantize`] or
/// [`QuantizedParameters::from_parts`] always carry `rshift >= 1`, which
/// [`predict`] and [`synthesize`] rely on for their rounding constant.
///
/// [`predict`]: QuantizedParameters::predict
/// [`synthesize`]: QuantizedParameters::synthesize
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuantizedParameters {
    coefs: heapless::Vec<i32, MAX_LPC_ORDER>,
    rshift: u32,
    precision: usize,
}

impl QuantizedParameters {
    /// Quantizes float coefficients to `precision` bits (sign included).
    ///
    /// The rounding error of each tap is diffused into the next tap
    /// processed, walking tail-first: the predictor's impulse response is
    /// dominated by its head, so the accumulated error is pushed toward
    /// the taps that matter least.
    ///
    /// When every coefficient is too small to be representable the result
    /// is the all-zero predictor with `rshift == precision`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `precision` is out of range or
    /// `coef` is longer than [`MAX_LPC_ORDER`].
    pub fn quantize(coef: &[f64], precision: usize) -> Result<Self, LpcError> {
        if precision == 0 || precision > QLPC_MAX_PRECISION {
            return Err(RangeError::from_display(
                "precision",
                "must be in [1, 15]",
                &precision,
            )
            .into());
        }
        if coef.len() > MAX_LPC_ORDER {
            return Err(RangeError::from_display(
                "coef.len()",
                "must not exceed the maximum supported order",
                &coef.len(),
            )
            .into());
        }

        let mut coefs = heapless::Vec::new();
        coefs
            .resize(coef.len(), 0i32)
            .expect("INTERNAL ERROR: order bound already checked");

        let max_abs_coef = coef.iter().fold(0.0f64, |acc, &c| acc.max(c.abs()));

        // Too small for the given precision; represent as silence.
        if max_abs_coef <= (2.0f64).powi(-(precision as i32 - 1)) {
            return Ok(Self {
                coefs,
                rshift: precision as u32,
                precision,
            });
        }

        let qmax = 1i32 << (precision - 1);
        let ndigit = binary_exponent(max_abs_coef);
        let shift = (precision as i32 - 1) - ndigit;
        assert!(shift > 0, "quantized predictor needs a positive right-shift");
        let scale = (2.0f64).powi(shift);

        let mut qerror = 0.0f64;
        for ord in (0..coef.len()).rev() {
            qerror += coef[ord] * scale;
            let mut q = round_half_away(qerror) as i32;
            if q >= qmax {
                q = qmax - 1;
            } else if q < -qmax {
                q = -qmax;
            }
            // what the clamp and rounding removed carries over
            qerror -= f64::from(q);
            coefs[ord] = q;
        }

        Ok(Self {
            coefs,
            rshift: shift as u32,
            precision,
        })
    }

    /// Reconstructs parameters from values decoded out of a bit-stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `rshift` is outside `[1, 31]`,
    /// `precision` is out of range, `coefs` is longer than
    /// [`MAX_LPC_ORDER`], or any coefficient falls outside
    /// `[-2^(precision-1), 2^(precision-1))`.
    pub fn from_parts(coefs: &[i32], rshift: u32, precision: usize) -> Result<Self, LpcError> {
        if precision == 0 || precision > QLPC_MAX_PRECISION {
            return Err(RangeError::from_display(
                "precision",
                "must be in [1, 15]",
                &precision,
            )
            .into());
        }
        // zero makes the rounding constant ill-defined, 32 and beyond
        // overflow the accumulator
        if rshift == 0 || rshift > 31 {
            return Err(RangeError::from_display(
                "rshift",
                "must be in [1, 31]",
                &rshift,
            )
            .into());
        }
        if coefs.len() > MAX_LPC_ORDER {
            return Err(RangeError::from_display(
                "coefs.len()",
                "must not exceed the maximum supported order",
                &coefs.len(),
            )
            .into());
        }
        let qmax = 1i32 << (precision - 1);
        for &c in coefs {
            if c < -qmax || c >= qmax {
                return Err(RangeError::from_display(
                    "coefs",
                    "must fit in the declared precision",
                    &c,
                )
                .into());
            }
        }
        Ok(Self {
            coefs: heapless::Vec::from_slice(coefs)
                .expect("INTERNAL ERROR: order bound already checked"),
            rshift,
            precision,
        })
    }

    /// Returns the order of the predictor.
    pub fn order(&self) -> usize {
        self.coefs.len()
    }

    /// Returns the right-shift amount.
    pub const fn rshift(&self) -> u32 {
        self.rshift
    }

    /// Returns the precision the coefficients were quantized to.
    pub const fn precision(&self) -> usize {
        self.precision
    }

    /// Returns the quantized coefficients.
    pub fn coefs(&self) -> &[i32] {
        &self.coefs
    }

    /// Returns `Vec` containing dequantized coefficients.
    #[allow(dead_code)]
    pub(crate) fn dequantized(&self) -> Vec<f64> {
        let scale = (2.0f64).powi(-(self.rshift as i32));
        self.coefs.iter().map(|&c| f64::from(c) * scale).collect()
    }

    /// Runs the prediction filter, writing residuals over a copy of the
    /// input.
    ///
    /// Sample `t` is predicted from `min(t, order)` previous samples, so
    /// the first samples use a truncated filter and `residual[0]` equals
    /// `signal[0]`. The dot product accumulates in 32 bits with
    /// two's-complement wrap-around; [`Self::synthesize`] undoes it under
    /// the same rule, making the round-trip exact for every input.
    ///
    /// # Panics
    ///
    /// Panics if `residual` is shorter than `signal`.
    pub fn predict(&self, signal: &[i32], residual: &mut [i32]) {
        assert!(residual.len() >= signal.len());
        let order = self.coefs.len();
        let round = 1i32 << (self.rshift - 1);

        residual[..signal.len()].copy_from_slice(signal);
        for t in 1..order.min(signal.len()) {
            let mut predict = round;
            for (ord, &c) in self.coefs[..t].iter().enumerate() {
                predict = predict.wrapping_add(c.wrapping_mul(signal[t - ord - 1]));
            }
            residual[t] = residual[t].wrapping_add(predict >> self.rshift);
        }
        for t in order.max(1)..signal.len() {
            let mut predict = round;
            for (ord, &c) in self.coefs.iter().enumerate() {
                predict = predict.wrapping_add(c.wrapping_mul(signal[t - ord - 1]));
            }
            residual[t] = residual[t].wrapping_add(predict >> self.rshift);
        }
    }

    /// Runs the synthesis filter in place, turning residuals back into
    /// samples. Exact inverse of [`Self::predict`].
    pub fn synthesize(&self, signal: &mut [i32]) {
        let order = self.coefs.len();
        let round = 1i32 << (self.rshift - 1);

        for t in 1..order.min(signal.len()) {
            let mut predict = round;
            for (ord, &c) in self.coefs[..t].iter().enumerate() {
                predict = predict.wrapping_add(c.wrapping_mul(signal[t - ord - 1]));
            }
            signal[t] = signal[t].wrapping_sub(predict >> self.rshift);
        }
        for t in order.max(1)..signal.len() {
            let mut predict = round;
            for (ord, &c) in self.coefs.iter().enumerate() {
                predict = predict.wrapping_add(c.wrapping_mul(signal[t - ord - 1]));
            }
            signal[t] = signal[t].wrapping_sub(predict >> self.rshift);
        }
    }
}

#[cfg(test)]
#[allow(clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;
    use crate::assert_close;
    use crate::test_helper;

    use rstest::rstest;

    #[test]
    fn quantizer_splits_value_and_shift() {
        let qp = QuantizedParameters::quantize(&[0.0, 0.5, 0.1], 4).expect("quantization failed");
        // max |c| = 0.5 -> 3 value bits place the top coefficient at 4/8
        assert_eq!(qp.rshift(), 3);
        assert_eq!(qp.coefs(), &[0, 4, 1]);
    }

    #[test]
    fn quantizer_diffuses_error_tail_first() {
        // 0.28 * 16 = 4.48 rounds to 4 leaving error 0.48, which is carried
        // into the head tap: 0.48 + 4.48 = 4.96 rounds to 5. Plain rounding
        // would have produced 4 twice.
        let qp = QuantizedParameters::quantize(&[0.28, 0.28], 4).expect("quantization failed");
        assert_eq!(qp.rshift(), 4);
        assert_eq!(qp.coefs(), &[5, 4]);
    }

    #[test]
    fn tiny_coefficients_quantize_to_silence() {
        let precision = 12;
        let qp = QuantizedParameters::quantize(&[1e-9, -1e-9, 0.0], precision)
            .expect("quantization failed");
        assert_eq!(qp.rshift(), precision as u32);
        assert_eq!(qp.coefs(), &[0, 0, 0]);
    }

    #[test]
    fn clamp_keeps_coefficients_in_precision() {
        // both taps land on the positive limit of 2-bit precision
        let qp = QuantizedParameters::quantize(&[0.999, 0.999], 2).expect("quantization failed");
        let qmax = 2;
        for &c in qp.coefs() {
            assert!(c < qmax && c >= -qmax);
        }
    }

    #[rstest]
    fn quantizer_reconstruction_error_is_bounded(#[values(4, 8, 12, 15)] precision: usize) {
        let coef = [0.912, -0.5, 0.25, -0.124999, 0.062, 0.003, -0.77, 0.4];
        let qp = QuantizedParameters::quantize(&coef, precision).expect("quantization failed");
        let dq = qp.dequantized();
        let step = (2.0f64).powi(-(qp.rshift() as i32));
        for (i, &c) in coef.iter().enumerate() {
            // error diffusion keeps each tap within one quantization step
            assert!((c - dq[i]).abs() <= step, "tap {i} off by more than a step");
        }
    }

    #[test]
    fn precision_zero_is_rejected() {
        assert!(matches!(
            QuantizedParameters::quantize(&[0.5], 0),
            Err(LpcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn from_parts_round_trips_accessors() {
        let qp = QuantizedParameters::from_parts(&[100, -200, 3], 10, 12).expect("must be valid");
        assert_eq!(qp.order(), 3);
        assert_eq!(qp.rshift(), 10);
        assert_eq!(qp.precision(), 12);
        assert_eq!(qp.coefs(), &[100, -200, 3]);
        assert_close!(qp.dequantized()[0], 100.0 / 1024.0);
    }

    #[test]
    fn from_parts_rejects_zero_rshift() {
        assert!(matches!(
            QuantizedParameters::from_parts(&[1, 2, 3], 0, 12),
            Err(LpcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn from_parts_rejects_out_of_precision_coefficient() {
        assert!(matches!(
            QuantizedParameters::from_parts(&[2048], 10, 12),
            Err(LpcError::InvalidArgument(_))
        ));
        assert!(QuantizedParameters::from_parts(&[2047], 10, 12).is_ok());
        assert!(QuantizedParameters::from_parts(&[-2048], 10, 12).is_ok());
    }

    #[test]
    fn predict_keeps_first_sample_and_warms_up() {
        let qp = QuantizedParameters::from_parts(&[512, -256], 9, 12).expect("must be valid");
        let signal = [1000, -500, 250, -125];
        let mut residual = [0i32; 4];
        qp.predict(&signal, &mut residual);

        assert_eq!(residual[0], signal[0]);
        // t=1 uses one tap only
        let predict = ((1 << 8) + 512 * 1000) >> 9;
        assert_eq!(residual[1], signal[1] + predict);
        // t=2 uses both taps
        let predict = ((1 << 8) + 512 * -500 + -256 * 1000) >> 9;
        assert_eq!(residual[2], signal[2] + predict);
    }

    #[rstest]
    fn random_round_trip(
        #[values(1, 2, 12, 31)] order: usize,
        #[values(1, 4, 14)] rshift: u32,
    ) {
        let coefs: Vec<i32> = (0..order as i32).map(|i| (i * 37 % 61) - 30).collect();
        let qp = QuantizedParameters::from_parts(&coefs, rshift, 7).expect("must be valid");

        let signal = test_helper::sinusoid_plus_noise(512, 20, 18000.0, 1024);
        let mut residual = vec![0i32; signal.len()];
        qp.predict(&signal, &mut residual);

        let mut decoded = residual;
        qp.synthesize(&mut decoded);
        assert_eq!(decoded, signal);
    }

    #[test]
    fn round_trip_survives_wrapping_accumulation() {
        // extreme samples with large taps overflow the 32-bit accumulator;
        // prediction and synthesis wrap identically
        let qp = QuantizedParameters::from_parts(&[2047, -2048, 2047, -2048], 1, 12)
            .expect("must be valid");
        let signal = vec![i32::MAX, i32::MIN, i32::MAX, i32::MIN, 123456789, -987654321];
        let mut residual = vec![0i32; signal.len()];
        qp.predict(&signal, &mut residual);

        let mut decoded = residual;
        qp.synthesize(&mut decoded);
        assert_eq!(decoded, signal);
    }

    #[test]
    fn zero_order_filter_is_identity_apart_from_rounding_bias() {
        let qp = QuantizedParameters::from_parts(&[], 4, 12).expect("must be valid");
        let signal = [5, -7, 11, -13];
        let mut residual = [0i32; 4];
        qp.predict(&signal, &mut residual);
        // rounding constant shifts out entirely
        assert_eq!(residual, signal);
        let mut decoded = residual;
        qp.synthesize(&mut decoded);
        assert_eq!(decoded, signal);
    }
}
