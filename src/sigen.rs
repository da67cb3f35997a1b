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

//! Test signal generator module.
//!
//! This module is primarily intended to be used for tests. However, unlike
//! `test_helper.rs`, this module is exposed to the outside of the crate for
//! external testing frameworks.

use rand::Rng;
use rand::SeedableRng;

/// Test signal generators.
pub trait Signal: std::fmt::Debug {
    /// Generates a signal from t=`sample_offset` and fills the buffer `dest`.
    fn fill_buffer(&self, sample_offset: usize, dest: &mut [f64]);

    /// Generates a signal and returns `Vec` containing quantized ints.
    fn to_vec_quantized(&self, bits_per_sample: usize, block_size: usize) -> Vec<i32> {
        assert!(bits_per_sample <= 24);
        assert!(bits_per_sample > 4);
        // note that scalefactor below can make samples exceed iXX::MAX by 1.
        let scalefactor = 1usize << (bits_per_sample - 1);
        let min_target = -((1usize << (bits_per_sample - 1)) as i32);
        let max_target = (1usize << (bits_per_sample - 1)) as i32 - 1i32;

        let mut ret = vec![0i32; block_size];
        let mut buffer = vec![0.0f64; block_size];
        self.fill_buffer(0, &mut buffer);

        for (p, x) in ret.iter_mut().zip(buffer.iter()) {
            *p = (scalefactor as f64 * x)
                .round()
                .clamp(f64::from(min_target), f64::from(max_target)) as i32;
        }
        ret
    }

    /// Mixes noise with the given amplitude.
    fn noise(self, amplitude: f64) -> Mix<Self, Noise>
    where
        Self: Sized,
    {
        self.mix(Noise::new(amplitude))
    }

    /// Mixes noise generated from the given seed.
    fn noise_with_seed(self, seed0: u64, amplitude: f64) -> Mix<Self, Noise>
    where
        Self: Sized,
    {
        self.mix(Noise::with_seed(seed0, amplitude))
    }

    /// Mixes signal from the other generator.
    fn mix<T: Signal + Sized>(self, other: T) -> Mix<Self, T>
    where
        Self: Sized,
    {
        Mix::new(1.0, self, 1.0, other)
    }
}

/// Generator for constant signals.
#[derive(Clone, Debug)]
pub struct Dc {
    offset: f64,
}

impl Dc {
    /// Constructs new `Dc` signal.
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl Signal for Dc {
    fn fill_buffer(&self, _offset: usize, dest: &mut [f64]) {
        for p in dest {
            *p = self.offset;
        }
    }
}

/// Generator for a sinusoidal wave.
#[derive(Clone, Debug)]
pub struct Sine {
    period: usize,
    amplitude: f64,
}

impl Sine {
    /// Constructs new sine wave signal with `period` and `amplitude`.
    pub fn new(period: usize, amplitude: f64) -> Self {
        Self { period, amplitude }
    }
}

impl Signal for Sine {
    fn fill_buffer(&self, offset: usize, dest: &mut [f64]) {
        let period = self.period as f64;
        for (t, p) in dest.iter_mut().enumerate() {
            let t = (t + offset) as f64;
            *p = self.amplitude * f64::sin(2.0 * std::f64::consts::PI * t / period);
        }
    }
}

/// Generator for a uniform random white noise.
#[derive(Clone, Debug)]
pub struct Noise {
    seed0: u64,
    amplitude: f64,
}

impl Noise {
    /// Constructs new noise generator.
    pub fn new(amplitude: f64) -> Self {
        let seed0: u64 = rand::thread_rng().gen();
        Self { seed0, amplitude }
    }

    /// Constructs new noise generator with specifying a seed.
    pub fn with_seed(seed0: u64, amplitude: f64) -> Self {
        Self { seed0, amplitude }
    }
}

impl Signal for Noise {
    /// Fills buffer with the uniform random values.
    ///
    /// # Note
    ///
    /// This method doesn't ensure reproducibility if it is called in an
    /// arbitrary order, e.g. `noise.fill_buffer(0, &mut dest[..])`
    /// generates different results from `noise.fill_buffer(0, &mut
    /// dest[0..10])` followed by `noise.fill_buffer(10, &mut dest[10..])`.
    fn fill_buffer(&self, offset: usize, dest: &mut [f64]) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed0.wrapping_add(offset as u64));
        for p in dest {
            *p = self.amplitude * 2.0 * (rng.sample::<f64, _>(rand::distributions::Open01) - 0.5);
        }
    }
}

/// Decorator that mixes outputs from the inner generators.
#[derive(Clone, Debug)]
pub struct Mix<T1: Signal + Sized, T2: Signal + Sized> {
    weight1: f64,
    weight2: f64,
    signal1: T1,
    signal2: T2,
}

impl<T1: Signal + Sized, T2: Signal + Sized> Mix<T1, T2> {
    /// Constructs new two-inputs mixer.
    pub fn new(weight1: f64, signal1: T1, weight2: f64, signal2: T2) -> Self {
        Self {
            weight1,
            weight2,
            signal1,
            signal2,
        }
    }
}

impl<T1: Signal + Sized, T2: Signal + Sized> Signal for Mix<T1, T2> {
    fn fill_buffer(&self, offset: usize, dest: &mut [f64]) {
        for p in &mut *dest {
            *p = 0.0f64;
        }

        let mut buf = vec![0.0f64; dest.len()];
        self.signal1.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(buf.iter()) {
            *p += self.weight1 * *x;
        }
        self.signal2.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(buf.iter()) {
            *p += self.weight2 * *x;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_fills_constant() {
        let mut buf = vec![0.0f64; 16];
        Dc::new(0.25).fill_buffer(0, &mut buf);
        assert_eq!(buf, vec![0.25; 16]);
    }

    #[test]
    fn sine_has_expected_period() {
        let mut buf = vec![0.0f64; 64];
        Sine::new(32, 1.0).fill_buffer(0, &mut buf);
        for t in 0..32 {
            assert!((buf[t] - buf[t + 32]).abs() < 1e-12);
        }
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut buf1 = vec![0.0f64; 32];
        let mut buf2 = vec![0.0f64; 32];
        Noise::with_seed(1234, 0.5).fill_buffer(0, &mut buf1);
        Noise::with_seed(1234, 0.5).fill_buffer(0, &mut buf2);
        assert_eq!(buf1, buf2);
        for &x in &buf1 {
            assert!(x.abs() <= 0.5);
        }
    }

    #[test]
    fn quantized_output_respects_bit_width() {
        let quantized = Sine::new(100, 1.0).to_vec_quantized(8, 256);
        for &x in &quantized {
            assert!((-128..=127).contains(&x));
        }
    }
}
