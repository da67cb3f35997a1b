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

//! Workspace arena backing the estimator's scratch buffers.
//!
//! All per-estimator vectors live in one contiguous `f64` allocation carved
//! into aligned regions, so that an estimator performs no allocation after
//! construction and its memory footprint is known up front via
//! [`calculate_work_size`].

use super::config::CalculatorConfig;
use super::constant::WORK_ALIGNMENT;

/// Region alignment counted in `f64` elements.
const ALIGN_ELEMS: usize = WORK_ALIGNMENT / std::mem::size_of::<f64>();

/// Rounds `n` up to the next multiple of the region alignment.
const fn align_up(n: usize) -> usize {
    (n + ALIGN_ELEMS - 1) / ALIGN_ELEMS * ALIGN_ELEMS
}

/// Aligned lengths of the arena regions, in carving order:
/// `a`, `u`, `v` (order + 2 each), autocorrelation, LPC and PARCOR
/// coefficients (order + 1 each), windowed-signal buffer.
fn region_lens(max_order: usize, max_num_samples: usize) -> [usize; 7] {
    let vec_len = align_up(max_order + 2);
    let coef_len = align_up(max_order + 1);
    [
        vec_len,
        vec_len,
        vec_len,
        coef_len,
        coef_len,
        coef_len,
        align_up(max_num_samples),
    ]
}

/// Exact number of bytes an estimator needs for the given caps.
///
/// Counts the vector arena, the symmetric scratch matrix of shape
/// `(max_order + 1) x (max_order + 1)`, and the alignment slack of the
/// arena base.
pub fn calculate_work_size(config: &CalculatorConfig) -> usize {
    let arena_elems: usize = region_lens(config.max_order, config.max_num_samples)
        .iter()
        .sum();
    let matrix_elems = (config.max_order + 1) * (config.max_order + 1);
    (arena_elems + matrix_elems) * std::mem::size_of::<f64>() + WORK_ALIGNMENT
}

/// Mutable views of all arena regions, trimmed to their logical lengths.
///
/// The borrows are disjoint, so a solver can update several regions in the
/// same pass.
pub(crate) struct Scratch<'a> {
    pub a: &'a mut [f64],
    pub u: &'a mut [f64],
    pub v: &'a mut [f64],
    pub corr: &'a mut [f64],
    pub lpc: &'a mut [f64],
    pub parcor: &'a mut [f64],
    pub windowed: &'a mut [f64],
}

/// Single-arena storage for the estimator scratch vectors.
pub(crate) struct Workspace {
    storage: Vec<f64>,
    max_order: usize,
    max_num_samples: usize,
}

impl Workspace {
    pub fn new(config: &CalculatorConfig) -> Self {
        let total: usize = region_lens(config.max_order, config.max_num_samples)
            .iter()
            .sum();
        Self {
            storage: vec![0.0f64; total],
            max_order: config.max_order,
            max_num_samples: config.max_num_samples,
        }
    }

    /// Carves the arena into its regions.
    pub fn scratch(&mut self) -> Scratch<'_> {
        let lens = region_lens(self.max_order, self.max_num_samples);
        let vec_len = self.max_order + 2;
        let coef_len = self.max_order + 1;

        let (a, rest) = self.storage.split_at_mut(lens[0]);
        let (u, rest) = rest.split_at_mut(lens[1]);
        let (v, rest) = rest.split_at_mut(lens[2]);
        let (corr, rest) = rest.split_at_mut(lens[3]);
        let (lpc, rest) = rest.split_at_mut(lens[4]);
        let (parcor, windowed) = rest.split_at_mut(lens[5]);
        Scratch {
            a: &mut a[..vec_len],
            u: &mut u[..vec_len],
            v: &mut v[..vec_len],
            corr: &mut corr[..coef_len],
            lpc: &mut lpc[..coef_len],
            parcor: &mut parcor[..coef_len],
            windowed: &mut windowed[..self.max_num_samples],
        }
    }

    fn region_offset(&self, index: usize) -> usize {
        region_lens(self.max_order, self.max_num_samples)[..index]
            .iter()
            .sum()
    }

    /// Autocorrelation left by the latest estimator call.
    pub fn auto_corr(&self) -> &[f64] {
        let offset = self.region_offset(3);
        &self.storage[offset..offset + self.max_order + 1]
    }

    /// LPC coefficients left by the latest estimator call.
    pub fn lpc_coef(&self) -> &[f64] {
        let offset = self.region_offset(4);
        &self.storage[offset..offset + self.max_order + 1]
    }

    /// PARCOR coefficients left by the latest Levinson-Durbin run.
    pub fn parcor_coef(&self) -> &[f64] {
        let offset = self.region_offset(5);
        &self.storage[offset..offset + self.max_order + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_size_covers_arena_and_matrix() {
        let config = CalculatorConfig {
            max_order: 13,
            max_num_samples: 999,
        };
        let ws = Workspace::new(&config);
        let matrix_bytes = (config.max_order + 1) * (config.max_order + 1) * 8;
        assert_eq!(
            calculate_work_size(&config),
            ws.storage.len() * 8 + matrix_bytes + WORK_ALIGNMENT
        );
    }

    #[test]
    fn regions_are_aligned() {
        let lens = region_lens(7, 100);
        let mut offset = 0;
        for len in lens {
            assert_eq!(offset % ALIGN_ELEMS, 0);
            offset += len;
        }
    }

    #[test]
    fn scratch_regions_have_logical_lengths() {
        let config = CalculatorConfig {
            max_order: 8,
            max_num_samples: 123,
        };
        let mut ws = Workspace::new(&config);
        let s = ws.scratch();
        assert_eq!(s.a.len(), 10);
        assert_eq!(s.u.len(), 10);
        assert_eq!(s.v.len(), 10);
        assert_eq!(s.corr.len(), 9);
        assert_eq!(s.lpc.len(), 9);
        assert_eq!(s.parcor.len(), 9);
        assert_eq!(s.windowed.len(), 123);
    }

    #[test]
    fn scratch_writes_show_up_in_readers() {
        let config = CalculatorConfig {
            max_order: 4,
            max_num_samples: 32,
        };
        let mut ws = Workspace::new(&config);
        {
            let s = ws.scratch();
            s.lpc[2] = 0.5;
            s.parcor[1] = -0.25;
            s.corr[0] = 7.0;
        }
        assert_eq!(ws.lpc_coef()[2], 0.5);
        assert_eq!(ws.parcor_coef()[1], -0.25);
        assert_eq!(ws.auto_corr()[0], 7.0);
    }
}
