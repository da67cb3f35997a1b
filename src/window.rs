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

//! Analysis windows applied before autocorrelation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use seq_macro::seq;
use serde::Deserialize;
use serde::Serialize;

/// Analysis window descriptor.
///
/// This enum is `Serializable` and `Deserializable` because this will be
/// directly used in config structs of the enclosing codec.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(tag = "type")]
pub enum Window {
    /// Identity window.
    Rectangular,
    /// Half-period sine window.
    #[default]
    Sine,
    /// Parabolic (Welch) window.
    Welch,
}

impl Window {
    /// Computes window weights for a block of `len` samples.
    ///
    /// Blocks of one sample are degenerate for `Sine` and `Welch` (the
    /// weights are NaN); estimation needs at least two samples anyway.
    pub fn weights(&self, len: usize) -> Vec<f64> {
        match *self {
            Self::Rectangular => vec![1.0f64; len],
            Self::Sine => {
                let max_t = len as f64 - 1.0;
                (0..len)
                    .map(|t| (std::f64::consts::PI * t as f64 / max_t).sin())
                    .collect()
            }
            Self::Welch => {
                let divisor = 4.0 * ((len as f64 - 1.0).powi(-2));
                let mut ret = vec![0.0f64; len];
                // computed from both ends so the weights stay symmetric
                for t in 0..(len + 1) / 2 {
                    let w = divisor * t as f64 * (len - 1 - t) as f64;
                    ret[t] = w;
                    ret[len - 1 - t] = w;
                }
                ret
            }
        }
    }
}

type WindowMap = BTreeMap<(usize, Window), Rc<[f64]>>;
thread_local! {
    static WINDOW_CACHE: RefCell<WindowMap> = RefCell::new(BTreeMap::new());
}

/// Returns (possibly cached) weights of `window` for block length `size`.
pub(crate) fn get_window(window: Window, size: usize) -> Rc<[f64]> {
    let key = (size, window);
    WINDOW_CACHE.with(|caches| {
        if caches.borrow().get(&key).is_none() {
            caches
                .borrow_mut()
                .insert(key, Rc::from(window.weights(size)));
        }
        Rc::clone(
            caches
                .borrow()
                .get(&key)
                .expect("INTERNAL ERROR: window cache was not properly populated"),
        )
    })
}

/// Applies `window` to `signal`, writing the weighted samples to `dest`.
///
/// `dest` may be longer than `signal`; the tail is left untouched.
#[allow(clippy::identity_op)] // false-alarm when OFFSET == 0
pub(crate) fn apply_window(window: Window, signal: &[f64], dest: &mut [f64]) {
    assert!(dest.len() >= signal.len());

    let weights = get_window(window, signal.len());
    let t_end = signal.len();

    // Resorting to loop-unrolling and compiler optimization here; the
    // bulk loop handles whole 16-sample groups, the tail is scalar.
    let mut t = 0;
    while t + 16 <= t_end {
        seq!(OFFSET in 0..16 {
            dest[t + OFFSET] = signal[t + OFFSET] * weights[t + OFFSET];
        });
        t += 16;
    }
    while t < t_end {
        dest[t] = signal[t] * weights[t];
        t += 1;
    }
}
