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

//! Estimator configuration structs.

use serde::Deserialize;
use serde::Serialize;

use super::constant::MAX_BLOCK_SIZE;
use super::constant::MAX_LPC_ORDER;
use super::constant::QLPC_DEFAULT_MAX_BLOCK_SIZE;
use super::constant::QLPC_DEFAULT_MAX_ORDER;
use super::error::verify_range;
use super::error::verify_true;
use super::error::Verify;
use super::error::VerifyError;

/// Capacity parameters for [`LpcEstimator`].
///
/// The two caps size the estimator's workspace once, at construction; calls
/// that exceed them are rejected without touching any buffer.
///
/// [`LpcEstimator`]: crate::lpc::LpcEstimator
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// Highest coefficient order the estimator accepts.
    pub max_order: usize,
    /// Longest sample block the estimator accepts.
    pub max_num_samples: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            max_order: QLPC_DEFAULT_MAX_ORDER,
            max_num_samples: QLPC_DEFAULT_MAX_BLOCK_SIZE,
        }
    }
}

impl Verify for CalculatorConfig {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_range!("max_order", self.max_order, 1..=MAX_LPC_ORDER)?;
        verify_range!("max_num_samples", self.max_num_samples, 1..=MAX_BLOCK_SIZE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let config = CalculatorConfig::default();
        assert!(toml::to_string(&config).is_ok());
    }

    #[test]
    fn deserialization() {
        let src = "
max_order = 16
";
        let config: CalculatorConfig = toml::from_str(src).expect("Parse error.");
        assert_eq!(config.max_order, 16);

        // Check the rest is default.
        assert_eq!(config.max_num_samples, QLPC_DEFAULT_MAX_BLOCK_SIZE);
    }

    #[test]
    fn if_empty_source_yields_default_config() {
        let empty_src = "";
        let config: CalculatorConfig = toml::from_str(empty_src).expect("Parse error.");
        assert_eq!(config, CalculatorConfig::default());
    }

    #[test]
    fn verification() {
        assert!(CalculatorConfig::default().verify().is_ok());

        let config = CalculatorConfig {
            max_order: 0,
            ..Default::default()
        };
        assert!(config.verify().is_err());

        let config = CalculatorConfig {
            max_order: MAX_LPC_ORDER + 1,
            ..Default::default()
        };
        assert!(config.verify().is_err());

        let config = CalculatorConfig {
            max_num_samples: 0,
            ..Default::default()
        };
        assert!(config.verify().is_err());
    }
}
