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

//! Error and verification traits

use std::error::Error;
use std::fmt;

/// Error emitted when a parameter is out of the expected range.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct RangeError {
    var: String,
    reason: String,
    actual: String,
}

impl RangeError {
    /// Makes range error from `actual: impl Display` that is out of range.
    pub(crate) fn from_display<T>(var: &str, reason: &str, actual: &T) -> Self
    where
        T: fmt::Display,
    {
        Self {
            var: var.to_owned(),
            reason: reason.to_owned(),
            actual: format!("{actual}"),
        }
    }
}

impl Error for RangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is out of range: {} (actual={})",
            self.var, self.reason, self.actual
        )
    }
}

/// Enum of errors returned from estimator and filter operations.
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
#[non_exhaustive]
pub enum LpcError {
    /// An argument is invalid or out of its supported range.
    InvalidArgument(RangeError),
    /// Requested coefficient order exceeds the cap given at construction.
    ExceedMaxOrder {
        /// The requested order.
        order: usize,
        /// The `max_order` the estimator was created with.
        max_order: usize,
    },
    /// Input block is longer than the cap given at construction.
    ExceedMaxNumSamples {
        /// Length of the offending block.
        num_samples: usize,
        /// The `max_num_samples` the estimator was created with.
        max_num_samples: usize,
    },
    /// Estimation broke down and no usable coefficients exist.
    FailedToCalculate,
}

impl Error for LpcError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(e) => Some(e),
            Self::ExceedMaxOrder { .. }
            | Self::ExceedMaxNumSamples { .. }
            | Self::FailedToCalculate => None,
        }
    }
}

impl fmt::Display for LpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::ExceedMaxOrder { order, max_order } => write!(
                f,
                "coefficient order {order} exceeds the configured maximum ({max_order})"
            ),
            Self::ExceedMaxNumSamples {
                num_samples,
                max_num_samples,
            } => write!(
                f,
                "block of {num_samples} samples exceeds the configured maximum ({max_num_samples})"
            ),
            Self::FailedToCalculate => write!(f, "coefficient calculation failed"),
        }
    }
}

impl From<RangeError> for LpcError {
    fn from(e: RangeError) -> Self {
        Self::InvalidArgument(e)
    }
}

/// Error object returned when config integrity verification failed.
///
/// This error maintains a path to the component that is actually erroneous
/// in the nested components.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct VerifyError {
    components: Vec<String>,
    reason: String,
}

impl VerifyError {
    /// Makes verification error for an invalid variable `component`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use qlpc::error::*;
    /// let err = VerifyError::new("max_order", "must be non-zero");
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "verification error: `max_order` is not valid. reason: must be non-zero"
    /// );
    /// ```
    pub fn new(component: &str, reason: &str) -> Self {
        Self {
            components: vec![component.to_owned()],
            reason: reason.to_owned(),
        }
    }

    /// Prepends the name of an enclosing component to the error location.
    #[must_use]
    pub fn within(self, component: &str) -> Self {
        let mut components = self.components;
        let reason = self.reason;
        components.push(component.to_owned());
        Self { components, reason }
    }

    /// Gets dot-separated path string for the error location.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for (i, name) in self.components.iter().rev().enumerate() {
            if i != 0 {
                path.push('.');
            }
            path.push_str(name);
        }
        path
    }
}

impl Error for VerifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verification error: `{}` is not valid. reason: {}",
            self.path(),
            self.reason
        )
    }
}

/// Trait for verifiable structs.
pub trait Verify: Sized + seal_verify::Sealed {
    /// Verifies there's no internal data inconsistency.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if there's an invalid variable.
    fn verify(&self) -> Result<(), VerifyError>;
}

/// A wrapping function to make it compatible with "?" operator.
pub(crate) fn verify_macro_impl(cond: bool, varname: &str, msg: &str) -> Result<(), VerifyError> {
    if !cond {
        return Err(VerifyError::new(varname, msg));
    }
    Ok(())
}

/// Evaluates `$cond` and produces `Err(VerifyError)` when it is false.
///
/// `$varname` and `$msg` are format strings fed with the extra `$args`.
macro_rules! verify_true {
    ($varname:literal, $cond:expr, $msg:literal, $($args: expr),*) => {
        crate::error::verify_macro_impl(
            $cond,
            &format!($varname, $($args),*),
            &format!($msg, $($args),*),
        )
    };
    ($varname:literal, $cond:expr, $msg:literal) => {
        verify_true!($varname, $cond, $msg,)
    }
}
pub(crate) use verify_true;

/// Checks that `$actual` lies in the range, with default messages.
///
/// Errors are constructed the same way as in [`verify_true`].
macro_rules! verify_range {
    ($varname: literal, $actual:expr, $lowlimit:tt ..= $highlimit:tt) => {
        verify_range!($varname, $actual, ($lowlimit)..)
            .and_then(|()| verify_range!($varname, $actual, ..=($highlimit)))
    };
    ($varname: literal, $actual:expr, $lowlimit:tt ..) => {{
        #[allow(unused_parens)]
        let limit = $lowlimit;
        verify_true!(
            $varname,
            $actual >= limit,
            "must be greater than or equal to {limit}"
        )
    }};
    ($varname: literal, $actual:expr, ..= $highlimit:tt) => {{
        #[allow(unused_parens)]
        let limit = $highlimit;
        verify_true!(
            $varname,
            $actual <= limit,
            "must be less than or equal to {limit}"
        )
    }};
}
pub(crate) use verify_range;

mod seal_verify {
    pub trait Sealed {}

    impl Sealed for crate::config::CalculatorConfig {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_error_display() {
        let err = RangeError::from_display("order", "must be positive", &0usize);
        assert_eq!(
            format!("{err}"),
            "`order` is out of range: must be positive (actual=0)"
        );
    }

    #[test]
    fn cap_error_display() {
        let err = LpcError::ExceedMaxOrder {
            order: 40,
            max_order: 32,
        };
        assert_eq!(
            format!("{err}"),
            "coefficient order 40 exceeds the configured maximum (32)"
        );
        let err = LpcError::ExceedMaxNumSamples {
            num_samples: 8000,
            max_num_samples: 4096,
        };
        assert_eq!(
            format!("{err}"),
            "block of 8000 samples exceeds the configured maximum (4096)"
        );
    }

    #[test]
    fn verify_error_path() {
        let err = VerifyError::new("max_order", "must be non-zero").within("config");
        assert_eq!(err.path(), "config.max_order");
    }
}
