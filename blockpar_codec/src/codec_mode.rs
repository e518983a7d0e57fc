use derive_more::Display;
use thiserror::Error;

/// The accuracy mode of a block codec.
#[derive(Copy, Clone, Debug, PartialEq, Display)]
pub enum CodecMode {
    /// Fixed accuracy: the absolute error of every reconstructed value is at most the tolerance.
    ///
    /// A tolerance of zero is lossless.
    #[display("tolerance {_0}")]
    Tolerance(f64),
    /// Fixed rate: every value is stored with the given number of bits (rounded up).
    #[display("rate {_0}")]
    FixedRate(f64),
    /// Fixed precision: every value retains the given number of significant bits.
    #[display("precision {_0}")]
    FixedPrecision(u32),
}

/// A codec mode parameter error.
#[derive(Copy, Clone, Debug, Error, PartialEq)]
pub enum CodecModeError {
    /// No mode parameter was supplied.
    #[error("one of the tolerance, rate or precision must be supplied")]
    Missing,
    /// More than one mode parameter was supplied.
    #[error("only one of the tolerance, rate or precision can be supplied")]
    Ambiguous,
    /// An invalid tolerance.
    #[error("invalid tolerance {0}, expected a finite non-negative number")]
    InvalidTolerance(f64),
    /// An invalid rate.
    #[error("invalid rate {0}, expected a finite positive number")]
    InvalidRate(f64),
    /// An invalid precision.
    #[error("invalid precision {0}, expected at least 1")]
    InvalidPrecision(u32),
}

impl CodecMode {
    /// Validate the mode parameter.
    ///
    /// # Errors
    /// Returns a [`CodecModeError`] if the tolerance is negative or not finite, the rate is not positive and finite, or the precision is zero.
    pub fn validate(&self) -> Result<(), CodecModeError> {
        match *self {
            Self::Tolerance(tolerance) if !tolerance.is_finite() || tolerance < 0.0 => {
                Err(CodecModeError::InvalidTolerance(tolerance))
            }
            Self::FixedRate(rate) if !rate.is_finite() || rate <= 0.0 => {
                Err(CodecModeError::InvalidRate(rate))
            }
            Self::FixedPrecision(0) => Err(CodecModeError::InvalidPrecision(0)),
            _ => Ok(()),
        }
    }
}

/// Optional codec mode parameters, of which exactly one must be supplied.
///
/// Convert to a [`CodecMode`] with [`CodecMode::try_from`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CodecParameters {
    tolerance: Option<f64>,
    rate: Option<f64>,
    precision: Option<u32>,
}

impl CodecParameters {
    /// Create codec parameters.
    #[must_use]
    pub const fn new(tolerance: Option<f64>, rate: Option<f64>, precision: Option<u32>) -> Self {
        Self {
            tolerance,
            rate,
            precision,
        }
    }

    /// Set the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the rate.
    #[must_use]
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the precision.
    #[must_use]
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Return the tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Return the rate.
    #[must_use]
    pub const fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Return the precision.
    #[must_use]
    pub const fn precision(&self) -> Option<u32> {
        self.precision
    }
}

impl TryFrom<&CodecParameters> for CodecMode {
    type Error = CodecModeError;

    fn try_from(parameters: &CodecParameters) -> Result<Self, Self::Error> {
        let mode = match (parameters.tolerance, parameters.rate, parameters.precision) {
            (Some(tolerance), None, None) => Self::Tolerance(tolerance),
            (None, Some(rate), None) => Self::FixedRate(rate),
            (None, None, Some(precision)) => Self::FixedPrecision(precision),
            (None, None, None) => return Err(CodecModeError::Missing),
            _ => return Err(CodecModeError::Ambiguous),
        };
        mode.validate()?;
        Ok(mode)
    }
}

impl TryFrom<CodecParameters> for CodecMode {
    type Error = CodecModeError;

    fn try_from(parameters: CodecParameters) -> Result<Self, Self::Error> {
        Self::try_from(&parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_mode_from_parameters() {
        assert_eq!(
            CodecMode::try_from(CodecParameters::default().with_tolerance(1e-3)).unwrap(),
            CodecMode::Tolerance(1e-3)
        );
        assert_eq!(
            CodecMode::try_from(CodecParameters::default().with_rate(8.0)).unwrap(),
            CodecMode::FixedRate(8.0)
        );
        assert_eq!(
            CodecMode::try_from(CodecParameters::new(None, None, Some(12))).unwrap(),
            CodecMode::FixedPrecision(12)
        );
        assert_eq!(
            CodecMode::try_from(CodecParameters::default()),
            Err(CodecModeError::Missing)
        );
        assert_eq!(
            CodecMode::try_from(CodecParameters::default().with_tolerance(0.1).with_rate(4.0)),
            Err(CodecModeError::Ambiguous)
        );
    }

    #[test]
    fn codec_mode_invalid() {
        assert!(matches!(
            CodecMode::Tolerance(-1.0).validate(),
            Err(CodecModeError::InvalidTolerance(_))
        ));
        assert!(matches!(
            CodecMode::FixedRate(0.0).validate(),
            Err(CodecModeError::InvalidRate(_))
        ));
        assert!(matches!(
            CodecMode::FixedRate(f64::INFINITY).validate(),
            Err(CodecModeError::InvalidRate(_))
        ));
        assert_eq!(
            CodecMode::FixedPrecision(0).validate(),
            Err(CodecModeError::InvalidPrecision(0))
        );
        assert!(CodecMode::Tolerance(0.0).validate().is_ok());
    }

    #[test]
    fn codec_mode_display() {
        assert_eq!(CodecMode::FixedPrecision(16).to_string(), "precision 16");
        assert_eq!(CodecMode::Tolerance(0.5).to_string(), "tolerance 0.5");
    }
}
