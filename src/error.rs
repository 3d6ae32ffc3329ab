use thiserror::Error;

/// Raised when a settings value is assigned outside its documented range.
///
/// Validation happens at the point of assignment, before any key is
/// processed. Running out of construction iterations is not an error; the
/// builders report that by returning `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("{setting} must be within {min}..={max}, got {value}")]
    OutOfRange {
        setting: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{setting} must be greater than {min}, got {value}")]
    TooSmall {
        setting: &'static str,
        min: f64,
        value: f64,
    },
}

pub(crate) fn require_range(
    setting: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), SettingsError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            setting,
            min,
            max,
            value,
        })
    }
}

pub(crate) fn require_above(
    setting: &'static str,
    value: f64,
    min: f64,
) -> Result<(), SettingsError> {
    if value > min {
        Ok(())
    } else {
        Err(SettingsError::TooSmall {
            setting,
            min,
            value,
        })
    }
}
