use crate::{SafetyError, SafetyResult};
use std::fmt::Display;

pub fn validate_positive<T>(name: &str, value: T) -> SafetyResult<()>
where
    T: PartialOrd + Display + Default,
{
    if value <= T::default() {
        return Err(SafetyError::InvalidConfiguration(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

pub fn validate_nonzero(name: &str, value: u32) -> SafetyResult<()> {
    if value == 0 {
        return Err(SafetyError::InvalidConfiguration(format!(
            "{} must be nonzero",
            name
        )));
    }
    Ok(())
}

pub fn validate_not_above<T>(name: &str, value: T, max: T) -> SafetyResult<()>
where
    T: PartialOrd + Display,
{
    if value > max {
        return Err(SafetyError::InvalidConfiguration(format!(
            "{} must be at most {}, got {}",
            name, max, value
        )));
    }
    Ok(())
}

pub fn validate_frame_len(len: u8, max: u8) -> SafetyResult<()> {
    if len == 0 || len > max {
        return Err(SafetyError::InvalidConfiguration(format!(
            "Message length must be between 1 and {} bytes, got {}",
            max, len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("max_steer", 1).is_ok());
        assert!(validate_positive("max_steer", 0).is_err());
        assert!(validate_positive("max_steer", -5).is_err());
    }

    #[test]
    fn test_validate_not_above() {
        assert!(validate_not_above("rate", 50, 2047).is_ok());
        let err = validate_not_above("rate", 3000, 2047).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: rate must be at most 2047, got 3000"
        );
    }

    #[test]
    fn test_validate_frame_len() {
        assert!(validate_frame_len(8, 8).is_ok());
        assert!(validate_frame_len(0, 8).is_err());
        assert!(validate_frame_len(9, 8).is_err());
    }
}
