use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid delay: {0}. Must be a whole number of milliseconds up to {1}")]
    InvalidDelay(String, u64),

    #[error("Invalid error rate: {0}. Must be between 0 and 1")]
    InvalidErrorRate(String),
}

/// Parse the `delay` query parameter, falling back to `default` when absent
pub fn validate_delay(delay: Option<&str>, default: u64, max: u64) -> Result<u64, ValidationError> {
    let Some(delay) = delay.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(default);
    };

    match delay.parse::<u64>() {
        Ok(ms) if ms <= max => Ok(ms),
        _ => Err(ValidationError::InvalidDelay(delay.to_string(), max)),
    }
}

/// Parse the `error` query parameter as a failure probability; absent means 0
pub fn validate_error_rate(rate: Option<&str>) -> Result<f64, ValidationError> {
    let Some(rate) = rate.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(0.0);
    };

    match rate.parse::<f64>() {
        Ok(value) if (0.0..=1.0).contains(&value) => Ok(value),
        _ => Err(ValidationError::InvalidErrorRate(rate.to_string())),
    }
}

pub fn validate_item_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingParameter("id".to_string()));
    }
    Ok(())
}
