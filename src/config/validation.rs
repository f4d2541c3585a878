//! Configuration validation logic.

use crate::config::schema::ServiceConfig;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation error: {0}")]
pub struct ValidationError(pub String);

/// Validate a ServiceConfig for semantic correctness.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.http_bind_address.is_empty() {
        errors.push(ValidationError(
            "http-bind-address must be set".to_string(),
        ));
    }
    if config.mirrorz_d_directory.as_os_str().is_empty() {
        errors.push(ValidationError(
            "mirrorz-d-directory must be set".to_string(),
        ));
    }
    if config.domain_length == 0 {
        errors.push(ValidationError("domain-length must be > 0".to_string()));
    }
    if config.cache_time == 0 {
        errors.push(ValidationError("cache-time must be > 0".to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServiceConfig {
        ServiceConfig {
            http_bind_address: "127.0.0.1:8080".into(),
            mirrorz_d_directory: "/etc/mirrorz.d".into(),
            homepage: "mirrors.example.org".into(),
            domain_length: 3,
            cache_time: 300,
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_zero_domain_length() {
        let mut config = valid_config();
        config.domain_length = 0;
        let errs = validate_config(&config).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].0.contains("domain-length"));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let config = ServiceConfig::default();
        let errs = validate_config(&config).unwrap_err();
        assert!(errs.len() >= 3);
    }
}
