//! Option validation run right after merging.

use crate::error::{ConfigError, Result};
use crate::external::ExternalPattern;
use crate::options::BuildOptions;

/// Pluggable option validation.
pub trait ConfigValidator {
    fn validate(&self, options: &BuildOptions) -> Result<()>;
}

/// Structural checks that need no filesystem access.
pub struct OptionsValidator;

impl ConfigValidator for OptionsValidator {
    fn validate(&self, options: &BuildOptions) -> Result<()> {
        if options.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "outDir cannot be empty".to_string(),
            ));
        }

        if options.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue("name cannot be empty".to_string()));
        }

        for external in &options.externals {
            if let ExternalPattern::Exact(value) = external {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidExternal {
                        pattern: value.clone(),
                        message: "externals cannot contain empty strings".to_string(),
                    });
                }
            }
        }

        for dependency in options
            .dependencies
            .iter()
            .chain(&options.peer_dependencies)
            .chain(&options.dev_dependencies)
        {
            if dependency.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "dependency lists cannot contain empty names".to_string(),
                ));
            }
        }

        Ok(())
    }
}

pub fn validate_options(options: &BuildOptions) -> Result<()> {
    OptionsValidator.validate(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(extra: serde_json::Value) -> BuildOptions {
        let mut base = json!({ "name": "pkg", "rootDir": "/p", "outDir": "dist" });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn accepts_minimal_options() {
        assert!(validate_options(&options(json!({}))).is_ok());
    }

    #[test]
    fn rejects_empty_out_dir() {
        let err = validate_options(&options(json!({ "outDir": "" }))).unwrap_err();
        assert!(err.to_string().contains("outDir"));
    }

    #[test]
    fn rejects_blank_externals() {
        let err = validate_options(&options(json!({ "externals": ["react", " "] }))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExternal { .. }));
    }

    #[test]
    fn invalid_regex_external_fails_deserialization() {
        let parsed: std::result::Result<BuildOptions, _> = serde_json::from_value(json!({
            "name": "pkg", "rootDir": "/p", "outDir": "dist", "externals": ["/(/"]
        }));
        assert!(parsed.is_err());
    }
}
