use regex::Regex;

use crate::dataset::Value;
use crate::error::{EtlError, Result};
use crate::validate::Validator;

/// Accepts values whose canonical string form matches the pattern. Nulls
/// never match.
pub struct RegexValidator {
    pattern: Regex,
}

impl RegexValidator {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| EtlError::Config(format!("invalid validator pattern '{}': {}", pattern, e)))?;
        Ok(Self { pattern })
    }
}

impl Validator for RegexValidator {
    fn validate(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        self.pattern.is_match(&value.key())
    }

    fn error_message(&self) -> String {
        format!("value does not match pattern '{}'", self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_canonical_form() {
        let v = RegexValidator::new(r"^\d{5}$").unwrap();
        assert!(v.validate(&Value::Str("80100".into())));
        assert!(v.validate(&Value::Int(80100)));
        assert!(!v.validate(&Value::Str("8010".into())));
        assert!(!v.validate(&Value::Null));
    }

    #[test]
    fn bad_pattern_is_config_error() {
        assert!(matches!(RegexValidator::new("("), Err(EtlError::Config(_))));
    }
}
