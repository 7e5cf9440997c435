use regex::Regex;

use crate::dataset::Value;
use crate::validate::Validator;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Accepts syntactically plausible e-mail addresses.
pub struct IsEmailValidator {
    pattern: Regex,
}

impl IsEmailValidator {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(EMAIL_PATTERN).expect("constant pattern"),
        }
    }
}

impl Default for IsEmailValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for IsEmailValidator {
    fn validate(&self, value: &Value) -> bool {
        match value {
            Value::Str(s) => self.pattern.is_match(s.trim()),
            _ => false,
        }
    }

    fn error_message(&self) -> String {
        "value is not a valid e-mail address".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_addresses() {
        let v = IsEmailValidator::new();
        assert!(v.validate(&Value::Str("mario.rossi@example.com".into())));
        assert!(!v.validate(&Value::Str("not-an-email".into())));
        assert!(!v.validate(&Value::Null));
    }
}
