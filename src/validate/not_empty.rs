use crate::dataset::Value;
use crate::validate::Validator;

/// Rejects nulls and blank strings.
pub struct NotEmptyValidator;

impl Validator for NotEmptyValidator {
    fn validate(&self, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Str(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    fn error_message(&self) -> String {
        "value must not be empty".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_null_fail() {
        let v = NotEmptyValidator;
        assert!(v.validate(&Value::Str("ciao".into())));
        assert!(v.validate(&Value::Int(0)));
        assert!(!v.validate(&Value::Str("   ".into())));
        assert!(!v.validate(&Value::Null));
    }
}
