//! Row-value validators and the validation stage that partitions rows into
//! valid and rejected sets.

mod is_email;
mod not_empty;
mod regex_rule;
mod validate_columns;

pub use is_email::IsEmailValidator;
pub use not_empty::NotEmptyValidator;
pub use regex_rule::RegexValidator;
pub use validate_columns::ValidateColumnsTransformer;

use crate::dataset::Value;

/// A per-value rule. `validate` judges one cell; `error_message` labels the
/// rejection.
pub trait Validator {
    fn validate(&self, value: &Value) -> bool;

    fn error_message(&self) -> String;
}
