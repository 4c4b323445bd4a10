//! Identifier casing helpers.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::Serialize;

/// The different spellings of one identifier used across generated code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Names {
    /// The name as it appears in the API description or configuration.
    pub original: String,
    /// UpperCamelCase form, used for exported types and fields.
    pub camel: String,
    /// lowerCamelCase form, used for local variables.
    pub camel_lower: String,
    /// snake_case form, used for file names.
    pub snake: String,
}

impl Names {
    /// Derive every spelling from an original identifier.
    #[must_use]
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            camel: original.to_upper_camel_case(),
            camel_lower: original.to_lower_camel_case(),
            snake: original.to_snake_case(),
            original,
        }
    }
}
