//! Substitutor configuration.

use crate::error::ExprError;
use erasure_common::limits::MAX_EXPR_REWRITE_DEPTH;
use erasure_types::EqualityPolicy;
use serde::{Deserialize, Serialize};

/// Options of one [`EntityTypeSubstitutor`](crate::EntityTypeSubstitutor).
///
/// Deserialized from JSON with camelCase keys; missing keys take their
/// defaults:
///
/// ```json
/// { "defaultPolicy": "value", "eraseEnums": true, "maxDepth": 2000 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SubstitutorOptions {
    /// Equality policy of replacements for entity types that cannot reach
    /// themselves. Self-reachable entity types always get reference
    /// equality.
    pub default_policy: EqualityPolicy,
    /// Replace enums with mapped values by their underlying integral type.
    pub erase_enums: bool,
    /// Nesting limit for expressions.
    pub max_depth: u32,
}

impl Default for SubstitutorOptions {
    fn default() -> Self {
        SubstitutorOptions {
            default_policy: EqualityPolicy::Value,
            erase_enums: true,
            max_depth: MAX_EXPR_REWRITE_DEPTH,
        }
    }
}

impl SubstitutorOptions {
    pub fn from_json(text: &str) -> Result<Self, ExprError> {
        let options: SubstitutorOptions = serde_json::from_str(text)
            .map_err(|err| ExprError::invalid("options", err.to_string()))?;
        if options.max_depth == 0 {
            return Err(ExprError::invalid("options", "maxDepth must be positive"));
        }
        Ok(options)
    }
}

#[cfg(test)]
#[path = "../tests/options_tests.rs"]
mod tests;
