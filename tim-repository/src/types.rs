//! Request types for alias updates.

use serde::{Deserialize, Serialize};

/// One action of an atomic alias update request.
///
/// Serializes to the shape the aliases endpoint expects, e.g.
/// `{"add": {"index": "alma-2022-09-01t00-00-00", "alias": "all-current"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasAction {
    /// Link an index to an alias, creating the alias if needed.
    Add { index: String, alias: String },
    /// Unlink an index from an alias.
    Remove { index: String, alias: String },
}

impl AliasAction {
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }

    /// The index this action touches.
    pub fn index(&self) -> &str {
        match self {
            Self::Add { index, .. } | Self::Remove { index, .. } => index,
        }
    }

    /// The alias this action touches.
    pub fn alias(&self) -> &str {
        match self {
            Self::Add { alias, .. } | Self::Remove { alias, .. } => alias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_action_serialization() {
        assert_eq!(
            serde_json::to_value(AliasAction::add("alma-1", "all-current")).unwrap(),
            json!({ "add": { "index": "alma-1", "alias": "all-current" } })
        );
        assert_eq!(
            serde_json::to_value(AliasAction::remove("alma-0", "alma")).unwrap(),
            json!({ "remove": { "index": "alma-0", "alias": "alma" } })
        );
    }
}
