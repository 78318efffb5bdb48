//! Canonical entity keys.

use serde::{Deserialize, Serialize};

/// Separator between the parts of an entity key (`schema.table.column`).
pub const SEPARATOR: char = '.';

/// A canonical reference to a table, a table column, or a table measure.
///
/// Keys are trimmed and upper-cased on construction so that `Sales.Amount`
/// and `SALES.amount` address the same node. The graph never stores entity
/// payloads, only these keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(String);

impl EntityRef {
    /// Create a reference from an already-joined key.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_uppercase())
    }

    /// Reference to a whole table (or view, or procedure).
    pub fn table(name: impl AsRef<str>) -> Self {
        Self::new(name)
    }

    /// Reference to a column or measure owned by `table`.
    ///
    /// An empty table yields the bare member name.
    pub fn member(table: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        let table = table.as_ref().trim();
        let name = name.as_ref().trim();
        if table.is_empty() {
            Self::new(name)
        } else {
            Self::new(format!("{}{}{}", table, SEPARATOR, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into (owner, member) at the last separator.
    pub fn split_member(&self) -> Option<(&str, &str)> {
        self.0
            .rsplit_once(SEPARATOR)
            .filter(|(owner, member)| !owner.is_empty() && !member.is_empty())
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for EntityRef {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
