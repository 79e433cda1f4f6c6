//! Cursor envelope shared by the composite list responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub paging: Paging,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paging {
    pub cursors: Cursors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cursors {
    pub after: String,
}

impl Pagination {
    /// Cursor for the next page, if the response reported one.
    pub fn after(&self) -> Option<&str> {
        let after = self.paging.cursors.after.as_str();
        (!after.is_empty()).then_some(after)
    }
}
