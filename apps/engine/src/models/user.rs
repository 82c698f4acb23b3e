use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform account as returned by the identity capability.
///
/// Only `username` is interpreted by the engine; everything else the platform
/// sends (ids, avatar URLs, plan tier) is carried opaquely in `extra` so that
/// serializing a user back out loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: serde_json::Map::new(),
        }
    }
}
