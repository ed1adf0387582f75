use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role carried in user records and token claims.
///
/// Roles are intentionally opaque strings at this layer; today the gate only
/// distinguishes authenticated from anonymous, so nothing interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Default role assigned at registration when none is requested.
    pub fn member() -> Self {
        Self::new("member")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
