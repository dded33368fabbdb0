//! Member descriptors
//!
//! A [`Descriptor`] is what the host installs for a field, method or accessor
//! once every annotation on that member has run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Member shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MemberKind {
    /// Data field
    #[default]
    Field,
    /// Function member
    Method,
    /// Getter/setter pair
    Accessor,
}

/// Member descriptor threaded through member-level behaviors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Member shape
    pub kind: MemberKind,
    /// Initial value or function marker
    pub value: Value,
    /// Whether the member may be reassigned
    pub writable: bool,
    /// Whether the member shows up in enumeration
    pub enumerable: bool,
}

impl Descriptor {
    /// Writable, enumerable field with a `null` initial value
    #[inline]
    #[must_use]
    pub fn field() -> Self {
        Self {
            kind: MemberKind::Field,
            value: Value::Null,
            writable: true,
            enumerable: true,
        }
    }

    /// Non-enumerable method
    #[inline]
    #[must_use]
    pub fn method() -> Self {
        Self {
            kind: MemberKind::Method,
            value: Value::Null,
            writable: true,
            enumerable: false,
        }
    }

    /// Replace the value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Mark read-only
    #[inline]
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::field()
    }
}
