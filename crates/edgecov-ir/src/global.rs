//! Module-level globals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Symbol linkage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Visible to (and possibly defined by) other objects.
    #[default]
    External,
    /// Private to this module.
    Internal,
}

/// A global variable. Operands referencing it evaluate to its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    /// Type of the stored value.
    pub ty: Type,
    #[serde(default)]
    pub linkage: Linkage,
    /// Initial value. `None` means the definition lives elsewhere.
    #[serde(default)]
    pub initializer: Option<u64>,
}

impl Global {
    /// Declare an external global with no initializer.
    pub fn external(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            linkage: Linkage::External,
            initializer: None,
        }
    }

    /// Define an internal global with an initial value.
    pub fn internal(name: impl Into<String>, ty: Type, init: u64) -> Self {
        Self {
            name: name.into(),
            ty,
            linkage: Linkage::Internal,
            initializer: Some(ty.truncate(init)),
        }
    }

    /// Check if this is a declaration without a local definition.
    #[must_use]
    pub const fn is_declaration(&self) -> bool {
        self.initializer.is_none()
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External => f.write_str("external"),
            Self::Internal => f.write_str("internal"),
        }
    }
}
