//! Instruction operands and entity ids.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// SSA value produced by an instruction (function-local).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Index of a global in its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalId(pub u32);

/// Index of a block in its function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Position of the block in `Function::blocks`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl GlobalId {
    /// Position of the global in `Module::globals`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Instruction operand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Integer constant, already truncated to `ty`.
    Const { ty: Type, value: u64 },
    /// Result of an earlier instruction.
    Value(ValueId),
    /// Address of a global.
    Global(GlobalId),
    /// Function argument by position.
    Arg(u32),
}

impl Operand {
    /// Create an integer constant, truncating to the type width.
    #[must_use]
    pub const fn const_int(ty: Type, value: u64) -> Self {
        Self::Const {
            ty,
            value: ty.truncate(value),
        }
    }

    /// Create an `i64` constant.
    #[must_use]
    pub const fn i64(value: u64) -> Self {
        Self::const_int(Type::I64, value)
    }

    /// Get the constant value, if this is a constant.
    #[must_use]
    pub const fn as_const(&self) -> Option<u64> {
        match self {
            Self::Const { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Get the referenced global, if any.
    #[must_use]
    pub const fn as_global(&self) -> Option<GlobalId> {
        match self {
            Self::Global(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}
