//! Block terminator IR.

use serde::{Deserialize, Serialize};

use crate::operand::{BlockId, Operand, ValueId};
use crate::types::Type;

/// Block terminator - controls where execution goes next.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "term", rename_all = "snake_case")]
pub enum Terminator {
    /// Unconditional branch.
    Br { dest: BlockId },
    /// Two-way conditional branch on an `i1`.
    CondBr {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    /// Return from the function.
    Ret { value: Option<Operand> },
    /// Call that may unwind. Continues at `normal` on return, at `unwind`
    /// (which must start with a landing pad) if the callee unwinds.
    Invoke {
        callee: String,
        args: Vec<Operand>,
        ret: Option<Type>,
        result: Option<ValueId>,
        normal: BlockId,
        unwind: BlockId,
    },
    /// Start or continue unwinding with `payload`.
    Resume { payload: Operand },
    /// Control never reaches here.
    #[default]
    Unreachable,
}

impl Terminator {
    /// Create an unconditional branch.
    #[must_use]
    pub const fn br(dest: BlockId) -> Self {
        Self::Br { dest }
    }

    /// Create a conditional branch.
    #[must_use]
    pub const fn cond_br(cond: Operand, then_dest: BlockId, else_dest: BlockId) -> Self {
        Self::CondBr {
            cond,
            then_dest,
            else_dest,
        }
    }

    /// Create a return.
    #[must_use]
    pub const fn ret(value: Option<Operand>) -> Self {
        Self::Ret { value }
    }

    /// Create a resume.
    #[must_use]
    pub const fn resume(payload: Operand) -> Self {
        Self::Resume { payload }
    }

    /// Successor blocks, in order.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Br { dest } => vec![*dest],
            Self::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Self::Invoke { normal, unwind, .. } => vec![*normal, *unwind],
            Self::Ret { .. } | Self::Resume { .. } | Self::Unreachable => Vec::new(),
        }
    }

    /// Operands read by the terminator.
    #[must_use]
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::CondBr { cond, .. } => vec![cond],
            Self::Ret { value } => value.iter().collect(),
            Self::Invoke { args, .. } => args.iter().collect(),
            Self::Resume { payload } => vec![payload],
            Self::Br { .. } | Self::Unreachable => Vec::new(),
        }
    }

    /// Check if control leaves the function.
    #[must_use]
    pub const fn is_exit(&self) -> bool {
        matches!(self, Self::Ret { .. } | Self::Resume { .. } | Self::Unreachable)
    }
}
