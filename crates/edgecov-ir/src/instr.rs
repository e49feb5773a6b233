//! Non-terminator instructions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::debug::DebugLoc;
use crate::operand::{BlockId, Operand, ValueId};
use crate::types::Type;

/// Binary integer operations. Results wrap to the operand width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Lshr,
}

/// Integer comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IcmpPred {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sgt,
}

/// Instruction kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "inst", rename_all = "snake_case")]
pub enum InstKind {
    /// SSA merge. Must appear at the head of a block.
    Phi {
        ty: Type,
        incoming: Vec<(BlockId, Operand)>,
    },
    /// Exception landing site; yields the in-flight payload as `i64`.
    /// Must appear at the head of a block.
    LandingPad,
    Load {
        ty: Type,
        ptr: Operand,
    },
    Store {
        ty: Type,
        value: Operand,
        ptr: Operand,
    },
    ZExt {
        from: Type,
        to: Type,
        value: Operand,
    },
    Binary {
        op: BinaryOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Icmp {
        pred: IcmpPred,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    /// Byte-offset address arithmetic: `base + offset`.
    Gep {
        base: Operand,
        offset: Operand,
    },
    Call {
        callee: String,
        args: Vec<Operand>,
        ret: Option<Type>,
    },
}

impl InstKind {
    /// Check if this kind is pinned to the head of its block.
    #[must_use]
    pub const fn is_block_entry(&self) -> bool {
        matches!(self, Self::Phi { .. } | Self::LandingPad)
    }

    /// Check if this kind reads or writes memory.
    #[must_use]
    pub const fn is_memory_access(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::Store { .. })
    }

    /// Type of the produced value, if any.
    #[must_use]
    pub const fn result_type(&self) -> Option<Type> {
        match self {
            Self::Phi { ty, .. } | Self::Load { ty, .. } | Self::Binary { ty, .. } => Some(*ty),
            Self::LandingPad => Some(Type::I64),
            Self::ZExt { to, .. } => Some(*to),
            Self::Icmp { .. } => Some(Type::I1),
            Self::Gep { .. } => Some(Type::Ptr),
            Self::Call { ret, .. } => *ret,
            Self::Store { .. } => None,
        }
    }

    /// All operands read by this instruction.
    #[must_use]
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::Phi { incoming, .. } => incoming.iter().map(|(_, op)| op).collect(),
            Self::LandingPad => Vec::new(),
            Self::Load { ptr, .. } => vec![ptr],
            Self::Store { value, ptr, .. } => vec![value, ptr],
            Self::ZExt { value, .. } => vec![value],
            Self::Binary { lhs, rhs, .. } | Self::Icmp { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Gep { base, offset } => vec![base, offset],
            Self::Call { args, .. } => args.iter().collect(),
        }
    }
}

/// A single instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
    /// Value defined by this instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValueId>,
    #[serde(flatten)]
    pub kind: InstKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_loc: Option<DebugLoc>,
    /// Exempt this access from sanitizer instrumentation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nosanitize: bool,
}

impl Instr {
    /// Create an instruction with no debug location.
    #[must_use]
    pub const fn new(result: Option<ValueId>, kind: InstKind) -> Self {
        Self {
            result,
            kind,
            debug_loc: None,
            nosanitize: false,
        }
    }

    /// Attach a debug location.
    #[must_use]
    pub fn with_debug_loc(mut self, loc: Option<DebugLoc>) -> Self {
        self.debug_loc = loc;
        self
    }

    /// Check if this instruction is pinned to the head of its block.
    #[must_use]
    pub const fn is_block_entry(&self) -> bool {
        self.kind.is_block_entry()
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Shl => "shl",
            Self::Lshr => "lshr",
        };
        f.write_str(s)
    }
}

impl fmt::Display for IcmpPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Ult => "ult",
            Self::Ule => "ule",
            Self::Ugt => "ugt",
            Self::Uge => "uge",
            Self::Slt => "slt",
            Self::Sgt => "sgt",
        };
        f.write_str(s)
    }
}
