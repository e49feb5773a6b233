//! Basic block IR.

use serde::{Deserialize, Serialize};

use crate::debug::DebugLoc;
use crate::instr::Instr;
use crate::operand::BlockId;
use crate::terminator::Terminator;

/// A basic block: straight-line instructions ending in one terminator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub instructions: Vec<Instr>,
    #[serde(default)]
    pub terminator: Terminator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminator_loc: Option<DebugLoc>,
}

impl Block {
    /// Create an empty block ending in `unreachable`.
    pub fn new(id: BlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
            terminator_loc: None,
        }
    }

    /// Index of the first position where a regular instruction may be
    /// inserted: past any leading phis and landing pads. Equals `len()` when
    /// the block holds nothing else, i.e. insertion right before the
    /// terminator.
    #[must_use]
    pub fn first_insertion_point(&self) -> usize {
        self.instructions
            .iter()
            .position(|i| !i.is_block_entry())
            .unwrap_or(self.instructions.len())
    }

    /// Debug location of whatever sits at `pos` (the terminator if `pos` is
    /// past the last instruction).
    #[must_use]
    pub fn debug_loc_at(&self, pos: usize) -> Option<&DebugLoc> {
        self.instructions.get(pos).map_or(
            self.terminator_loc.as_ref(),
            |instr| instr.debug_loc.as_ref(),
        )
    }

    /// Successor blocks.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator.successors()
    }

    /// Number of non-terminator instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the block has no non-terminator instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
