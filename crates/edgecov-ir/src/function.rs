//! Function IR.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::operand::{BlockId, ValueId};
use crate::types::Type;

/// A function: parameters, return type and an ordered list of blocks.
///
/// The first block is the entry block. A function without blocks is a
/// declaration of something defined elsewhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FunctionRepr")]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Type>,
    #[serde(default)]
    pub ret: Option<Type>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Next unused SSA value number.
    next_value: u32,
}

/// Wire form of [`Function`]. The stored counter is only a hint.
#[derive(Deserialize)]
struct FunctionRepr {
    name: String,
    #[serde(default)]
    params: Vec<Type>,
    #[serde(default)]
    ret: Option<Type>,
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    next_value: u32,
}

impl From<FunctionRepr> for Function {
    fn from(repr: FunctionRepr) -> Self {
        let mut func = Self {
            name: repr.name,
            params: repr.params,
            ret: repr.ret,
            blocks: repr.blocks,
            next_value: repr.next_value,
        };
        func.sync_value_numbering();
        func
    }
}

impl Function {
    /// Create a function with no blocks yet.
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret: Option<Type>) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            blocks: Vec::new(),
            next_value: 0,
        }
    }

    /// Check if this is a declaration (no body).
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append a new block.
    pub fn add_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(u32::try_from(self.blocks.len()).unwrap_or(u32::MAX));
        self.blocks.push(Block::new(id, label));
        id
    }

    /// Get a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// Get a block by id, mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.index())
    }

    /// Allocate a fresh SSA value number.
    ///
    /// Bodies assembled by hand may leave the counter at zero; the first
    /// allocation then skips past every value already defined.
    pub fn fresh_value(&mut self) -> ValueId {
        if self.next_value == 0 {
            self.sync_value_numbering();
        }
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    /// Move the value counter past every value defined in the body.
    ///
    /// Call after editing `blocks` directly.
    pub fn sync_value_numbering(&mut self) {
        let floor = self.max_defined_value().map_or(0, |v| v.0 + 1);
        self.next_value = self.next_value.max(floor);
    }

    fn max_defined_value(&self) -> Option<ValueId> {
        self.blocks
            .iter()
            .flat_map(|b| {
                b.instructions
                    .iter()
                    .filter_map(|i| i.result)
                    .chain(invoke_result(&b.terminator))
            })
            .max()
    }

    /// Total number of non-terminator instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }
}

const fn invoke_result(term: &crate::Terminator) -> Option<ValueId> {
    match term {
        crate::Terminator::Invoke { result, .. } => *result,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ids_are_positions() {
        let mut f = Function::new("f", vec![], None);
        let a = f.add_block("a");
        let b = f.add_block("b");
        assert_eq!(a, BlockId(0));
        assert_eq!(b, BlockId(1));
        assert_eq!(f.block(b).map(|blk| blk.label.as_str()), Some("b"));
    }

    #[test]
    fn test_fresh_values_are_unique() {
        let mut f = Function::new("f", vec![], None);
        let x = f.fresh_value();
        let y = f.fresh_value();
        assert_ne!(x, y);
        assert!(f.is_declaration());
    }

    fn with_two_values() -> Function {
        use crate::{InstKind, Instr, Operand};

        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        let block = f.block_mut(entry).expect("entry");
        for id in 0..2 {
            block.instructions.push(Instr::new(
                Some(ValueId(id)),
                InstKind::Load {
                    ty: Type::I8,
                    ptr: Operand::Arg(0),
                },
            ));
        }
        f
    }

    #[test]
    fn test_fresh_value_skips_hand_built_values() {
        let mut f = with_two_values();
        assert_eq!(f.fresh_value(), ValueId(2));
    }

    #[test]
    fn test_stale_counter_from_json_is_raised() {
        let mut f = with_two_values();
        f.next_value = 1;
        let json = serde_json::to_string(&f).expect("serialize");
        let mut loaded: Function = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded.fresh_value(), ValueId(2));
    }

    #[test]
    fn test_sync_after_direct_edit() {
        let mut f = with_two_values();
        assert_eq!(f.fresh_value(), ValueId(2));
        let block = f.block_mut(BlockId(0)).expect("entry");
        block.instructions[0].result = Some(ValueId(9));
        f.sync_value_numbering();
        assert_eq!(f.fresh_value(), ValueId(10));
    }
}
