//! Positioned IR builder.

use crate::debug::DebugLoc;
use crate::function::Function;
use crate::instr::{BinaryOp, IcmpPred, InstKind, Instr};
use crate::operand::{BlockId, Operand, ValueId};
use crate::terminator::Terminator;
use crate::types::Type;

/// Inserts instructions into one block at a moving position.
///
/// Every created instruction inherits the builder's current debug location.
/// With `nosanitize` set, every load and store it creates is marked exempt
/// from sanitizer instrumentation.
pub struct IRBuilder<'f> {
    func: &'f mut Function,
    block: usize,
    pos: usize,
    debug_loc: Option<DebugLoc>,
    nosanitize: bool,
}

impl<'f> IRBuilder<'f> {
    /// Position before instruction `pos` of `block`. Returns `None` if the
    /// block does not exist or `pos` is out of range.
    pub fn at(func: &'f mut Function, block: BlockId, pos: usize) -> Option<Self> {
        let len = func.block(block)?.len();
        if pos > len {
            return None;
        }
        Some(Self {
            func,
            block: block.index(),
            pos,
            debug_loc: None,
            nosanitize: false,
        })
    }

    /// Position after the last non-terminator instruction of `block`.
    pub fn at_end(func: &'f mut Function, block: BlockId) -> Option<Self> {
        let len = func.block(block)?.len();
        Self::at(func, block, len)
    }

    /// Position at the block's first insertion point, taking the debug
    /// location of whatever currently sits there.
    pub fn at_first_insertion_point(func: &'f mut Function, block: BlockId) -> Option<Self> {
        let blk = func.block(block)?;
        let pos = blk.first_insertion_point();
        let loc = blk.debug_loc_at(pos).cloned();
        Some(Self::at(func, block, pos)?.with_debug_loc(loc))
    }

    /// Set the debug location for subsequently created instructions.
    #[must_use]
    pub fn with_debug_loc(mut self, loc: Option<DebugLoc>) -> Self {
        self.debug_loc = loc;
        self
    }

    /// Mark subsequently created memory accesses as `nosanitize`.
    #[must_use]
    pub const fn with_nosanitize(mut self, enabled: bool) -> Self {
        self.nosanitize = enabled;
        self
    }

    /// Current insertion index.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Block being built.
    #[must_use]
    pub fn block_id(&self) -> BlockId {
        self.func.blocks[self.block].id
    }

    fn insert(&mut self, result: Option<ValueId>, kind: InstKind) {
        let nosanitize = self.nosanitize && kind.is_memory_access();
        let mut instr = Instr::new(result, kind).with_debug_loc(self.debug_loc.clone());
        instr.nosanitize = nosanitize;
        self.func.blocks[self.block].instructions.insert(self.pos, instr);
        self.pos += 1;
    }

    fn insert_value(&mut self, kind: InstKind) -> Operand {
        let id = self.func.fresh_value();
        self.insert(Some(id), kind);
        Operand::Value(id)
    }

    /// Load a `ty` value from `ptr`.
    pub fn load(&mut self, ty: Type, ptr: Operand) -> Operand {
        self.insert_value(InstKind::Load { ty, ptr })
    }

    /// Store a `ty` value to `ptr`.
    pub fn store(&mut self, ty: Type, value: Operand, ptr: Operand) {
        self.insert(None, InstKind::Store { ty, value, ptr });
    }

    /// Zero-extend `value` from `from` to `to`.
    pub fn zext(&mut self, from: Type, to: Type, value: Operand) -> Operand {
        self.insert_value(InstKind::ZExt { from, to, value })
    }

    /// Binary integer operation.
    pub fn binary(&mut self, op: BinaryOp, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.insert_value(InstKind::Binary { op, ty, lhs, rhs })
    }

    pub fn add(&mut self, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.binary(BinaryOp::Add, ty, lhs, rhs)
    }

    pub fn xor(&mut self, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.binary(BinaryOp::Xor, ty, lhs, rhs)
    }

    /// Integer comparison producing an `i1`.
    pub fn icmp(&mut self, pred: IcmpPred, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.insert_value(InstKind::Icmp { pred, ty, lhs, rhs })
    }

    /// Address `base + offset` (offset in bytes).
    pub fn gep(&mut self, base: Operand, offset: Operand) -> Operand {
        self.insert_value(InstKind::Gep { base, offset })
    }

    /// Call `callee`. Returns the result operand if `ret` is set.
    pub fn call(&mut self, callee: &str, args: Vec<Operand>, ret: Option<Type>) -> Option<Operand> {
        let kind = InstKind::Call {
            callee: callee.to_string(),
            args,
            ret,
        };
        if ret.is_some() {
            Some(self.insert_value(kind))
        } else {
            self.insert(None, kind);
            None
        }
    }

    /// SSA merge. Only meaningful at the head of a block.
    pub fn phi(&mut self, ty: Type, incoming: Vec<(BlockId, Operand)>) -> Operand {
        self.insert_value(InstKind::Phi { ty, incoming })
    }

    /// Landing pad. Only meaningful at the head of an unwind destination.
    pub fn landing_pad(&mut self) -> Operand {
        self.insert_value(InstKind::LandingPad)
    }

    /// Replace the block's terminator.
    pub fn terminate(&mut self, terminator: Terminator) {
        let loc = self.debug_loc.clone();
        let block = &mut self.func.blocks[self.block];
        block.terminator = terminator;
        block.terminator_loc = loc;
    }

    /// Terminate with an `invoke`, allocating its result value if `ret` is set.
    pub fn invoke(
        &mut self,
        callee: &str,
        args: Vec<Operand>,
        ret: Option<Type>,
        normal: BlockId,
        unwind: BlockId,
    ) -> Option<Operand> {
        let result = ret.map(|_| self.func.fresh_value());
        self.terminate(Terminator::Invoke {
            callee: callee.to_string(),
            args,
            ret,
            result,
            normal,
            unwind,
        });
        result.map(Operand::Value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::GlobalId;

    #[test]
    fn test_builder_appends_in_order() {
        let mut f = Function::new("f", vec![Type::I64], Some(Type::I64));
        let entry = f.add_block("entry");
        let mut b = IRBuilder::at_end(&mut f, entry).expect("entry block");
        let x = b.add(Type::I64, Operand::Arg(0), Operand::i64(1));
        let y = b.xor(Type::I64, x.clone(), Operand::i64(3));
        b.terminate(Terminator::ret(Some(y)));
        assert_eq!(b.position(), 2);

        let blk = f.block(entry).expect("entry block");
        assert_eq!(blk.len(), 2);
        assert!(matches!(
            blk.instructions[1].kind,
            InstKind::Binary { op: BinaryOp::Xor, .. }
        ));
        assert!(matches!(blk.terminator, Terminator::Ret { value: Some(_) }));
    }

    #[test]
    fn test_nosanitize_marks_memory_only() {
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        let mut b = IRBuilder::at_end(&mut f, entry)
            .expect("entry block")
            .with_nosanitize(true);
        let v = b.load(Type::I16, Operand::Global(GlobalId(0)));
        let w = b.zext(Type::I16, Type::I64, v);
        b.store(Type::I64, w, Operand::Global(GlobalId(1)));

        let blk = f.block(entry).expect("entry block");
        let flags: Vec<bool> = blk.instructions.iter().map(|i| i.nosanitize).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_first_insertion_point_inherits_debug_loc() {
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        {
            let mut b = IRBuilder::at_end(&mut f, entry)
                .expect("entry block")
                .with_debug_loc(Some(DebugLoc::new("x.c", 7)));
            b.phi(Type::I64, vec![]);
            b.add(Type::I64, Operand::i64(1), Operand::i64(2));
        }
        let mut b = IRBuilder::at_first_insertion_point(&mut f, entry).expect("entry block");
        assert_eq!(b.position(), 1);
        b.load(Type::I8, Operand::Arg(0));
        let blk = f.block(entry).expect("entry block");
        assert!(matches!(blk.instructions[1].kind, InstKind::Load { .. }));
        assert_eq!(blk.instructions[1].debug_loc.as_ref().map(|l| l.line), Some(7));
    }

    #[test]
    fn test_out_of_range_position() {
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        assert!(IRBuilder::at(&mut f, entry, 1).is_none());
        assert!(IRBuilder::at(&mut f, BlockId(5), 0).is_none());
    }
}
