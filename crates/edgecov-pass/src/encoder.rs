//! Per-block edge recording sequence.

use edgecov_ir::{BlockId, Function, IRBuilder, Operand, Type};

use crate::abi::next_prev_loc;
use crate::error::{PassError, Result};
use crate::globals::CoverageGlobals;

/// Inserts the edge-recording sequence at the entry of a block:
///
/// ```text
/// %p  = load i16, @__afl_prev_loc        !nosanitize
/// %pw = zext i16 %p to i64
/// %e  = xor i64 %pw, cur_loc
/// %m  = load ptr, @__afl_area_ptr        !nosanitize
/// %a  = getelementptr i8, %m, %e
/// %c  = load i8, %a                      !nosanitize
/// %c1 = add i8 %c, 1
/// store i8 %c1, %a                       !nosanitize
/// store i16 cur_loc >> 1, @__afl_prev_loc !nosanitize
/// ```
///
/// The counter update is an unsynchronized read-modify-write. Concurrent
/// threads may lose updates.
#[derive(Clone, Copy, Debug)]
pub struct EdgeEncoder {
    globals: CoverageGlobals,
}

impl EdgeEncoder {
    #[must_use]
    pub const fn new(globals: CoverageGlobals) -> Self {
        Self { globals }
    }

    /// Instrument `block` of `func` with location id `cur_loc`.
    ///
    /// # Errors
    ///
    /// Returns `PassError::MissingBlock` if `block` is not in `func`.
    pub fn instrument(&self, func: &mut Function, block: BlockId, cur_loc: u32) -> Result<()> {
        let name = func.name.clone();
        let mut irb = IRBuilder::at_first_insertion_point(func, block)
            .ok_or(PassError::MissingBlock {
                func: name,
                block: block.0,
            })?
            .with_nosanitize(true);

        let prev_loc = irb.load(Type::I16, Operand::Global(self.globals.prev_loc));
        let prev_loc = irb.zext(Type::I16, Type::I64, prev_loc);
        let edge = irb.xor(Type::I64, prev_loc, Operand::i64(u64::from(cur_loc)));

        let map = irb.load(Type::Ptr, Operand::Global(self.globals.area_ptr));
        let cell = irb.gep(map, edge);

        let count = irb.load(Type::I8, cell.clone());
        let count = irb.add(Type::I8, count, Operand::const_int(Type::I8, 1));
        irb.store(Type::I8, count, cell);

        irb.store(
            Type::I16,
            Operand::const_int(Type::I16, u64::from(next_prev_loc(cur_loc))),
            Operand::Global(self.globals.prev_loc),
        );
        Ok(())
    }
}
