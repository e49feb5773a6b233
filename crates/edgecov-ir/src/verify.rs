//! Structural verification.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::function::Function;
use crate::module::Module;
use crate::operand::{BlockId, Operand, ValueId};
use crate::terminator::Terminator;

/// Structural rule violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("{func}/{block}: block-entry instruction at position {pos} follows a regular instruction")]
    MisplacedBlockEntry {
        func: String,
        block: BlockId,
        pos: usize,
    },
    #[error("{func}/{block}: branch to missing block {target}")]
    MissingBlock {
        func: String,
        block: BlockId,
        target: BlockId,
    },
    #[error("{func}/{block}: block id does not match its position")]
    BlockIdMismatch { func: String, block: BlockId },
    #[error("{func}: reference to missing global #{global}")]
    MissingGlobal { func: String, global: u32 },
    #[error("{func}: value {value} defined more than once")]
    DuplicateValue { func: String, value: ValueId },
    #[error("{func}/{block}: unwind destination {target} does not start with a landing pad")]
    UnwindWithoutLandingPad {
        func: String,
        block: BlockId,
        target: BlockId,
    },
}

/// Verify every function body in `module`.
///
/// # Errors
///
/// Returns the first violation found.
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    for func in module.definitions() {
        verify_function(module, func)?;
    }
    Ok(())
}

fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    let mut defined = FxHashSet::default();
    let name = || func.name.clone();

    for (idx, block) in func.blocks.iter().enumerate() {
        if block.id.index() != idx {
            return Err(VerifyError::BlockIdMismatch {
                func: name(),
                block: block.id,
            });
        }

        let head = block.first_insertion_point();
        if let Some(pos) = block.instructions[head..]
            .iter()
            .position(crate::Instr::is_block_entry)
        {
            return Err(VerifyError::MisplacedBlockEntry {
                func: name(),
                block: block.id,
                pos: head + pos,
            });
        }

        for instr in &block.instructions {
            if let Some(value) = instr.result
                && !defined.insert(value)
            {
                return Err(VerifyError::DuplicateValue { func: name(), value });
            }
            check_operands(module, func, instr.kind.operands())?;
        }
        check_operands(module, func, block.terminator.operands())?;

        for target in block.successors() {
            if func.block(target).is_none() {
                return Err(VerifyError::MissingBlock {
                    func: name(),
                    block: block.id,
                    target,
                });
            }
        }

        if let Terminator::Invoke { unwind, result, .. } = &block.terminator {
            let starts_with_pad = func
                .block(*unwind)
                .and_then(|b| b.instructions.first())
                .is_some_and(|i| matches!(i.kind, crate::InstKind::LandingPad));
            if !starts_with_pad {
                return Err(VerifyError::UnwindWithoutLandingPad {
                    func: name(),
                    block: block.id,
                    target: *unwind,
                });
            }
            if let Some(value) = result
                && !defined.insert(*value)
            {
                return Err(VerifyError::DuplicateValue {
                    func: name(),
                    value: *value,
                });
            }
        }
    }
    Ok(())
}

fn check_operands(module: &Module, func: &Function, ops: Vec<&Operand>) -> Result<(), VerifyError> {
    for op in ops {
        if let Operand::Global(id) = op
            && module.global(*id).is_none()
        {
            return Err(VerifyError::MissingGlobal {
                func: func.name.clone(),
                global: id.0,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IRBuilder;
    use crate::operand::GlobalId;
    use crate::types::Type;

    #[test]
    fn test_valid_module() {
        let mut m = Module::new("m");
        let g = m.add_global(crate::Global::external("g", Type::I8));
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        let exit = f.add_block("exit");
        {
            let mut b = IRBuilder::at_end(&mut f, entry).expect("entry");
            b.load(Type::I8, Operand::Global(g));
            b.terminate(Terminator::br(exit));
        }
        IRBuilder::at_end(&mut f, exit)
            .expect("exit")
            .terminate(Terminator::ret(None));
        m.add_function(f);
        assert_eq!(verify_module(&m), Ok(()));
    }

    #[test]
    fn test_phi_after_regular_instruction() {
        let mut m = Module::new("m");
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        {
            let mut b = IRBuilder::at_end(&mut f, entry).expect("entry");
            b.add(Type::I64, Operand::i64(1), Operand::i64(1));
            b.phi(Type::I64, vec![]);
            b.terminate(Terminator::ret(None));
        }
        m.add_function(f);
        assert!(matches!(
            verify_module(&m),
            Err(VerifyError::MisplacedBlockEntry { pos: 1, .. })
        ));
    }

    #[test]
    fn test_missing_global_and_block() {
        let mut m = Module::new("m");
        let mut f = Function::new("f", vec![], None);
        let entry = f.add_block("entry");
        {
            let mut b = IRBuilder::at_end(&mut f, entry).expect("entry");
            b.load(Type::I8, Operand::Global(GlobalId(3)));
            b.terminate(Terminator::br(BlockId(9)));
        }
        m.add_function(f);
        assert!(matches!(
            verify_module(&m),
            Err(VerifyError::MissingGlobal { global: 3, .. })
        ));
    }
}
