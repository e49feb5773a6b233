//! Intermediate representation for the edge coverage pass.
//!
//! A small SSA form modelled on LLVM IR: modules own globals and functions,
//! functions own basic blocks, blocks own instructions and one terminator.
//! The coverage pass only ever inserts instructions at a block's first
//! insertion point; everything else here exists so programs can be built,
//! checked, printed and executed.

mod block;
mod builder;
mod debug;
mod display;
mod function;
mod global;
mod instr;
mod module;
mod operand;
mod terminator;
mod types;
mod verify;

pub use block::*;
pub use builder::*;
pub use debug::*;
pub use function::*;
pub use global::*;
pub use instr::*;
pub use module::*;
pub use operand::*;
pub use terminator::*;
pub use types::*;
pub use verify::*;
