//! Runtime side of edge coverage.
//!
//! Owns the coverage map and binds the two globals instrumented code
//! expects: `__afl_area_ptr` points at the map, `__afl_prev_loc` starts at
//! zero. [`Machine`] executes `edgecov-ir` modules so instrumented code can
//! be observed without a native toolchain.

mod machine;
mod map;

pub use edgecov_pass::abi::{
    AREA_PTR_SYMBOL, MAP_SIZE, MAP_SIZE_POW2, PREV_LOC_SYMBOL, edge_index, next_prev_loc,
};
pub use machine::{
    DEFAULT_MAX_DEPTH, DEFAULT_STEP_BUDGET, ExecError, GLOBAL_BASE, GLOBAL_STRIDE, HostFn,
    MAP_BASE, Machine, Outcome,
};
pub use map::{CoverageMap, MapError};
