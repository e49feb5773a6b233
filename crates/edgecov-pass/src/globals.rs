//! The two process-wide globals every instrumented block touches.

use edgecov_ir::{Global, GlobalId, Linkage, Module, Type};
use tracing::debug;

use crate::abi::{AREA_PTR_SYMBOL, PREV_LOC_SYMBOL};
use crate::error::{PassError, Result};

/// Handles to the coverage map pointer and the previous-location register.
///
/// Both are external declarations without initializers; the runtime
/// defines them and points the map pointer at the shared map before any
/// instrumented code runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoverageGlobals {
    /// `ptr` global holding the coverage map base address.
    pub area_ptr: GlobalId,
    /// `i16` global holding `cur_loc >> 1` of the last block.
    pub prev_loc: GlobalId,
}

impl CoverageGlobals {
    /// Declare both globals in `module`, reusing existing declarations.
    ///
    /// Both names are checked before either is added, so a conflict leaves
    /// `module` unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PassError::ConflictingGlobal` if a global with one of the
    /// reserved names exists with a different type or linkage.
    pub fn provision(module: &mut Module) -> Result<Self> {
        let area_ptr = existing(module, AREA_PTR_SYMBOL, Type::Ptr)?;
        let prev_loc = existing(module, PREV_LOC_SYMBOL, Type::I16)?;
        let area_ptr = area_ptr
            .unwrap_or_else(|| module.add_global(Global::external(AREA_PTR_SYMBOL, Type::Ptr)));
        let prev_loc = prev_loc
            .unwrap_or_else(|| module.add_global(Global::external(PREV_LOC_SYMBOL, Type::I16)));
        Ok(Self { area_ptr, prev_loc })
    }
}

/// Look up a compatible declaration of `name` without touching `module`.
fn existing(module: &Module, name: &str, ty: Type) -> Result<Option<GlobalId>> {
    let Some(id) = module.global_by_name(name) else {
        return Ok(None);
    };
    if let Some(found) = module.global(id)
        && (found.ty != ty || found.linkage != Linkage::External)
    {
        return Err(PassError::ConflictingGlobal {
            name: name.to_string(),
            found: found.ty,
            expected: ty,
            linkage: found.linkage,
        });
    }
    debug!(global = name, "reusing existing declaration");
    Ok(Some(id))
}
