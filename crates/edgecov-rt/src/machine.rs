//! Reference interpreter for `edgecov-ir` modules.
//!
//! # Address space
//!
//! ```text
//! GLOBAL_BASE + i * GLOBAL_STRIDE   global slot i (one value, any width)
//! MAP_BASE .. MAP_BASE + map.len()  coverage map, byte addressed
//! ```
//!
//! Anything else is a bad address. Map accesses are bounds-checked but
//! never masked, so an out-of-range edge id surfaces as an error instead of
//! silently aliasing another cell.

use std::ops::ControlFlow;

use edgecov_ir::{
    BinaryOp, Block, BlockId, Function, GlobalId, IcmpPred, InstKind, Instr, Module, Operand,
    Terminator, Type, ValueId,
};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

use crate::map::CoverageMap;
use crate::{AREA_PTR_SYMBOL, PREV_LOC_SYMBOL};

/// Address of global slot 0.
pub const GLOBAL_BASE: u64 = 0x1000;
/// Distance between global slots.
pub const GLOBAL_STRIDE: u64 = 8;
/// Address of coverage map cell 0.
pub const MAP_BASE: u64 = 0x1_0000_0000;

/// Default instruction budget for one top-level call.
pub const DEFAULT_STEP_BUDGET: u64 = 10_000_000;
/// Default maximum call nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Execution error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("no definition or host function for @{0}")]
    UnknownFunction(String),

    #[error("@{func} takes {expected} arguments, got {found}")]
    ArgCount {
        func: String,
        expected: usize,
        found: usize,
    },

    #[error("@{func}: no argument {index}")]
    MissingArg { func: String, index: u32 },

    #[error("@{func}: {value} used before definition")]
    UndefinedValue { func: String, value: ValueId },

    #[error("@{func}: no block {block}")]
    MissingBlock { func: String, block: BlockId },

    #[error("@{func}: phi in {block} has no value for predecessor {pred:?}")]
    NoIncoming {
        func: String,
        block: BlockId,
        pred: Option<BlockId>,
    },

    #[error("@{func}: landingpad reached without an exception in flight")]
    StrayLandingPad { func: String },

    #[error("bad {ty} access at {addr:#x}")]
    BadAddress { addr: u64, ty: Type },

    #[error("@{func}: reached unreachable")]
    Unreachable { func: String },

    #[error("step budget of {0} exhausted")]
    StepBudgetExhausted(u64),

    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),
}

/// How a call finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Normal return, with the value for non-void functions.
    Return(Option<u64>),
    /// The callee unwound with this payload.
    Unwind(u64),
}

/// Host implementation of an external function.
pub type HostFn = Box<dyn FnMut(&[u64]) -> Outcome>;

/// Per-call state.
struct Frame<'m> {
    func: &'m Function,
    args: Vec<u64>,
    values: FxHashMap<ValueId, u64>,
    /// Payload waiting for the landing pad of the current block.
    in_flight: Option<u64>,
}

impl Frame<'_> {
    fn name(&self) -> String {
        self.func.name.clone()
    }

    fn define(&mut self, value: Option<ValueId>, ty: Option<Type>, raw: u64) {
        if let Some(id) = value {
            let raw = ty.map_or(raw, |ty| ty.truncate(raw));
            self.values.insert(id, raw);
        }
    }

    fn eval(&self, op: &Operand) -> Result<u64, ExecError> {
        match op {
            Operand::Const { value, .. } => Ok(*value),
            Operand::Value(id) => self
                .values
                .get(id)
                .copied()
                .ok_or_else(|| ExecError::UndefinedValue {
                    func: self.name(),
                    value: *id,
                }),
            Operand::Global(id) => Ok(global_addr(*id)),
            Operand::Arg(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.args.get(i).copied())
                .ok_or_else(|| ExecError::MissingArg {
                    func: self.name(),
                    index: *index,
                }),
        }
    }

    fn eval_all(&self, ops: &[Operand]) -> Result<Vec<u64>, ExecError> {
        ops.iter().map(|op| self.eval(op)).collect()
    }
}

/// Interpreter bound to one module and one coverage map.
pub struct Machine<'m> {
    module: &'m Module,
    map: CoverageMap,
    globals: Vec<u64>,
    hosts: FxHashMap<String, HostFn>,
    step_budget: u64,
    max_depth: usize,
    steps: u64,
}

impl<'m> Machine<'m> {
    /// Machine with a default-sized map.
    #[must_use]
    pub fn new(module: &'m Module) -> Self {
        Self::with_map(module, CoverageMap::default())
    }

    /// Machine writing coverage into `map`.
    #[must_use]
    pub fn with_map(module: &'m Module, map: CoverageMap) -> Self {
        let globals = module
            .globals
            .iter()
            .map(|g| match g.name.as_str() {
                AREA_PTR_SYMBOL => MAP_BASE,
                PREV_LOC_SYMBOL => 0,
                _ => g.initializer.map_or(0, |v| g.ty.truncate(v)),
            })
            .collect();
        Self {
            module,
            map,
            globals,
            hosts: FxHashMap::default(),
            step_budget: DEFAULT_STEP_BUDGET,
            max_depth: DEFAULT_MAX_DEPTH,
            steps: 0,
        }
    }

    #[must_use]
    pub const fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = budget;
        self
    }

    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Register a host function. Module definitions take precedence.
    pub fn register_host(
        &mut self,
        name: impl Into<String>,
        f: impl FnMut(&[u64]) -> Outcome + 'static,
    ) {
        self.hosts.insert(name.into(), Box::new(f));
    }

    #[must_use]
    pub const fn map(&self) -> &CoverageMap {
        &self.map
    }

    #[must_use]
    pub fn into_map(self) -> CoverageMap {
        self.map
    }

    /// Steps taken by the last top-level call.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Current value of a global by name.
    #[must_use]
    pub fn global_value(&self, name: &str) -> Option<u64> {
        let id = self.module.global_by_name(name)?;
        self.globals.get(id.index()).copied()
    }

    /// Current previous-location register, zero if the module never
    /// declared it.
    #[must_use]
    pub fn prev_loc(&self) -> u16 {
        self.global_value(PREV_LOC_SYMBOL)
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(0)
    }

    /// Clear the map and the previous-location register.
    pub fn reset_coverage(&mut self) {
        self.map.reset();
        if let Some(id) = self.module.global_by_name(PREV_LOC_SYMBOL)
            && let Some(slot) = self.globals.get_mut(id.index())
        {
            *slot = 0;
        }
    }

    /// Call `name` with `args`.
    ///
    /// The step counter restarts for every top-level call. Coverage and
    /// globals carry over, as they would in a long-running process.
    ///
    /// # Errors
    ///
    /// Returns an error on any fault: unknown function, bad address,
    /// exhausted budget, excessive recursion and so on.
    pub fn call(&mut self, name: &str, args: &[u64]) -> Result<Outcome, ExecError> {
        self.steps = 0;
        self.call_at_depth(name, args.to_vec(), 0)
    }

    fn call_at_depth(
        &mut self,
        name: &str,
        args: Vec<u64>,
        depth: usize,
    ) -> Result<Outcome, ExecError> {
        if depth >= self.max_depth {
            return Err(ExecError::CallDepthExceeded(self.max_depth));
        }
        let module = self.module;
        if let Some(func) = module.function(name).filter(|f| !f.is_declaration()) {
            return self.run_function(func, args, depth);
        }
        match self.hosts.get_mut(name) {
            Some(host) => {
                trace!(func = name, "host call");
                Ok(host(&args))
            }
            None => Err(ExecError::UnknownFunction(name.to_string())),
        }
    }

    fn run_function(
        &mut self,
        func: &'m Function,
        args: Vec<u64>,
        depth: usize,
    ) -> Result<Outcome, ExecError> {
        if args.len() != func.params.len() {
            return Err(ExecError::ArgCount {
                func: func.name.clone(),
                expected: func.params.len(),
                found: args.len(),
            });
        }
        trace!(func = %func.name, depth, "enter");
        let args = args
            .iter()
            .zip(&func.params)
            .map(|(v, ty)| ty.truncate(*v))
            .collect();
        let mut frame = Frame {
            func,
            args,
            values: FxHashMap::default(),
            in_flight: None,
        };

        let mut pred = None;
        let mut current = BlockId(0);
        loop {
            let block = func.block(current).ok_or_else(|| ExecError::MissingBlock {
                func: frame.name(),
                block: current,
            })?;

            let body = self.enter_block(&mut frame, block, pred)?;
            for instr in &block.instructions[body..] {
                self.tick()?;
                if let ControlFlow::Break(payload) = self.exec(&mut frame, instr, depth)? {
                    return Ok(Outcome::Unwind(payload));
                }
            }

            self.tick()?;
            let next = match &block.terminator {
                Terminator::Br { dest } => *dest,
                Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                } => {
                    if frame.eval(cond)? & 1 == 1 {
                        *then_dest
                    } else {
                        *else_dest
                    }
                }
                Terminator::Ret { value } => {
                    let value = value
                        .as_ref()
                        .map(|v| frame.eval(v))
                        .transpose()?
                        .map(|v| func.ret.map_or(v, |ty| ty.truncate(v)));
                    return Ok(Outcome::Return(value));
                }
                Terminator::Invoke {
                    callee,
                    args,
                    ret,
                    result,
                    normal,
                    unwind,
                } => {
                    let args = frame.eval_all(args)?;
                    match self.call_at_depth(callee, args, depth + 1)? {
                        Outcome::Return(value) => {
                            if let Some(value) = value {
                                frame.define(*result, *ret, value);
                            }
                            *normal
                        }
                        Outcome::Unwind(payload) => {
                            frame.in_flight = Some(payload);
                            *unwind
                        }
                    }
                }
                Terminator::Resume { payload } => {
                    return Ok(Outcome::Unwind(frame.eval(payload)?));
                }
                Terminator::Unreachable => {
                    return Err(ExecError::Unreachable { func: frame.name() });
                }
            };
            pred = Some(current);
            current = next;
        }
    }

    /// Evaluate the block-entry instructions of `block`. Phis read their
    /// incoming values simultaneously. Returns the index of the first
    /// ordinary instruction.
    fn enter_block(
        &mut self,
        frame: &mut Frame<'m>,
        block: &Block,
        pred: Option<BlockId>,
    ) -> Result<usize, ExecError> {
        let body = block.first_insertion_point();
        let mut defs = Vec::new();
        for instr in &block.instructions[..body] {
            self.tick()?;
            let value = match &instr.kind {
                InstKind::Phi { ty, incoming } => {
                    let (_, op) = incoming
                        .iter()
                        .find(|(from, _)| Some(*from) == pred)
                        .ok_or_else(|| ExecError::NoIncoming {
                            func: frame.name(),
                            block: block.id,
                            pred,
                        })?;
                    ty.truncate(frame.eval(op)?)
                }
                _ => frame
                    .in_flight
                    .take()
                    .ok_or_else(|| ExecError::StrayLandingPad { func: frame.name() })?,
            };
            defs.push((instr.result, instr.kind.result_type(), value));
        }
        for (result, ty, value) in defs {
            frame.define(result, ty, value);
        }
        Ok(body)
    }

    fn exec(
        &mut self,
        frame: &mut Frame<'m>,
        instr: &Instr,
        depth: usize,
    ) -> Result<ControlFlow<u64>, ExecError> {
        let value = match &instr.kind {
            InstKind::Load { ty, ptr } => {
                let addr = frame.eval(ptr)?;
                self.load(*ty, addr)?
            }
            InstKind::Store { ty, value, ptr } => {
                let value = frame.eval(value)?;
                let addr = frame.eval(ptr)?;
                self.store(*ty, addr, value)?;
                return Ok(ControlFlow::Continue(()));
            }
            InstKind::ZExt { from, value, .. } => from.truncate(frame.eval(value)?),
            InstKind::Binary { op, ty, lhs, rhs } => {
                let lhs = ty.truncate(frame.eval(lhs)?);
                let rhs = ty.truncate(frame.eval(rhs)?);
                binary(*op, *ty, lhs, rhs)
            }
            InstKind::Icmp { pred, ty, lhs, rhs } => {
                let lhs = ty.truncate(frame.eval(lhs)?);
                let rhs = ty.truncate(frame.eval(rhs)?);
                u64::from(compare(*pred, *ty, lhs, rhs))
            }
            InstKind::Gep { base, offset } => frame.eval(base)?.wrapping_add(frame.eval(offset)?),
            InstKind::Call { callee, args, .. } => {
                let args = frame.eval_all(args)?;
                match self.call_at_depth(callee, args, depth + 1)? {
                    Outcome::Return(value) => value.unwrap_or(0),
                    Outcome::Unwind(payload) => return Ok(ControlFlow::Break(payload)),
                }
            }
            InstKind::Phi { .. } | InstKind::LandingPad => {
                return Err(ExecError::StrayLandingPad { func: frame.name() });
            }
        };
        frame.define(instr.result, instr.kind.result_type(), value);
        Ok(ControlFlow::Continue(()))
    }

    fn tick(&mut self) -> Result<(), ExecError> {
        self.steps += 1;
        if self.steps > self.step_budget {
            return Err(ExecError::StepBudgetExhausted(self.step_budget));
        }
        Ok(())
    }

    fn global_slot(&self, addr: u64) -> Option<usize> {
        let rel = addr.checked_sub(GLOBAL_BASE)?;
        if rel % GLOBAL_STRIDE != 0 {
            return None;
        }
        let index = usize::try_from(rel / GLOBAL_STRIDE).ok()?;
        (index < self.globals.len()).then_some(index)
    }

    fn map_range(&self, addr: u64, ty: Type) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr.checked_sub(MAP_BASE)?).ok()?;
        let end = start.checked_add(width(ty))?;
        (end <= self.map.len()).then_some(start..end)
    }

    fn load(&self, ty: Type, addr: u64) -> Result<u64, ExecError> {
        if let Some(slot) = self.global_slot(addr) {
            return Ok(ty.truncate(self.globals[slot]));
        }
        let range = self
            .map_range(addr, ty)
            .ok_or(ExecError::BadAddress { addr, ty })?;
        let bytes = &self.map.as_slice()[range];
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    fn store(&mut self, ty: Type, addr: u64, value: u64) -> Result<(), ExecError> {
        let value = ty.truncate(value);
        if let Some(slot) = self.global_slot(addr) {
            self.globals[slot] = value;
            return Ok(());
        }
        let range = self
            .map_range(addr, ty)
            .ok_or(ExecError::BadAddress { addr, ty })?;
        let bytes = value.to_le_bytes();
        let len = range.len();
        self.map.as_mut_slice()[range].copy_from_slice(&bytes[..len]);
        Ok(())
    }
}

/// Address of a global's slot.
fn global_addr(id: GlobalId) -> u64 {
    GLOBAL_BASE + u64::from(id.0) * GLOBAL_STRIDE
}

/// Bytes touched by a `ty` access.
const fn width(ty: Type) -> usize {
    match ty {
        Type::I1 | Type::I8 => 1,
        Type::I16 => 2,
        Type::I32 => 4,
        Type::I64 | Type::Ptr => 8,
    }
}

fn binary(op: BinaryOp, ty: Type, lhs: u64, rhs: u64) -> u64 {
    let shift = u32::try_from(rhs).ok().filter(|s| *s < ty.bits());
    let raw = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::And => lhs & rhs,
        BinaryOp::Or => lhs | rhs,
        BinaryOp::Xor => lhs ^ rhs,
        // Oversized shifts yield zero.
        BinaryOp::Shl => shift.map_or(0, |s| lhs << s),
        BinaryOp::Lshr => shift.map_or(0, |s| lhs >> s),
    };
    ty.truncate(raw)
}

#[allow(clippy::cast_possible_wrap)]
const fn sign_extend(ty: Type, value: u64) -> i64 {
    let unused = 64 - ty.bits();
    ((value << unused) as i64) >> unused
}

const fn compare(pred: IcmpPred, ty: Type, lhs: u64, rhs: u64) -> bool {
    match pred {
        IcmpPred::Eq => lhs == rhs,
        IcmpPred::Ne => lhs != rhs,
        IcmpPred::Ult => lhs < rhs,
        IcmpPred::Ule => lhs <= rhs,
        IcmpPred::Ugt => lhs > rhs,
        IcmpPred::Uge => lhs >= rhs,
        IcmpPred::Slt => sign_extend(ty, lhs) < sign_extend(ty, rhs),
        IcmpPred::Sgt => sign_extend(ty, lhs) > sign_extend(ty, rhs),
    }
}
