//! Text listing of modules, loosely following LLVM assembly.

use std::fmt::{self, Display, Formatter, Write as _};

use crate::function::Function;
use crate::instr::{InstKind, Instr};
use crate::module::Module;
use crate::operand::Operand;
use crate::terminator::Terminator;

struct Op<'a>(&'a Module, &'a Operand);

impl Display for Op<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.1 {
            Operand::Const { ty, value } => write!(f, "{ty} {value}"),
            Operand::Value(id) => write!(f, "{id}"),
            Operand::Global(id) => match self.0.global(*id) {
                Some(g) => write!(f, "@{}", g.name),
                None => write!(f, "@<missing {}>", id.0),
            },
            Operand::Arg(n) => write!(f, "%arg{n}"),
        }
    }
}

fn join(m: &Module, ops: &[Operand]) -> String {
    let mut out = String::new();
    for (i, op) in ops.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", Op(m, op));
    }
    out
}

fn ret_type(ret: Option<crate::Type>) -> String {
    ret.map_or_else(|| "void".to_string(), |t| t.to_string())
}

fn write_instr(f: &mut Formatter<'_>, m: &Module, instr: &Instr) -> fmt::Result {
    f.write_str("  ")?;
    if let Some(result) = instr.result {
        write!(f, "{result} = ")?;
    }
    match &instr.kind {
        InstKind::Phi { ty, incoming } => {
            write!(f, "phi {ty}")?;
            for (i, (block, op)) in incoming.iter().enumerate() {
                let sep = if i == 0 { " " } else { ", " };
                write!(f, "{sep}[{}, {block}]", Op(m, op))?;
            }
        }
        InstKind::LandingPad => f.write_str("landingpad")?,
        InstKind::Load { ty, ptr } => write!(f, "load {ty}, {}", Op(m, ptr))?,
        InstKind::Store { ty, value, ptr } => {
            write!(f, "store {ty} {}, {}", Op(m, value), Op(m, ptr))?;
        }
        InstKind::ZExt { from, to, value } => {
            write!(f, "zext {from} {} to {to}", Op(m, value))?;
        }
        InstKind::Binary { op, ty, lhs, rhs } => {
            write!(f, "{op} {ty} {}, {}", Op(m, lhs), Op(m, rhs))?;
        }
        InstKind::Icmp { pred, ty, lhs, rhs } => {
            write!(f, "icmp {pred} {ty} {}, {}", Op(m, lhs), Op(m, rhs))?;
        }
        InstKind::Gep { base, offset } => {
            write!(f, "getelementptr i8, {}, {}", Op(m, base), Op(m, offset))?;
        }
        InstKind::Call { callee, args, ret } => {
            write!(f, "call {} @{callee}({})", ret_type(*ret), join(m, args))?;
        }
    }
    if instr.nosanitize {
        f.write_str(", !nosanitize")?;
    }
    if let Some(loc) = &instr.debug_loc {
        write!(f, "  ; {loc}")?;
    }
    writeln!(f)
}

fn write_terminator(f: &mut Formatter<'_>, m: &Module, term: &Terminator) -> fmt::Result {
    f.write_str("  ")?;
    match term {
        Terminator::Br { dest } => write!(f, "br {dest}"),
        Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        } => write!(f, "br {}, {then_dest}, {else_dest}", Op(m, cond)),
        Terminator::Ret { value: Some(v) } => write!(f, "ret {}", Op(m, v)),
        Terminator::Ret { value: None } => f.write_str("ret void"),
        Terminator::Invoke {
            callee,
            args,
            ret,
            result,
            normal,
            unwind,
        } => {
            if let Some(result) = result {
                write!(f, "{result} = ")?;
            }
            write!(
                f,
                "invoke {} @{callee}({}) to {normal} unwind {unwind}",
                ret_type(*ret),
                join(m, args)
            )
        }
        Terminator::Resume { payload } => write!(f, "resume {}", Op(m, payload)),
        Terminator::Unreachable => f.write_str("unreachable"),
    }
}

fn write_function(f: &mut Formatter<'_>, m: &Module, func: &Function) -> fmt::Result {
    let params: Vec<String> = func
        .params
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("{ty} %arg{i}"))
        .collect();
    let ret = ret_type(func.ret);
    if func.is_declaration() {
        return writeln!(f, "declare {ret} @{}({})", func.name, params.join(", "));
    }
    writeln!(f, "define {ret} @{}({}) {{", func.name, params.join(", "))?;
    for block in &func.blocks {
        if block.label.is_empty() {
            writeln!(f, "{}:", block.id)?;
        } else {
            writeln!(f, "{}:  ; {}", block.id, block.label)?;
        }
        for instr in &block.instructions {
            write_instr(f, m, instr)?;
        }
        write_terminator(f, m, &block.terminator)?;
        if let Some(loc) = &block.terminator_loc {
            write!(f, "  ; {loc}")?;
        }
        writeln!(f)?;
    }
    writeln!(f, "}}")
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module '{}'", self.name)?;
        if let Some(src) = &self.source_filename {
            writeln!(f, "source_filename = \"{src}\"")?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for g in &self.globals {
            write!(f, "@{} = {} global {}", g.name, g.linkage, g.ty)?;
            if let Some(init) = g.initializer {
                write!(f, " {init}")?;
            }
            writeln!(f)?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write_function(f, self, func)?;
        }
        Ok(())
    }
}
