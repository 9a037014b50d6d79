//! Textual dump of the reconstructed graph.
//!
//! One line per node, types first:
//!
//! ```text
//! t0 = mem
//! t1 = prim qs32 x1
//! t2 = fn(t0, t1)
//! d0 = const t1 42
//! d1 = continuation t2 (d2, d3) -> d4(d2) external "main"
//! d2 = param d1.0
//! ```

use crate::ir::*;
use std::fmt::{self, Display, Formatter, Write};

/// Render every node of `world`.
pub fn print_world(world: &World) -> String {
    WorldDump(world).to_string()
}

struct WorldDump<'a>(&'a World);

impl Display for WorldDump<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (id, ty) in self.0.types() {
            write!(f, "{} = ", id)?;
            write_type(f, ty)?;
            f.write_char('\n')?;
        }
        for (id, def) in self.0.defs() {
            write!(f, "{} = ", id)?;
            write_def(f, def)?;
            f.write_char('\n')?;
        }
        Ok(())
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_nominal(f: &mut Formatter<'_>, keyword: &str, nominal: &NominalType) -> fmt::Result {
    write!(f, "{} {} {{", keyword, nominal.name)?;
    for (i, (field, name)) in nominal.fields.iter().zip(&nominal.field_names).enumerate() {
        f.write_str(if i > 0 { ", " } else { " " })?;
        match name {
            Some(name) => write!(f, "{}: ", name)?,
            None => write!(f, "{}: ", i)?,
        }
        match field {
            Some(ty) => write!(f, "{}", ty)?,
            None => f.write_char('?')?,
        }
    }
    f.write_str(" }")
}

fn write_type(f: &mut Formatter<'_>, ty: &Type) -> fmt::Result {
    match ty {
        Type::DefiniteArray { elem, len } => write!(f, "[{}; {}]", elem, len),
        Type::IndefiniteArray { elem } => write!(f, "[{}]", elem),
        Type::Bottom => f.write_str("bottom"),
        Type::Fn { params } => {
            f.write_str("fn(")?;
            write_list(f, params)?;
            f.write_char(')')
        }
        Type::Closure { params } => {
            f.write_str("closure(")?;
            write_list(f, params)?;
            f.write_char(')')
        }
        Type::Frame => f.write_str("frame"),
        Type::Mem => f.write_str("mem"),
        Type::Struct(nominal) => write_nominal(f, "struct", nominal),
        Type::Variant(nominal) => write_nominal(f, "variant", nominal),
        Type::Tuple { elems } => {
            f.write_char('(')?;
            write_list(f, elems)?;
            f.write_char(')')
        }
        Type::Prim { tag, lanes } => write!(f, "prim {} x{}", tag, lanes),
        Type::Ptr {
            pointee,
            lanes,
            addr_space,
        } => write!(f, "ptr {} x{} {}", pointee, lanes, addr_space),
    }
}

fn write_linkage(f: &mut Formatter<'_>, linkage: Linkage, name: Option<&str>) -> fmt::Result {
    match (linkage, name) {
        (Linkage::External, Some(name)) => write!(f, " external {:?}", name),
        (Linkage::Internal, Some(name)) => write!(f, " internal {:?}", name),
        (_, Some(name)) => write!(f, " {:?}", name),
        (_, None) => Ok(()),
    }
}

fn write_def(f: &mut Formatter<'_>, def: &Def) -> fmt::Result {
    match def {
        Def::ArithOp { op, lhs, rhs } => write!(f, "arithop {} {}, {}", op, lhs, rhs),
        Def::MathOp { op, args } => {
            write!(f, "mathop {} ", op)?;
            write_list(f, args)
        }
        Def::Cmp { op, lhs, rhs } => write!(f, "cmp {} {}, {}", op, lhs, rhs),
        Def::Literal { ty, value } => write!(f, "const {} {}", ty, value),
        Def::Top { ty } => write!(f, "top {}", ty),
        Def::Bottom { ty } => write!(f, "bottom {}", ty),
        Def::Cast { target, source } => write!(f, "cast {} {}", target, source),
        Def::Bitcast { target, source } => write!(f, "bitcast {} {}", target, source),
        Def::Slot { target, frame } => write!(f, "slot {} {}", target, frame),
        Def::DefiniteArray { elem, elems } => {
            write!(f, "def_array {} [", elem)?;
            write_list(f, elems)?;
            f.write_char(']')
        }
        Def::IndefiniteArray { elem, dim } => write!(f, "indef_array {} {}", elem, dim),
        Def::Global(global) => {
            f.write_str(if global.mutable { "global mut" } else { "global" })?;
            match global.init {
                GlobalInit::Value(init) => write!(f, " {}", init)?,
                GlobalInit::Pending => f.write_str(" pending")?,
            }
            write_linkage(f, global.linkage, global.name.as_deref())
        }
        Def::Closure { ty, func, env } => write!(f, "closure {} {}, {}", ty, func, env),
        Def::Struct { ty, fields } => {
            write!(f, "struct {} ", ty)?;
            write_list(f, fields)
        }
        Def::Alloc { target, mem, extra } => write!(f, "alloc {} {}, {}", target, mem, extra),
        Def::SizeOf { target } => write!(f, "sizeof {}", target),
        Def::AlignOf { target } => write!(f, "alignof {}", target),
        Def::Variant { ty, value, index } => write!(f, "variant {} {} #{}", ty, value, index),
        Def::VariantExtract { value, index } => write!(f, "variant_extract {} #{}", value, index),
        Def::Assembly(asm) => {
            write!(f, "assembly {} {:?} ", asm.ty, asm.template)?;
            write_list(f, &asm.inputs)?;
            if asm.flags != AsmFlag::NoFlag {
                write!(f, " {}", asm.flags)?;
            }
            Ok(())
        }
        Def::Param { cont, index } => write!(f, "param {}.{}", cont, index),
        Def::Continuation(cont) => write_continuation(f, cont),
        other => {
            write!(f, "{} ", other.kind_name())?;
            write_list(f, &other.operands())
        }
    }
}

fn write_continuation(f: &mut Formatter<'_>, cont: &Continuation) -> fmt::Result {
    write!(f, "continuation {} (", cont.ty)?;
    write_list(f, &cont.params)?;
    f.write_char(')')?;
    if let Some(filter) = cont.filter {
        write!(f, " @{}", filter)?;
    }
    if let Some(app) = &cont.body {
        write!(f, " -> {}(", app.callee)?;
        write_list(f, &app.args)?;
        f.write_char(')')?;
    }
    write_linkage(f, cont.linkage, cont.name.as_deref())?;
    if cont.cc == CallingConv::Device {
        f.write_str(" device")?;
    }
    match &cont.intrinsic {
        Intrinsic::None => Ok(()),
        Intrinsic::Branch => f.write_str(" intrinsic branch"),
        Intrinsic::Match {
            variant,
            num_patterns,
        } => write!(f, " intrinsic match {} x{}", variant, num_patterns),
        Intrinsic::Named(name) => write!(f, " intrinsic {:?}", name),
    }
}
