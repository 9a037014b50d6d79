//! Per-document def alias table and the builder that fills it.
//!
//! `IrBuilder` dispatches each def descriptor to one constructor per kind.
//! Value kinds resolve their operands, check the operator's arity and push a
//! node. Continuations and globals are the two kinds with identity beyond a
//! single descriptor: a continuation may be predeclared and completed later
//! (or shared across documents through internal linkage), and an externally
//! named global is merged through the session's registry.

use super::resolve::{check_arity, resolve_all, resolve_fixed};
use super::session::{Diagnostic, Session};
use super::type_table::TypeTable;
use super::super::literal;
use super::super::types::*;
use super::super::world::World;
use crate::error::{AliasTable, ReconstructError, Result};
use crate::parser::{ContinuationDesc, DefDesc, DefDescKind};
use std::collections::BTreeMap;

/// Alias → def handle for one document. Append-only while the document is
/// being built.
#[derive(Debug, Clone, Default)]
pub struct DefTable {
    known_defs: BTreeMap<String, DefId>,
}

impl DefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a def alias.
    pub fn lookup(&self, alias: &str) -> Result<DefId> {
        self.known_defs
            .get(alias)
            .copied()
            .ok_or_else(|| ReconstructError::UnresolvedAlias {
                table: AliasTable::Defs,
                alias: alias.to_string(),
            })
    }

    pub fn get(&self, alias: &str) -> Option<DefId> {
        self.known_defs.get(alias).copied()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.known_defs.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.known_defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_defs.is_empty()
    }

    /// Every registered def with its alias, ordered by alias.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DefId)> {
        self.known_defs.iter().map(|(alias, id)| (alias.as_str(), *id))
    }

    fn insert(&mut self, alias: &str, id: DefId) {
        self.known_defs.insert(alias.to_string(), id);
    }
}

/// Builds the defs of one document into the session's arena.
pub struct IrBuilder<'a> {
    session: &'a mut Session,
    types: &'a TypeTable,
    defs: DefTable,
}

impl<'a> IrBuilder<'a> {
    pub fn new(session: &'a mut Session, types: &'a TypeTable) -> Self {
        Self {
            session,
            types,
            defs: DefTable::new(),
        }
    }

    pub fn world(&self) -> &World {
        self.session.world()
    }

    pub fn lookup(&self, alias: &str) -> Result<DefId> {
        self.defs.lookup(alias)
    }

    /// Every def registered so far, ordered by alias.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DefId)> {
        self.defs.iter()
    }

    /// Hand back the finished alias table.
    pub fn finish(self) -> DefTable {
        self.defs
    }

    /// Reconstruct one def descriptor and register it under its alias.
    ///
    /// On error nothing is registered under the alias. Nodes allocated in the
    /// arena before the error stay behind unreferenced.
    pub fn define(&mut self, desc: &DefDesc) -> Result<DefId> {
        let alias = desc.name.as_str();
        if let DefDescKind::Continuation(cont) = &desc.kind {
            return self.define_continuation(alias, cont);
        }

        if self.defs.contains(alias) {
            return Err(ReconstructError::malformed(
                alias,
                "def alias is already defined",
            ));
        }
        let id = self.build_value(alias, &desc.kind)?;
        self.defs.insert(alias, id);
        Ok(id)
    }

    // ─── Operand resolution ────────────────────────────────────────────────

    fn def(&self, alias: &str) -> Result<DefId> {
        self.defs.lookup(alias)
    }

    fn ty(&self, alias: &str) -> Result<TypeId> {
        self.types.lookup(alias)
    }

    fn operands<const N: usize>(
        &self,
        alias: &str,
        kind: &'static str,
        args: &[String],
    ) -> Result<[DefId; N]> {
        resolve_fixed(alias, kind, args, |a| self.defs.lookup(a))
    }

    fn operand_list(&self, args: &[String]) -> Result<Vec<DefId>> {
        resolve_all(args, |a| self.defs.lookup(a))
    }

    fn push(&mut self, def: Def) -> DefId {
        self.session.world_mut().push_def(def)
    }

    // ─── Value kinds ───────────────────────────────────────────────────────

    fn build_value(&mut self, alias: &str, kind: &DefDescKind) -> Result<DefId> {
        let def = match kind {
            DefDescKind::ArithOp { op, args } => {
                let [lhs, rhs] = self.operands(alias, "arithop", args)?;
                Def::ArithOp { op: *op, lhs, rhs }
            }
            DefDescKind::MathOp { op, args } => {
                check_arity(alias, "mathop", op.arity(), args.len())?;
                Def::MathOp {
                    op: *op,
                    args: self.operand_list(args)?,
                }
            }
            DefDescKind::Cmp { op, args } => {
                let [lhs, rhs] = self.operands(alias, "cmp", args)?;
                Def::Cmp { op: *op, lhs, rhs }
            }
            DefDescKind::Constant { const_type, value } => {
                let ty = self.ty(const_type)?;
                let tag = match *self.world().ty(ty) {
                    Type::Prim { tag, lanes: 1 } => tag,
                    Type::Prim { lanes, .. } => {
                        return Err(ReconstructError::malformed(
                            alias,
                            format!("constant of vector type `{}` with {} lanes", const_type, lanes),
                        ))
                    }
                    _ => {
                        return Err(ReconstructError::KindMismatch {
                            alias: const_type.clone(),
                            expected: "primitive type",
                        })
                    }
                };
                let value = literal::decode(tag, value)
                    .map_err(|reason| ReconstructError::malformed(alias, reason))?;
                Def::Literal { ty, value }
            }
            DefDescKind::Top { const_type } => Def::Top {
                ty: self.scalar_type(alias, const_type)?,
            },
            DefDescKind::Bottom { const_type } => Def::Bottom {
                ty: self.scalar_type(alias, const_type)?,
            },
            DefDescKind::Lea { args } => {
                let [ptr, index] = self.operands(alias, "lea", args)?;
                Def::Lea { ptr, index }
            }
            DefDescKind::Load { args } => {
                let [mem, ptr] = self.operands(alias, "load", args)?;
                Def::Load { mem, ptr }
            }
            DefDescKind::Extract { args } => {
                let [agg, index] = self.operands(alias, "extract", args)?;
                Def::Extract { agg, index }
            }
            DefDescKind::Insert { args } => {
                let [agg, index, value] = self.operands(alias, "insert", args)?;
                Def::Insert { agg, index, value }
            }
            DefDescKind::Cast {
                target_type,
                source,
            } => Def::Cast {
                target: self.ty(target_type)?,
                source: self.def(source)?,
            },
            DefDescKind::Bitcast {
                target_type,
                source,
            } => Def::Bitcast {
                target: self.ty(target_type)?,
                source: self.def(source)?,
            },
            DefDescKind::Run { target } => Def::Run {
                def: self.def(target)?,
            },
            DefDescKind::Hlt { target } => Def::Hlt {
                def: self.def(target)?,
            },
            DefDescKind::Store { args } => {
                let [mem, ptr, value] = self.operands(alias, "store", args)?;
                Def::Store { mem, ptr, value }
            }
            DefDescKind::Enter { mem } => Def::Enter {
                mem: self.def(mem)?,
            },
            DefDescKind::Slot { target_type, frame } => Def::Slot {
                target: self.ty(target_type)?,
                frame: self.def(frame)?,
            },
            DefDescKind::DefiniteArray { elem_type, args } => Def::DefiniteArray {
                elem: self.ty(elem_type)?,
                elems: self.operand_list(args)?,
            },
            DefDescKind::IndefiniteArray { elem_type, dim } => Def::IndefiniteArray {
                elem: self.ty(elem_type)?,
                dim: self.def(dim)?,
            },
            DefDescKind::Global {
                mutable,
                init,
                external,
            } => return self.build_global(*mutable, init.as_deref(), external.as_deref()),
            DefDescKind::Closure { closure_type, args } => {
                let ty = self.ty(closure_type)?;
                if !matches!(self.world().ty(ty), Type::Closure { .. }) {
                    return Err(ReconstructError::KindMismatch {
                        alias: closure_type.clone(),
                        expected: "closure type",
                    });
                }
                let [func, env] = self.operands(alias, "closure", args)?;
                Def::Closure { ty, func, env }
            }
            DefDescKind::Struct { struct_type, args } => {
                let ty = self.ty(struct_type)?;
                let num_fields = match self.world().ty(ty) {
                    Type::Struct(nominal) => nominal.fields.len(),
                    _ => {
                        return Err(ReconstructError::KindMismatch {
                            alias: struct_type.clone(),
                            expected: "struct type",
                        })
                    }
                };
                check_arity(alias, "struct", num_fields, args.len())?;
                Def::Struct {
                    ty,
                    fields: self.operand_list(args)?,
                }
            }
            DefDescKind::Tuple { args } => Def::Tuple {
                elems: self.operand_list(args)?,
            },
            DefDescKind::Vector { args } => Def::Vector {
                elems: self.operand_list(args)?,
            },
            DefDescKind::Alloc { target_type, args } => {
                let target = self.ty(target_type)?;
                let [mem, extra] = self.operands(alias, "alloc", args)?;
                Def::Alloc { target, mem, extra }
            }
            DefDescKind::Release { args } => {
                let [mem, alloc] = self.operands(alias, "release", args)?;
                Def::Release { mem, alloc }
            }
            DefDescKind::Known { def } => Def::Known {
                def: self.def(def)?,
            },
            DefDescKind::Sizeof { target_type } => Def::SizeOf {
                target: self.ty(target_type)?,
            },
            DefDescKind::Alignof { target_type } => Def::AlignOf {
                target: self.ty(target_type)?,
            },
            DefDescKind::Select { args } => {
                let [cond, if_true, if_false] = self.operands(alias, "select", args)?;
                Def::Select {
                    cond,
                    if_true,
                    if_false,
                }
            }
            DefDescKind::Filter { args } => Def::Filter {
                conds: self.operand_list(args)?,
            },
            DefDescKind::Variant {
                variant_type,
                value,
                index,
            } => {
                let ty = self.ty(variant_type)?;
                let num_cases = match self.world().ty(ty) {
                    Type::Variant(nominal) => nominal.fields.len(),
                    _ => {
                        return Err(ReconstructError::KindMismatch {
                            alias: variant_type.clone(),
                            expected: "variant type",
                        })
                    }
                };
                if *index >= num_cases {
                    return Err(ReconstructError::malformed(
                        alias,
                        format!("case {} out of range for `{}` with {} cases", index, variant_type, num_cases),
                    ));
                }
                Def::Variant {
                    ty,
                    value: self.def(value)?,
                    index: *index,
                }
            }
            DefDescKind::VariantExtract { value, index } => Def::VariantExtract {
                value: self.def(value)?,
                index: *index,
            },
            DefDescKind::VariantIndex { value } => Def::VariantIndex {
                value: self.def(value)?,
            },
            DefDescKind::Assembly(asm) => Def::Assembly(Box::new(Assembly {
                ty: self.ty(&asm.asm_type)?,
                inputs: self.operand_list(&asm.inputs)?,
                template: asm.asm_template.clone(),
                output_constraints: asm.output_constraints.clone(),
                input_constraints: asm.input_constraints.clone(),
                clobbers: asm.clobbers.clone(),
                flags: asm.flags,
            })),
            DefDescKind::Continuation(_) => {
                unreachable!("continuations are handled by define_continuation")
            }
        };
        Ok(self.push(def))
    }

    /// Type of a top/bottom value: vector-shaped types must have one lane.
    fn scalar_type(&self, alias: &str, type_alias: &str) -> Result<TypeId> {
        let ty = self.ty(type_alias)?;
        match self.world().ty(ty).lanes() {
            Some(lanes) if lanes != 1 => Err(ReconstructError::malformed(
                alias,
                format!("`{}` has {} lanes, expected a scalar", type_alias, lanes),
            )),
            _ => Ok(ty),
        }
    }

    // ─── Globals ───────────────────────────────────────────────────────────

    /// Build a global, merging externally named ones through the registry.
    ///
    /// The first real initializer replaces a placeholder. A second real
    /// initializer wins as well but is reported as a linkage conflict.
    fn build_global(
        &mut self,
        mutable: bool,
        init: Option<&str>,
        external: Option<&str>,
    ) -> Result<DefId> {
        let init = match init {
            Some(init) => GlobalInit::Value(self.def(init)?),
            None => GlobalInit::Pending,
        };
        let Some(name) = external else {
            return Ok(self.session.world_mut().global(init, mutable));
        };

        let (world, externals) = self.session.world_and_externals();
        let Some(existing) = externals.lookup(name) else {
            let id = world.global(init, mutable);
            if let Some(global) = world.global_mut(id) {
                global.name = Some(name.to_string());
                global.linkage = Linkage::External;
            }
            externals.insert(name, id);
            return Ok(id);
        };

        let previous = match world.def(existing).as_global() {
            Some(global) => global.init,
            None => {
                return Err(ReconstructError::KindMismatch {
                    alias: name.to_string(),
                    expected: "global",
                })
            }
        };
        if is_placeholder(world, init) {
            return Ok(existing);
        }
        let conflict = !is_placeholder(world, previous);
        if let Some(global) = world.global_mut(existing) {
            global.init = init;
            global.mutable = mutable;
        }
        if conflict {
            self.session.warn(Diagnostic::LinkageConflict {
                name: name.to_string(),
            });
        } else {
            tracing::debug!(global = name, "placeholder initializer filled");
        }
        Ok(existing)
    }

    // ─── Continuations ─────────────────────────────────────────────────────

    /// Reconstruct a continuation descriptor.
    ///
    /// Identity comes first: an alias already bound in this document, then a
    /// registry entry for the requested internal name, then a fresh node for
    /// an intrinsic or plain signature. The descriptor's optional fields then
    /// complete the node in place. Registrations are committed only after
    /// everything resolved.
    fn define_continuation(&mut self, alias: &str, desc: &ContinuationDesc) -> Result<DefId> {
        let mut publish_internal = None;
        let cont = match self.defs.get(alias) {
            Some(existing) => {
                if self.world().continuation(existing).is_none() {
                    return Err(ReconstructError::KindMismatch {
                        alias: alias.to_string(),
                        expected: "continuation",
                    });
                }
                existing
            }
            None => match desc.internal.as_deref() {
                Some(name) => match self.session.externals().lookup(name) {
                    Some(shared) => {
                        if self.world().continuation(shared).is_none() {
                            return Err(ReconstructError::KindMismatch {
                                alias: name.to_string(),
                                expected: "continuation",
                            });
                        }
                        shared
                    }
                    None => {
                        let cont = self.allocate_continuation(alias, desc)?;
                        publish_internal = Some(name);
                        cont
                    }
                },
                None => self.allocate_continuation(alias, desc)?,
            },
        };

        let params = self
            .world()
            .continuation(cont)
            .map(|c| c.params.clone())
            .unwrap_or_default();

        let mut pending = vec![(alias.to_string(), cont)];
        if let Some(names) = &desc.arg_names {
            if names.len() > params.len() {
                return Err(ReconstructError::ArityMismatch {
                    alias: alias.to_string(),
                    kind: "continuation",
                    expected: params.len(),
                    found: names.len(),
                });
            }
            pending.extend(names.iter().cloned().zip(params.iter().copied()));
        }

        let filter = match &desc.filter {
            Some(filter_alias) => {
                let filter = self.lookup_pending(&pending, filter_alias)?;
                if !matches!(self.world().def(filter), Def::Filter { .. }) {
                    return Err(ReconstructError::KindMismatch {
                        alias: filter_alias.clone(),
                        expected: "filter",
                    });
                }
                Some(filter)
            }
            None => None,
        };

        let body = match &desc.app {
            Some(app) => Some(App {
                callee: self.lookup_pending(&pending, &app.target)?,
                args: resolve_all(&app.args, |a| self.lookup_pending(&pending, a))?,
            }),
            None => None,
        };

        self.check_bindings(alias, &pending)?;

        // Commit.
        let (world, externals) = self.session.world_and_externals();
        if let Some(c) = world.continuation_mut(cont) {
            if let Some(name) = publish_internal {
                c.name = Some(name.to_string());
                c.linkage = Linkage::Internal;
            }
            if filter.is_some() {
                c.filter = filter;
            }
            if body.is_some() {
                c.body = body;
            }
            if let Some(name) = &desc.external {
                c.name = Some(name.clone());
                c.linkage = Linkage::External;
            }
            if let Some(name) = &desc.device {
                c.name = Some(name.clone());
                c.cc = CallingConv::Device;
            }
            if let Some(name) = desc.intrinsic.as_deref() {
                if !is_structural_intrinsic(name) {
                    c.intrinsic = Intrinsic::Named(name.to_string());
                }
            }
        }
        if let Some(name) = publish_internal {
            externals.insert(name, cont);
        }
        for (name, id) in pending {
            self.defs.insert(&name, id);
        }
        Ok(cont)
    }

    /// Allocate the node for a continuation seen for the first time.
    fn allocate_continuation(&mut self, alias: &str, desc: &ContinuationDesc) -> Result<DefId> {
        match desc.intrinsic.as_deref() {
            Some("branch") => Ok(self.session.world_mut().branch()),
            Some("match") => {
                let variant_alias = desc.variant_type.as_deref().ok_or_else(|| {
                    ReconstructError::malformed(alias, "match intrinsic without `variant_type`")
                })?;
                let num_patterns = desc.num_patterns.ok_or_else(|| {
                    ReconstructError::malformed(alias, "match intrinsic without `num_patterns`")
                })?;
                let variant = self.ty(variant_alias)?;
                if !matches!(self.world().ty(variant), Type::Variant(_)) {
                    return Err(ReconstructError::KindMismatch {
                        alias: variant_alias.to_string(),
                        expected: "variant type",
                    });
                }
                Ok(self.session.world_mut().match_on(variant, num_patterns))
            }
            _ => {
                let fn_alias = desc.fn_type.as_deref().ok_or_else(|| {
                    ReconstructError::malformed(alias, "missing field `fn_type`")
                })?;
                let fn_ty = self.ty(fn_alias)?;
                self.session
                    .world_mut()
                    .continuation_of(fn_ty)
                    .ok_or_else(|| ReconstructError::KindMismatch {
                        alias: fn_alias.to_string(),
                        expected: "function type",
                    })
            }
        }
    }

    /// Resolve against the bindings a continuation is about to commit, then
    /// the document's table.
    fn lookup_pending(&self, pending: &[(String, DefId)], alias: &str) -> Result<DefId> {
        match pending.iter().rev().find(|(name, _)| name == alias) {
            Some((_, id)) => Ok(*id),
            None => self.defs.lookup(alias),
        }
    }

    /// A name may be bound again only to the same node.
    fn check_bindings(&self, alias: &str, pending: &[(String, DefId)]) -> Result<()> {
        for (i, (name, id)) in pending.iter().enumerate() {
            let earlier = pending[..i]
                .iter()
                .find(|(other, _)| other == name)
                .map(|(_, other)| *other);
            let bound = earlier.or_else(|| self.defs.get(name));
            if let Some(bound) = bound {
                if bound != *id {
                    return Err(ReconstructError::malformed(
                        alias,
                        format!("`{}` is already bound to {}", name, bound),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn is_structural_intrinsic(name: &str) -> bool {
    matches!(name, "branch" | "match")
}

/// A pending initializer, or one that is the bottom value, stands for "no
/// value yet".
fn is_placeholder(world: &World, init: GlobalInit) -> bool {
    match init {
        GlobalInit::Pending => true,
        GlobalInit::Value(def) => matches!(world.def(def), Def::Bottom { .. }),
    }
}
