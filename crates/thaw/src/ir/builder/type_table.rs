//! Per-document type alias table.
//!
//! Structural kinds are pure constructors over already-resolved aliases.
//! Struct and variant types may be touched twice under one alias: a bare
//! declaration fixes the handle and field count, a later descriptor with
//! `args` fills in the field types. Holders of the handle see the completed
//! type without being rewritten.

use super::resolve::{check_arity, resolve_all, resolve_fixed};
use super::super::types::*;
use super::super::world::World;
use crate::error::{AliasTable, ReconstructError, Result};
use crate::parser::{TypeDesc, TypeDescKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NominalKind {
    Struct,
    Variant,
}

impl NominalKind {
    fn wire_name(self) -> &'static str {
        match self {
            NominalKind::Struct => "struct",
            NominalKind::Variant => "variant",
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            NominalKind::Struct => "struct type",
            NominalKind::Variant => "variant type",
        }
    }

    fn matches(self, ty: &Type) -> Option<&NominalType> {
        match (self, ty) {
            (NominalKind::Struct, Type::Struct(nominal))
            | (NominalKind::Variant, Type::Variant(nominal)) => Some(nominal),
            _ => None,
        }
    }
}

/// Alias → type handle for one document.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    known_types: BTreeMap<String, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a type alias.
    pub fn lookup(&self, alias: &str) -> Result<TypeId> {
        self.known_types
            .get(alias)
            .copied()
            .ok_or_else(|| ReconstructError::UnresolvedAlias {
                table: AliasTable::Types,
                alias: alias.to_string(),
            })
    }

    pub fn get(&self, alias: &str) -> Option<TypeId> {
        self.known_types.get(alias).copied()
    }

    pub fn len(&self) -> usize {
        self.known_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_types.is_empty()
    }

    /// All aliases with their handles, ordered by alias.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.known_types.iter().map(|(alias, id)| (alias.as_str(), *id))
    }

    /// Reconstruct one type descriptor and register it under its alias.
    ///
    /// On error nothing is registered under the alias.
    pub fn define(&mut self, world: &mut World, desc: &TypeDesc) -> Result<TypeId> {
        let alias = desc.name.as_str();
        match &desc.kind {
            TypeDescKind::Struct {
                struct_name,
                arg_names,
                args,
            } => self.define_nominal(
                world,
                alias,
                NominalKind::Struct,
                struct_name,
                arg_names,
                args.as_deref(),
            ),
            TypeDescKind::Variant {
                variant_name,
                arg_names,
                args,
            } => self.define_nominal(
                world,
                alias,
                NominalKind::Variant,
                variant_name,
                arg_names,
                args.as_deref(),
            ),
            kind => {
                if self.known_types.contains_key(alias) {
                    return Err(ReconstructError::malformed(
                        alias,
                        "type alias is already defined",
                    ));
                }
                let ty = self.build_structural(alias, kind)?;
                let id = world.intern_type(ty);
                self.known_types.insert(alias.to_string(), id);
                Ok(id)
            }
        }
    }

    fn build_structural(&self, alias: &str, kind: &TypeDescKind) -> Result<Type> {
        let lookup = |a: &str| self.lookup(a);
        let ty = match kind {
            TypeDescKind::DefiniteArray { args, length } => {
                let [elem] = resolve_fixed(alias, "def_array", args, lookup)?;
                Type::DefiniteArray { elem, len: *length }
            }
            TypeDescKind::IndefiniteArray { args } => {
                let [elem] = resolve_fixed(alias, "indef_array", args, lookup)?;
                Type::IndefiniteArray { elem }
            }
            TypeDescKind::Bottom => Type::Bottom,
            TypeDescKind::Frame => Type::Frame,
            TypeDescKind::Mem => Type::Mem,
            TypeDescKind::Function { args } => Type::Fn {
                params: resolve_all(args, lookup)?,
            },
            TypeDescKind::Closure { args } => Type::Closure {
                params: resolve_all(args, lookup)?,
            },
            TypeDescKind::Tuple { args } => Type::Tuple {
                elems: resolve_all(args, lookup)?,
            },
            TypeDescKind::Prim { tag, length } => Type::Prim {
                tag: *tag,
                lanes: lane_count(alias, *length)?,
            },
            TypeDescKind::Ptr {
                args,
                length,
                addrspace,
            } => {
                let [pointee] = resolve_fixed(alias, "ptr", args, lookup)?;
                Type::Ptr {
                    pointee,
                    lanes: lane_count(alias, *length)?,
                    addr_space: addrspace.unwrap_or_default(),
                }
            }
            TypeDescKind::Struct { .. } | TypeDescKind::Variant { .. } => {
                unreachable!("nominal types are handled by define_nominal")
            }
        };
        Ok(ty)
    }

    /// Declare or define a struct/variant type.
    ///
    /// A field may name the type's own alias even on first mention; it
    /// resolves to the handle being allocated.
    fn define_nominal(
        &mut self,
        world: &mut World,
        alias: &str,
        kind: NominalKind,
        name: &str,
        arg_names: &[String],
        args: Option<&[String]>,
    ) -> Result<TypeId> {
        if let Some(args) = args {
            check_arity(alias, kind.wire_name(), arg_names.len(), args.len())?;
        }

        let existing = self.known_types.get(alias).copied();
        if let Some(id) = existing {
            let nominal = kind.matches(world.ty(id)).ok_or_else(|| {
                ReconstructError::KindMismatch {
                    alias: alias.to_string(),
                    expected: kind.type_name(),
                }
            })?;
            check_arity(alias, kind.wire_name(), nominal.fields.len(), arg_names.len())?;
            if args.is_some() && nominal.is_complete() {
                return Err(ReconstructError::malformed(
                    alias,
                    format!("{} `{}` is already defined", kind.wire_name(), nominal.name),
                ));
            }
        }

        // Resolve every field before the arena is touched. `None` marks a
        // reference to the handle not yet allocated.
        let fields = match args {
            Some(args) => Some(resolve_all(args, |a| {
                if a == alias && existing.is_none() {
                    Ok(None)
                } else {
                    self.lookup(a).map(Some)
                }
            })?),
            None => None,
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let id = match kind {
                    NominalKind::Struct => world.struct_type(name, arg_names.len()),
                    NominalKind::Variant => world.variant_type(name, arg_names.len()),
                };
                self.known_types.insert(alias.to_string(), id);
                id
            }
        };

        if let Some(nominal) = world.nominal_mut(id) {
            for (slot, field_name) in nominal.field_names.iter_mut().zip(arg_names) {
                *slot = Some(field_name.clone());
            }
            if let Some(fields) = fields {
                for (slot, field) in nominal.fields.iter_mut().zip(fields) {
                    *slot = Some(field.unwrap_or(id));
                }
            }
        }
        Ok(id)
    }
}

fn lane_count(alias: &str, length: usize) -> Result<usize> {
    if length == 0 {
        Err(ReconstructError::malformed(
            alias,
            "lane count must be at least 1",
        ))
    } else {
        Ok(length)
    }
}
