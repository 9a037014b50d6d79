//! Alias resolution shared by the type table and the def builder.

use crate::error::{ReconstructError, Result};

/// Resolve every alias in `aliases` through `lookup`, in order.
pub(super) fn resolve_all<T>(
    aliases: &[String],
    lookup: impl Fn(&str) -> Result<T>,
) -> Result<Vec<T>> {
    aliases.iter().map(|alias| lookup(alias)).collect()
}

/// Check a fixed operand count before anything is resolved.
pub(super) fn check_arity(
    alias: &str,
    kind: &'static str,
    expected: usize,
    found: usize,
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ReconstructError::ArityMismatch {
            alias: alias.to_string(),
            kind,
            expected,
            found,
        })
    }
}

/// Resolve exactly `N` aliases, for destructuring fixed-arity operands.
pub(super) fn resolve_fixed<T, const N: usize>(
    alias: &str,
    kind: &'static str,
    aliases: &[String],
    lookup: impl Fn(&str) -> Result<T>,
) -> Result<[T; N]> {
    check_arity(alias, kind, N, aliases.len())?;
    resolve_all(aliases, lookup)?
        .try_into()
        .map_err(|resolved: Vec<T>| ReconstructError::ArityMismatch {
            alias: alias.to_string(),
            kind,
            expected: N,
            found: resolved.len(),
        })
}
