//! Run context shared by every document of one reconstruction run.
//!
//! The session owns the arena, the external registry, the merged target
//! description and the non-fatal diagnostics. Per-document alias tables borrow
//! it while they build and are dropped afterwards; the nodes stay.

use super::registry::{ExternalRegistry, InternPolicy};
use super::super::world::World;
use std::fmt;

/// Target description merged across documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDesc {
    pub triple: Option<String>,
    pub cpu: Option<String>,
    pub attrs: Option<String>,
}

/// Which target field a mismatch concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetField {
    Triple,
    Cpu,
    Attrs,
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetField::Triple => write!(f, "host triple"),
            TargetField::Cpu => write!(f, "host cpu"),
            TargetField::Attrs => write!(f, "host attributes"),
        }
    }
}

/// Non-fatal finding recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Two real initializers for one external global; the later one won.
    LinkageConflict { name: String },
    /// A document's target field differs from the one seen before; the later one won.
    TargetMismatch {
        field: TargetField,
        previous: String,
        current: String,
        document: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LinkageConflict { name } => {
                write!(f, "multiple definitions of global variable `{}`", name)
            }
            Diagnostic::TargetMismatch {
                field,
                previous,
                current,
                document,
            } => write!(
                f,
                "previously supplied {} `{}` differs from `{}` in {}",
                field, previous, current, document
            ),
        }
    }
}

/// Run context: arena, registry, target description and diagnostics.
#[derive(Debug, Default)]
pub struct Session {
    world: World,
    externals: ExternalRegistry,
    target: TargetDesc,
    diagnostics: Vec<Diagnostic>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run with a target description supplied by the caller.
    pub fn with_target(target: TargetDesc) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn externals(&self) -> &ExternalRegistry {
        &self.externals
    }

    pub(crate) fn world_and_externals(&mut self) -> (&mut World, &mut ExternalRegistry) {
        (&mut self.world, &mut self.externals)
    }

    pub fn target(&self) -> &TargetDesc {
        &self.target
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Merge one document's target fields. A differing value warns and wins.
    pub fn merge_target(
        &mut self,
        document: &str,
        triple: Option<&str>,
        cpu: Option<&str>,
        attrs: Option<&str>,
    ) {
        let updates = [
            (TargetField::Triple, triple),
            (TargetField::Cpu, cpu),
            (TargetField::Attrs, attrs),
        ];
        for (field, value) in updates {
            let Some(value) = value else { continue };
            let slot = match field {
                TargetField::Triple => &mut self.target.triple,
                TargetField::Cpu => &mut self.target.cpu,
                TargetField::Attrs => &mut self.target.attrs,
            };
            let previous = slot.replace(value.to_string());
            if let Some(previous) = previous {
                if previous != value {
                    self.warn(Diagnostic::TargetMismatch {
                        field,
                        previous,
                        current: value.to_string(),
                        document: document.to_string(),
                    });
                }
            }
        }
    }

    /// Apply the intern policy once every document has been reconstructed.
    pub fn apply_intern_policy(&mut self, policy: &InternPolicy) -> Vec<String> {
        let stripped = policy.apply(&mut self.world, &self.externals);
        if !stripped.is_empty() {
            tracing::debug!(count = stripped.len(), "stripped internal linkage");
        }
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_target_first_value_is_silent() {
        let mut session = Session::new();
        session.merge_target("a.json", Some("x86_64-linux-gnu"), None, None);
        assert_eq!(session.target().triple.as_deref(), Some("x86_64-linux-gnu"));
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_merge_target_same_value_is_silent() {
        let mut session = Session::new();
        session.merge_target("a.json", None, Some("znver3"), None);
        session.merge_target("b.json", None, Some("znver3"), None);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_merge_target_mismatch_warns_and_keeps_latest() {
        let mut session = Session::new();
        session.merge_target("a.json", None, Some("znver3"), Some("+avx2"));
        session.merge_target("b.json", None, Some("skylake"), None);

        assert_eq!(session.target().cpu.as_deref(), Some("skylake"));
        assert_eq!(session.target().attrs.as_deref(), Some("+avx2"));
        assert_eq!(
            session.diagnostics(),
            &[Diagnostic::TargetMismatch {
                field: TargetField::Cpu,
                previous: "znver3".to_string(),
                current: "skylake".to_string(),
                document: "b.json".to_string(),
            }]
        );
    }

    #[test]
    fn test_caller_target_counts_as_previous() {
        let mut session = Session::with_target(TargetDesc {
            triple: Some("nvptx64-nvidia-cuda".to_string()),
            ..TargetDesc::default()
        });
        session.merge_target("a.json", Some("x86_64-linux-gnu"), None, None);
        assert_eq!(session.diagnostics().len(), 1);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::LinkageConflict {
            name: "counter".to_string(),
        };
        assert_eq!(
            d.to_string(),
            "multiple definitions of global variable `counter`"
        );
    }
}
