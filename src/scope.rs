//! Scope descriptors
//!
//! A descriptor names one node of the spec tree by its ordered labels.
//! Three shapes exist, one per scope kind:
//!
//! | Kind | Labels |
//! |------|--------|
//! | precondition | subject, precondition |
//! | action | subject, precondition, action |
//! | assertion | subject, precondition, action, assertion |

use std::fmt;

/// The kind of scope a descriptor names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKind {
    /// `given` scope
    Precondition,
    /// `on` scope
    Action,
    /// `it` scope (leaf)
    Assertion,
}

impl ScopeKind {
    /// Keyword used for this kind in traces and DSL text
    pub fn keyword(self) -> &'static str {
        match self {
            ScopeKind::Precondition => "given",
            ScopeKind::Action => "on",
            ScopeKind::Assertion => "it",
        }
    }

    /// Number of labels a descriptor of this kind carries
    pub fn arity(self) -> usize {
        match self {
            ScopeKind::Precondition => 2,
            ScopeKind::Action => 3,
            ScopeKind::Assertion => 4,
        }
    }

    /// Nesting depth below the subject (0 for preconditions)
    pub fn depth(self) -> usize {
        self.arity() - 2
    }

    /// Look up a kind by its keyword
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "given" => Some(ScopeKind::Precondition),
            "on" => Some(ScopeKind::Action),
            "it" => Some(ScopeKind::Assertion),
            _ => None,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Precondition => "precondition",
            ScopeKind::Action => "action",
            ScopeKind::Assertion => "assertion",
        };
        f.write_str(name)
    }
}

/// Immutable label tuple identifying a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeDescriptor {
    Precondition {
        subject: String,
        precondition: String,
    },
    Action {
        subject: String,
        precondition: String,
        action: String,
    },
    Assertion {
        subject: String,
        precondition: String,
        action: String,
        assertion: String,
    },
}

impl ScopeDescriptor {
    pub fn precondition(subject: impl Into<String>, precondition: impl Into<String>) -> Self {
        ScopeDescriptor::Precondition {
            subject: subject.into(),
            precondition: precondition.into(),
        }
    }

    pub fn action(
        subject: impl Into<String>,
        precondition: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        ScopeDescriptor::Action {
            subject: subject.into(),
            precondition: precondition.into(),
            action: action.into(),
        }
    }

    pub fn assertion(
        subject: impl Into<String>,
        precondition: impl Into<String>,
        action: impl Into<String>,
        assertion: impl Into<String>,
    ) -> Self {
        ScopeDescriptor::Assertion {
            subject: subject.into(),
            precondition: precondition.into(),
            action: action.into(),
            assertion: assertion.into(),
        }
    }

    /// Build a descriptor of `kind` from its labels.
    ///
    /// Returns `None` when the label count does not match the kind's arity.
    pub fn from_labels(kind: ScopeKind, labels: &[String]) -> Option<Self> {
        if labels.len() != kind.arity() {
            return None;
        }
        let d = match kind {
            ScopeKind::Precondition => Self::precondition(&labels[0], &labels[1]),
            ScopeKind::Action => Self::action(&labels[0], &labels[1], &labels[2]),
            ScopeKind::Assertion => {
                Self::assertion(&labels[0], &labels[1], &labels[2], &labels[3])
            }
        };
        Some(d)
    }

    pub fn kind(&self) -> ScopeKind {
        match self {
            ScopeDescriptor::Precondition { .. } => ScopeKind::Precondition,
            ScopeDescriptor::Action { .. } => ScopeKind::Action,
            ScopeDescriptor::Assertion { .. } => ScopeKind::Assertion,
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            ScopeDescriptor::Precondition { subject, .. }
            | ScopeDescriptor::Action { subject, .. }
            | ScopeDescriptor::Assertion { subject, .. } => subject,
        }
    }

    /// Ordered labels, subject first
    pub fn labels(&self) -> Vec<&str> {
        match self {
            ScopeDescriptor::Precondition { subject, precondition } => {
                vec![subject.as_str(), precondition.as_str()]
            }
            ScopeDescriptor::Action { subject, precondition, action } => {
                vec![subject.as_str(), precondition.as_str(), action.as_str()]
            }
            ScopeDescriptor::Assertion { subject, precondition, action, assertion } => {
                vec![subject.as_str(), precondition.as_str(), action.as_str(), assertion.as_str()]
            }
        }
    }

    /// Innermost label (the one this scope adds to its parent)
    pub fn label(&self) -> &str {
        match self {
            ScopeDescriptor::Precondition { precondition, .. } => precondition,
            ScopeDescriptor::Action { action, .. } => action,
            ScopeDescriptor::Assertion { assertion, .. } => assertion,
        }
    }

    /// Labels joined with ` / `, used for filtering and logs
    pub fn path(&self) -> String {
        self.labels().join(" / ")
    }
}

impl fmt::Display for ScopeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
