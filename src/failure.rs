//! Scope failure causes
//!
//! A [`Failure`] is the value handed to `StepReporter::failed`. It is data
//! forwarded from the runner, not an error of the reporting layer. Clones share
//! one allocation, so every observer receives the same cause and can compare
//! two causes by identity with [`Failure::ptr_eq`].

use std::fmt;
use std::sync::Arc;

/// What went wrong in the scope
#[derive(Debug)]
pub enum Cause {
    /// An assertion compared two values and they differed
    Mismatch {
        expected: String,
        actual: String,
    },
    /// The scope body returned an error
    Error(anyhow::Error),
    /// The scope body panicked
    Panic(String),
}

/// Shared, immutable failure cause
#[derive(Debug, Clone)]
pub struct Failure {
    cause: Arc<Cause>,
}

impl Failure {
    fn from_cause(cause: Cause) -> Self {
        Self { cause: Arc::new(cause) }
    }

    /// Assertion mismatch between expected and actual rendering
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::from_cause(Cause::Mismatch {
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Plain error message
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::from_cause(Cause::Error(anyhow::Error::msg(message)))
    }

    /// Wrap an error raised by the scope body
    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        Self::from_cause(Cause::Error(err.into()))
    }

    /// Failure caused by a panic, with the panic message
    pub fn panic(message: impl Into<String>) -> Self {
        Self::from_cause(Cause::Panic(message.into()))
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    /// Expected/actual pair for mismatch failures
    pub fn as_mismatch(&self) -> Option<(&str, &str)> {
        match &*self.cause {
            Cause::Mismatch { expected, actual } => Some((expected.as_str(), actual.as_str())),
            _ => None,
        }
    }

    /// True if both handles point at the same failure instance
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }

    /// One-line summary used by console and log output
    pub fn summary(&self) -> String {
        match &*self.cause {
            Cause::Mismatch { expected, actual } => {
                if expected.contains('\n') || actual.contains('\n') {
                    "values differ".to_string()
                } else {
                    format!("expected {}, got {}", expected, actual)
                }
            }
            Cause::Error(e) => format!("{:#}", e),
            Cause::Panic(msg) => format!("panicked: {}", msg),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Self::error(e)
    }
}
