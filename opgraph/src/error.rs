use strum_macros::{Display as StrumDisplay, EnumIter};
use thiserror::Error;

use crate::operation::OperationId;
use crate::value_node::ValueState;

/// Optional hooks a value kind may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum CapabilityKind {
    Filter,
    SameProperties,
    Clone,
    LiteralEncoding,
    Declare,
    Extract,
    Cleanup,
    Sync,
    CompileDependencies,
    Headers,
    Libraries,
    SupportCode,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleConflict {
    #[error("already owned by operation {existing}, requested owner {requested}")]
    DifferentOwner {
        existing: OperationId,
        requested: OperationId,
    },
    #[error("already mapped to output {existing}, requested output {requested}")]
    DifferentIndex {
        existing: usize,
        requested: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Value {value} cannot be rebound: {conflict}")]
    OwnershipConflict { value: String, conflict: RoleConflict },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Value kind {kind} does not support {capability}")]
    UnsupportedCapability {
        kind: String,
        capability: CapabilityKind,
    },
    #[error("Value kind {kind} rejected data: {message}")]
    ValidationFailure { kind: String, message: String },
    #[error("Value {value} is {state}, cannot {operation}")]
    InvalidState {
        value: String,
        state: ValueState,
        operation: &'static str,
    },
}

pub type ValueResult<T> = std::result::Result<T, ValueError>;

impl ValueError {
    pub fn unsupported(kind: &str, capability: CapabilityKind) -> Self {
        ValueError::UnsupportedCapability {
            kind: kind.to_string(),
            capability,
        }
    }

    pub fn validation(kind: &str, message: impl Into<String>) -> Self {
        ValueError::ValidationFailure {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ValueError::UnsupportedCapability { .. })
    }
}

/// Turns an unsupported hook into `Ok(None)` so callers can branch on capability.
pub trait CapabilityResultExt<T> {
    fn supported(self) -> ValueResult<Option<T>>;
}

impl<T> CapabilityResultExt<T> for ValueResult<T> {
    fn supported(self) -> ValueResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(ValueError::UnsupportedCapability { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
