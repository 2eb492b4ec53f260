//! Gateway error types

use cosim_core::EngineError;
use thiserror::Error;

use crate::opcode::Operation;
use crate::registry::HandleKind;

/// Result type for dispatch
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors returned by [`Session::dispatch`](crate::Session::dispatch)
///
/// Everything except `EngineFailure` is detected inside the gateway and
/// never reaches the engine.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `construct` while an instance is live
    #[error("Interface is already constructed")]
    AlreadyConstructed,

    /// Any other opcode while no instance is live
    #[error("Interface is not constructed")]
    NotConstructed,

    /// Opcode outside the session's table
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// Argument count, element type or buffer length disagrees with the opcode contract
    #[error("Argument shape mismatch in {operation}: {detail}")]
    ArgumentShapeMismatch { operation: Operation, detail: String },

    /// Mesh, data or edge id that the session never issued (or no longer knows)
    #[error("Invalid {kind} id: {id}")]
    InvalidHandle { kind: HandleKind, id: i32 },

    /// Error surfaced by the coupling engine
    #[error("Engine failure: {0}")]
    EngineFailure(#[from] EngineError),
}

impl GatewayError {
    /// Shorthand for [`GatewayError::ArgumentShapeMismatch`]
    pub fn shape(operation: Operation, detail: impl Into<String>) -> Self {
        GatewayError::ArgumentShapeMismatch {
            operation,
            detail: detail.into(),
        }
    }

    /// Stable numeric code reported to hosts
    pub fn code(&self) -> u16 {
        match self {
            GatewayError::AlreadyConstructed => 1,
            GatewayError::NotConstructed => 2,
            GatewayError::UnknownOpcode(_) => 3,
            GatewayError::ArgumentShapeMismatch { .. } => 4,
            GatewayError::InvalidHandle { .. } => 5,
            GatewayError::EngineFailure(_) => 100,
        }
    }

    /// Whether this is a lifecycle guard rejection
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            GatewayError::AlreadyConstructed | GatewayError::NotConstructed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversion() {
        let err: GatewayError = EngineError::UnknownMesh("Solid-Mesh".into()).into();
        assert_eq!(err.code(), 100);
        assert_eq!(err.to_string(), "Engine failure: Unknown mesh: Solid-Mesh");
        assert!(!err.is_lifecycle());
    }

    #[test]
    fn test_shape_message() {
        let err = GatewayError::shape(Operation::WriteBlockScalarData, "expected 5 values, got 4");
        assert_eq!(
            err.to_string(),
            "Argument shape mismatch in WriteBlockScalarData: expected 5 values, got 4"
        );
        assert_eq!(err.code(), 4);
    }

    #[test]
    fn test_lifecycle_errors() {
        assert!(GatewayError::AlreadyConstructed.is_lifecycle());
        assert!(GatewayError::NotConstructed.is_lifecycle());
        assert!(!GatewayError::UnknownOpcode(255).is_lifecycle());
        assert_eq!(
            GatewayError::InvalidHandle {
                kind: HandleKind::Data,
                id: 4
            }
            .to_string(),
            "Invalid data id: 4"
        );
    }
}
