//! Common error types for coupling engines

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by a coupling engine
///
/// The gateway never interprets these; they are forwarded to the caller
/// with the engine's message attached.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Participant name is not part of the configuration
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Mesh name is not known to the engine
    #[error("Unknown mesh: {0}")]
    UnknownMesh(String),

    /// Data field is not defined on the given mesh
    #[error("Unknown data \"{data}\" on mesh \"{mesh}\"")]
    UnknownData { mesh: String, data: String },

    /// Invalid mesh geometry or connectivity
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Vertex id does not exist on the mesh
    #[error("Invalid vertex id {id} on mesh \"{mesh}\"")]
    InvalidVertex { mesh: String, id: i32 },

    /// Argument value rejected by the engine
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Call is not allowed in the current engine state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Communication with peer participants failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// Operation not supported by this engine
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Configuration file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for [`EngineError::UnknownData`]
    pub fn unknown_data(mesh: &str, data: &str) -> Self {
        EngineError::UnknownData {
            mesh: mesh.to_string(),
            data: data.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::unknown_data("Fluid-Mesh", "Forces");
        assert_eq!(
            err.to_string(),
            "Unknown data \"Forces\" on mesh \"Fluid-Mesh\""
        );

        let err = EngineError::InvalidVertex {
            mesh: "Fluid-Mesh".to_string(),
            id: 7,
        };
        assert_eq!(err.to_string(), "Invalid vertex id 7 on mesh \"Fluid-Mesh\"");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "precice-config.xml");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
