//! Stateless version gateway
//!
//! Answers the engine's version string without constructing a session.

use cosim_core::EngineFactory;

use crate::error::{GatewayError, GatewayResult};
use crate::frame::{Frame, FrameReader};
use crate::opcode::Operation;
use crate::value::Value;

/// The only opcode the version gateway understands
pub const VERSION_INFORMATION: u8 = 0;

pub struct VersionGateway<F> {
    factory: F,
}

impl<F: EngineFactory> VersionGateway<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn dispatch(&self, opcode: u8, args: &Frame) -> GatewayResult<Frame> {
        if opcode != VERSION_INFORMATION {
            return Err(GatewayError::UnknownOpcode(opcode));
        }
        FrameReader::new(Operation::GetVersionInformation, opcode, args, true)?.finish()?;
        Ok(Frame::from(Value::str(self.factory.version_information())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use cosim_core::{EngineError, EngineResult, MockCouplingEngine};

    struct VersionOnly;

    impl EngineFactory for VersionOnly {
        type Engine = MockCouplingEngine;

        fn construct(&self, _: &str, _: &Path, _: i32, _: i32) -> EngineResult<Self::Engine> {
            Err(EngineError::NotSupported("construct".into()))
        }

        fn version_information(&self) -> String {
            "engine 3.1.2".to_string()
        }
    }

    #[test]
    fn test_version_information() {
        let gateway = VersionGateway::new(VersionOnly);
        let out = gateway.dispatch(0, &Frame::call(0, [])).unwrap();
        assert_eq!(out, Frame::from(Value::str("engine 3.1.2")));
    }

    #[test]
    fn test_other_opcodes_are_unknown() {
        let gateway = VersionGateway::new(VersionOnly);
        assert!(matches!(
            gateway.dispatch(1, &Frame::call(1, [])),
            Err(GatewayError::UnknownOpcode(1))
        ));
        assert!(matches!(
            gateway.dispatch(0, &Frame::call(0, [Value::str("extra")])),
            Err(GatewayError::ArgumentShapeMismatch { .. })
        ));
    }
}
