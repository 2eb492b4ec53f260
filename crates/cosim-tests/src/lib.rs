//! End-to-end tests for the coupling gateway
//!
//! These tests drive a [`Session`] through `dispatch` only, the way a host
//! binding does, with the loopback engine behind it. No peers or network
//! are needed.
//!
//! # Test Structure
//!
//! - `lifecycle_test.rs` - construct/destruct guard, unknown opcodes, diagnostics
//! - `participant_test.rs` - name-addressed coupling loop, mesh and data access
//! - `solver_interface_test.rs` - id-addressed generation and edge handles
//! - `version_test.rs` - stateless version gateway

use std::path::{Path, PathBuf};

use cosim_gateway::{
    Frame, GatewayConfig, GatewayResult, Generation, MemorySink, Session, Value,
};
use cosim_loopback::LoopbackFactory;
use tempfile::TempDir;

/// Participant name used by every default configuration
pub const PARTICIPANT: &str = "Solid";

/// Loopback setup with one 2-D mesh, a scalar and a vector field
pub const DEFAULT_CONFIG: &str = r#"
participant = "Solid"
dimensions = 2
time_window_size = 0.1
max_time = 0.3

[[meshes]]
name = "Solid-Mesh"
connectivity = true

[[meshes]]
name = "Fluid-Mesh"
direct_access = true
provided_vertices = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]

[[data]]
name = "Temperature"
mesh = "Solid-Mesh"

[[data]]
name = "Displacement"
mesh = "Solid-Mesh"
dimensions = 2
gradient = true
"#;

/// A session over the loopback engine plus the temp dir holding its config
pub struct Harness {
    pub session: Session<LoopbackFactory>,
    pub sink: MemorySink,
    config_path: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new(generation: Generation) -> Self {
        Self::with_engine_config(generation, DEFAULT_CONFIG)
    }

    /// Harness whose engine reads `engine_config` (TOML)
    pub fn with_engine_config(generation: Generation, engine_config: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config_path = dir.path().join("loopback.toml");
        std::fs::write(&config_path, engine_config).expect("write engine config");

        let sink = MemorySink::new();
        let session = Session::with_config(LoopbackFactory, GatewayConfig::for_generation(generation))
            .with_sink(sink.clone());
        Self {
            session,
            sink,
            config_path,
            _dir: dir,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Dispatch by method name with the opcode echo prepended
    pub fn call(&mut self, name: &str, args: impl IntoIterator<Item = Value>) -> GatewayResult<Frame> {
        let opcode = self.opcode(name);
        self.session.dispatch(opcode, &Frame::call(opcode, args))
    }

    /// Like [`Harness::call`], panicking on error
    pub fn ok(&mut self, name: &str, args: impl IntoIterator<Item = Value>) -> Frame {
        match self.call(name, args) {
            Ok(frame) => frame,
            Err(e) => panic!("{} failed: {}", name, e),
        }
    }

    pub fn opcode(&self, name: &str) -> u8 {
        self.session
            .table()
            .by_name(name)
            .unwrap_or_else(|| panic!("{} is not in the {} table", name, self.session.table().generation()))
            .opcode
    }

    /// Construct the interface for [`PARTICIPANT`], rank 0 of 1
    pub fn construct(&mut self) -> GatewayResult<Frame> {
        let config = self.config_path.display().to_string();
        self.call(
            "constructor",
            [
                Value::str(PARTICIPANT),
                Value::str(config),
                Value::int32(0),
                Value::int32(1),
            ],
        )
    }
}

/// First element of a result frame
pub fn first(frame: &Frame) -> &Value {
    frame.get(0).expect("result frame is empty")
}

pub fn as_bool(frame: &Frame) -> bool {
    first(frame).as_bool().expect("logical result")
}

pub fn as_f64(frame: &Frame) -> f64 {
    first(frame).as_f64().expect("double scalar result")
}

pub fn as_i32s(frame: &Frame) -> Vec<i32> {
    first(frame).as_i32s().expect("int32 result").to_vec()
}

pub fn as_f64s(frame: &Frame) -> Vec<f64> {
    first(frame).as_matrix().expect("double result").data.clone()
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
