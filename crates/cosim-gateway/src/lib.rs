//! cosim-gateway - Multiplexed opcode gateway for a co-simulation coupling engine
//!
//! A host that cannot call the engine's methods directly sends an opcode
//! and a positional argument frame through one entry point and receives a
//! positional result frame back.
//!
//! ```text
//! ┌──────────────┐   dispatch(opcode, args)   ┌───────────────────────────┐
//! │     Host     │ ─────────────────────────► │          Session          │
//! │ (script/MEX) │ ◄───────────────────────── │                           │
//! └──────────────┘        result frame        │ OpcodeTable  (generation) │
//!                                             │ lifecycle guard           │
//!                                             │ FrameReader  (marshaling) │
//!                                             │ HandleRegistry (ids)      │
//!                                             └─────────────┬─────────────┘
//!                                                           │ CouplingEngine
//!                                                           ▼
//!                                             ┌───────────────────────────┐
//!                                             │   engine instance (owned) │
//!                                             └───────────────────────────┘
//! ```
//!
//! Two opcode tables are offered, one per API [`Generation`]: the
//! identifier-addressed SolverInterface tables and the name-addressed
//! Participant tables. Both are served by the same handlers,
//! parameterised by [`Capabilities`].

pub mod capabilities;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frame;
mod handlers;
pub mod opcode;
pub mod registry;
pub mod session;
pub mod value;
pub mod version;

pub use capabilities::{Addressing, Capabilities, DataOps, Generation, StepReturn};
pub use config::{ConfigError, GatewayConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use error::{GatewayError, GatewayResult};
pub use frame::{Frame, FrameReader};
pub use opcode::{OpcodeEntry, OpcodeGroup, OpcodeTable, Operation};
pub use registry::{HandleKind, HandleRegistry};
pub use session::Session;
pub use value::{Matrix, Value};
pub use version::VersionGateway;
