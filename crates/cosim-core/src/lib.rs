//! cosim-core - Core traits and types for the coupling gateway
//!
//! This crate provides the contract between the gateway and the numerical
//! coupling engine it drives. The engine is an external collaborator: the
//! gateway only forwards calls through [`CouplingEngine`] and returns its
//! results.

pub mod action;
pub mod engine;
pub mod error;

pub use action::CheckpointAction;
pub use engine::{CouplingEngine, EngineFactory, VertexId};
pub use error::{EngineError, EngineResult};

#[cfg(any(test, feature = "mock"))]
pub use engine::MockCouplingEngine;
