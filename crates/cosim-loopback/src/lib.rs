//! cosim-loopback - Reference coupling engine
//!
//! A single-participant engine that reads back what it was given. It
//! implements [`cosim_core::CouplingEngine`] without any inter-process
//! communication and is configured from a TOML or YAML file whose path is
//! passed at construct, the way a real engine receives its configuration.

pub mod config;
pub mod engine;

pub use config::{DataConfig, LoopbackConfig, MeshConfig};
pub use engine::{LoopbackEngine, LoopbackFactory, Phase};
