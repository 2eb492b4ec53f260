//! Session - lifecycle guard and opcode dispatch
//!
//! A [`Session`] owns at most one engine instance. Its presence is the
//! only lifecycle state:
//!
//! ```text
//! Unconstructed --construct--> Active --destruct--> Unconstructed
//! ```
//!
//! Every non-lifecycle opcode requires `Active`; whether the engine has
//! been initialized is the engine's concern and only visible through the
//! status queries.

use std::path::Path;

use cosim_core::EngineFactory;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{GatewayError, GatewayResult};
use crate::frame::{Frame, FrameReader};
use crate::handlers::{self, Context};
use crate::opcode::{OpcodeEntry, OpcodeTable, Operation};
use crate::registry::HandleRegistry;
use crate::value::Value;

/// One gateway handle wrapping at most one live engine instance
pub struct Session<F: EngineFactory> {
    factory: F,
    config: GatewayConfig,
    table: OpcodeTable,
    instance: Option<F::Engine>,
    registry: HandleRegistry,
    sink: Box<dyn DiagnosticSink>,
}

impl<F: EngineFactory> Session<F> {
    /// Create a Participant-generation session
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, GatewayConfig::default())
    }

    pub fn with_config(factory: F, config: GatewayConfig) -> Self {
        Self {
            factory,
            table: OpcodeTable::for_generation(config.generation),
            config,
            instance: None,
            registry: HandleRegistry::new(),
            sink: Box::new(TracingSink),
        }
    }

    /// Replace the diagnostic sink (default: [`TracingSink`])
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn is_constructed(&self) -> bool {
        self.instance.is_some()
    }

    /// The live engine instance, if constructed
    pub fn engine(&self) -> Option<&F::Engine> {
        self.instance.as_ref()
    }

    /// The single entry point: run `opcode` with `args` (`args[0]` restates the opcode)
    pub fn dispatch(&mut self, opcode: u8, args: &Frame) -> GatewayResult<Frame> {
        let result = self.dispatch_inner(opcode, args);
        if let Err(e) = &result {
            if e.is_lifecycle() || matches!(e, GatewayError::UnknownOpcode(_)) {
                self.sink.report(Diagnostic {
                    opcode,
                    code: e.code(),
                    message: e.to_string(),
                });
            } else {
                debug!(opcode, error = %e, "Dispatch failed");
            }
        }
        result
    }

    fn dispatch_inner(&mut self, opcode: u8, args: &Frame) -> GatewayResult<Frame> {
        let OpcodeEntry { operation, name, .. } = self
            .table
            .decode(opcode)
            .ok_or(GatewayError::UnknownOpcode(opcode))?;
        debug!(opcode, %operation, name, "Dispatch");

        match (operation, self.instance.is_some()) {
            (Operation::Construct, true) => return Err(GatewayError::AlreadyConstructed),
            (Operation::Construct, false) => {}
            (_, false) => return Err(GatewayError::NotConstructed),
            (_, true) => {}
        }

        let reader = FrameReader::new(operation, opcode, args, self.config.verify_opcode_echo)?;
        match operation {
            Operation::Construct => self.construct(reader),
            Operation::Destruct => self.destruct(reader),
            Operation::GetVersionInformation => {
                reader.finish()?;
                Ok(Frame::from(Value::str(self.factory.version_information())))
            }
            _ => {
                let engine = self.instance.as_mut().ok_or(GatewayError::NotConstructed)?;
                let mut cx = Context {
                    engine,
                    registry: &mut self.registry,
                    addressing: self.config.generation.capabilities().addressing,
                };
                handlers::handle(operation, &mut cx, reader)
            }
        }
    }

    fn construct(&mut self, mut r: FrameReader<'_>) -> GatewayResult<Frame> {
        let participant = r.str("participantName")?;
        let config_path = r.str("configurationFileName")?;
        let rank = r.i32("solverProcessIndex")?;
        let size = r.i32("solverProcessSize")?;
        r.finish()?;

        let engine = self
            .factory
            .construct(participant, Path::new(config_path), rank, size)?;
        self.instance = Some(engine);
        info!(
            participant,
            config = config_path,
            rank,
            size,
            generation = %self.config.generation,
            "Coupling interface constructed"
        );
        Ok(Frame::empty())
    }

    fn destruct(&mut self, r: FrameReader<'_>) -> GatewayResult<Frame> {
        r.finish()?;
        self.instance = None;
        self.registry.clear();
        info!("Coupling interface destructed");
        Ok(Frame::empty())
    }
}
