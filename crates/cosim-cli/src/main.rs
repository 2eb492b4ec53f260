//! cosim-replay - Replay gateway call scripts against the loopback engine
//!
//! Stands in for a host environment: every call of a script goes through
//! `Session::dispatch` exactly as a host binding would issue it.

mod output;
mod script;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cosim_gateway::{Frame, GatewayConfig, Generation, Session, VersionGateway};
use cosim_loopback::LoopbackFactory;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::output::{ErrorReport, Outcome, OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "cosim-replay")]
#[command(author, version, about = "Replay coupling gateway call scripts")]
struct Cli {
    /// Call script (YAML, or JSON with a .json extension)
    #[arg(required_unless_present = "engine_version")]
    script: Option<PathBuf>,

    /// Gateway configuration file (TOML)
    #[arg(short, long, env = "COSIM_GATEWAY_CONFIG")]
    gateway_config: Option<PathBuf>,

    /// API generation, overrides the configuration file
    #[arg(long)]
    generation: Option<Generation>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Print the engine version and exit
    #[arg(long)]
    engine_version: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.engine_version {
        let gateway = VersionGateway::new(LoopbackFactory);
        let out = gateway.dispatch(0, &Frame::call(0, []))?;
        println!("{}", output::format_frame(&out).trim_matches('"'));
        return Ok(());
    }

    let mut config = match &cli.gateway_config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("Failed to load gateway config: {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(generation) = cli.generation {
        config.generation = generation;
    }

    let Some(script_path) = &cli.script else {
        bail!("no script given");
    };
    let calls = script::load(script_path)?;
    debug!(calls = calls.len(), generation = %config.generation, "Replaying script");

    let mut session = Session::with_config(LoopbackFactory, config);
    let mut ctx = OutputContext::new(cli.output);
    let mut failed = None;

    for (step, call) in calls.iter().enumerate() {
        let opcode = call
            .resolve(session.table())
            .with_context(|| format!("Call {} cannot be resolved", step))?;
        let operation = session
            .table()
            .decode(opcode)
            .map(|e| e.name.to_string())
            .unwrap_or_else(|| "?".to_string());

        let result = session.dispatch(opcode, &call.frame(opcode));
        let error = result.as_ref().err().map(ErrorReport::from);
        let stop = error.is_some() && !call.allow_error;
        ctx.record(Outcome {
            step,
            opcode,
            operation,
            result: result.ok(),
            error,
        });
        if stop {
            failed = Some(step);
            break;
        }
    }

    ctx.finish();
    if let Some(step) = failed {
        bail!("Replay stopped at call {}", step);
    }
    Ok(())
}
