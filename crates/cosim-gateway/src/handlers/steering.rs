//! initialize / advance / finalize

use cosim_core::CouplingEngine;
use tracing::{debug, info};

use super::Context;
use crate::error::GatewayResult;
use crate::frame::{Frame, FrameReader};
use crate::value::Value;

/// Result frame of a steering call: the next step size, or nothing
fn step_result<E: CouplingEngine>(cx: &Context<'_, E>, returns_step: bool) -> GatewayResult<Frame> {
    if returns_step {
        let dt = cx.engine.get_max_time_step_size()?;
        Ok(Frame::from(Value::float64(dt)))
    } else {
        Ok(Frame::empty())
    }
}

pub(super) fn initialize<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    r: FrameReader<'_>,
    returns_step: bool,
) -> GatewayResult<Frame> {
    r.finish()?;
    cx.engine.initialize()?;
    info!("Coupling interface initialized");
    step_result(cx, returns_step)
}

pub(super) fn advance<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
    returns_step: bool,
) -> GatewayResult<Frame> {
    let dt = r.f64("computedTimeStepSize")?;
    r.finish()?;
    debug!(dt, "Advancing");
    cx.engine.advance(dt)?;
    step_result(cx, returns_step)
}

pub(super) fn finalize<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    r.finish()?;
    cx.engine.finalize()?;
    info!("Coupling interface finalized");
    Ok(Frame::empty())
}
