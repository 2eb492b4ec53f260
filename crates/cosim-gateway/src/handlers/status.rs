//! Status queries and checkpoint actions

use cosim_core::{CheckpointAction, CouplingEngine};
use tracing::debug;

use super::{dimension, Context};
use crate::error::{GatewayError, GatewayResult};
use crate::frame::{Frame, FrameReader};
use crate::opcode::Operation;
use crate::value::Value;

/// Argument-less queries
pub(super) fn query<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    r.finish()?;
    let engine = &*cx.engine;
    let value = match operation {
        Operation::GetDimensions => dimension(engine.get_dimensions()?)?,
        Operation::IsCouplingOngoing => Value::Bool(engine.is_coupling_ongoing()?),
        Operation::IsTimeWindowComplete => Value::Bool(engine.is_time_window_complete()?),
        Operation::GetMaxTimeStepSize => Value::float64(engine.get_max_time_step_size()?),
        Operation::RequiresInitialData => Value::Bool(engine.requires_initial_data()?),
        Operation::RequiresReadingCheckpoint => Value::Bool(engine.requires_reading_checkpoint()?),
        Operation::RequiresWritingCheckpoint => Value::Bool(engine.requires_writing_checkpoint()?),
        other => return Err(GatewayError::shape(other, "not a status query")),
    };
    Ok(Frame::from(value))
}

pub(super) fn mesh_dimensions<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    r.finish()?;
    Ok(Frame::from(dimension(cx.engine.get_mesh_dimensions(&mesh)?)?))
}

pub(super) fn data_dimensions<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    r.finish()?;
    Ok(Frame::from(dimension(
        cx.engine.get_data_dimensions(&mesh, &data)?,
    )?))
}

fn action(r: &mut FrameReader<'_>) -> GatewayResult<CheckpointAction> {
    let name = r.str("action")?;
    name.parse().map_err(|e: String| r.mismatch(e))
}

pub(super) fn is_action_required<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let action = action(&mut r)?;
    r.finish()?;
    let required = match action {
        CheckpointAction::WriteInitialData => cx.engine.requires_initial_data()?,
        CheckpointAction::WriteIterationCheckpoint => cx.engine.requires_writing_checkpoint()?,
        CheckpointAction::ReadIterationCheckpoint => cx.engine.requires_reading_checkpoint()?,
    };
    Ok(Frame::from(Value::Bool(required)))
}

/// The engine tracks actions itself; fulfilling one is only acknowledged
pub(super) fn mark_action_fulfilled(mut r: FrameReader<'_>) -> GatewayResult<Frame> {
    let action = action(&mut r)?;
    r.finish()?;
    debug!(%action, "Action fulfilled");
    Ok(Frame::empty())
}
