//! Data exchange: unified reads/writes and the block/single variants

use cosim_core::{CouplingEngine, EngineError};
use tracing::debug;

use super::Context;
use crate::error::{GatewayError, GatewayResult};
use crate::frame::{expect_len, expect_records, Frame, FrameReader};
use crate::opcode::Operation;
use crate::value::{Matrix, Value};

fn is_scalar_op(operation: Operation) -> bool {
    use Operation::*;
    matches!(
        operation,
        WriteBlockScalarData
            | WriteScalarData
            | ReadBlockScalarData
            | ReadScalarData
            | WriteBlockScalarGradientData
            | WriteScalarGradientData
    )
}

/// Scalar-named opcodes need 1-D data, vector-named opcodes need more
fn check_rank(operation: Operation, data: &str, dim: usize) -> GatewayResult<()> {
    let scalar = is_scalar_op(operation);
    if scalar != (dim == 1) {
        return Err(GatewayError::shape(
            operation,
            format!(
                "data \"{}\" has dimension {}, expected {}",
                data,
                dim,
                if scalar { "scalar data" } else { "vector data" }
            ),
        ));
    }
    Ok(())
}

fn check_engine_len(expected: usize, actual: usize) -> GatewayResult<()> {
    if expected != actual {
        return Err(EngineError::InvalidState(format!(
            "engine returned {} values, expected {}",
            actual, expected
        ))
        .into());
    }
    Ok(())
}

pub(super) fn has_data<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let name = r.str("dataName")?;
    let mesh = cx.mesh(&mut r)?;
    r.finish()?;
    Ok(Frame::from(Value::Bool(cx.engine.has_data(&mesh, name))))
}

pub(super) fn get_data_id<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let name = r.str("dataName")?;
    let (mesh_id, mesh) = cx.mesh_handle(&mut r)?;
    r.finish()?;
    if !cx.engine.has_data(&mesh, name) {
        return Err(EngineError::unknown_data(&mesh, name).into());
    }
    let id = cx.registry.data_id(mesh_id, name)?;
    debug!(mesh = %mesh, data = name, id, "Issued data id");
    Ok(Frame::from(Value::int32(id)))
}

pub(super) fn requires_gradient<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    r.finish()?;
    Ok(Frame::from(Value::Bool(
        cx.engine.requires_gradient_data_for(&mesh, &data)?,
    )))
}

// =========================================================================
// Unified operations
// =========================================================================

pub(super) fn write<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let (mesh, data) = cx.data(&mut r)?;
    let ids = r.i32s("vertexIDs")?;
    let values = r.f64s("values")?;
    r.finish()?;
    expect_records(op, "values", ids.len(), values.len())?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    expect_len(op, "values", ids.len() * dim, values.len())?;
    cx.engine.write_data(&mesh, &data, ids, values)?;
    Ok(Frame::empty())
}

pub(super) fn read<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let (mesh, data) = cx.data(&mut r)?;
    let size = r.count("size")?;
    let ids = r.i32s("vertexIDs")?;
    let relative_read_time = r.f64("relativeReadTime")?;
    r.finish()?;
    expect_len(op, "vertexIDs", size, ids.len())?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    let values = cx.engine.read_data(&mesh, &data, ids, relative_read_time)?;
    check_engine_len(size * dim, values.len())?;
    Ok(Frame::from(Value::floats(values)))
}

pub(super) fn write_gradient<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let (mesh, data) = cx.data(&mut r)?;
    let size = r.count("size")?;
    let ids = r.i32s("vertexIDs")?;
    let gradients = r.f64s("gradients")?;
    r.finish()?;
    expect_len(op, "vertexIDs", size, ids.len())?;
    expect_records(op, "gradients", size, gradients.len())?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    let mesh_dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(op, "gradients", size * dim * mesh_dim, gradients.len())?;
    cx.engine.write_gradient_data(&mesh, &data, ids, gradients)?;
    Ok(Frame::empty())
}

// =========================================================================
// Block and single-vertex operations
// =========================================================================

/// Older reads sample the end of the step the solver is about to take
fn legacy_read_time<E: CouplingEngine>(cx: &Context<'_, E>) -> GatewayResult<f64> {
    Ok(cx.engine.get_max_time_step_size()?)
}

pub(super) fn write_block<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let size = r.count("size")?;
    let ids = r.i32s("valueIndices")?;
    let values = r.f64s("values")?;
    r.finish()?;
    expect_len(operation, "valueIndices", size, ids.len())?;
    if is_scalar_op(operation) {
        expect_len(operation, "values", size, values.len())?;
    } else {
        expect_records(operation, "values", size, values.len())?;
    }

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    expect_len(operation, "values", size * dim, values.len())?;
    cx.engine.write_data(&mesh, &data, ids, values)?;
    Ok(Frame::empty())
}

pub(super) fn write_single<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let vertex = r.i32("valueIndex")?;
    let value = if is_scalar_op(operation) {
        vec![r.f64("value")?]
    } else {
        r.f64s("value")?.to_vec()
    };
    r.finish()?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    expect_len(operation, "value", dim, value.len())?;
    cx.engine.write_data(&mesh, &data, &[vertex], &value)?;
    Ok(Frame::empty())
}

pub(super) fn read_block<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let size = r.count("size")?;
    let ids = r.i32s("valueIndices")?;
    let scalar = is_scalar_op(operation);
    let transpose = if scalar { r.bool("transpose")? } else { false };
    r.finish()?;
    expect_len(operation, "valueIndices", size, ids.len())?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    let t = legacy_read_time(cx)?;
    let values = cx.engine.read_data(&mesh, &data, ids, t)?;
    check_engine_len(size * dim, values.len())?;

    let matrix = if scalar {
        if transpose {
            Matrix::column(values)
        } else {
            Matrix::row(values)
        }
    } else {
        // Vertex-major values are column-major [dim, size]
        Matrix {
            rows: dim,
            cols: size,
            data: values,
        }
    };
    Ok(Frame::from(Value::Float64(matrix)))
}

pub(super) fn read_single<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let vertex = r.i32("valueIndex")?;
    r.finish()?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    let t = legacy_read_time(cx)?;
    let values = cx.engine.read_data(&mesh, &data, &[vertex], t)?;
    check_engine_len(dim, values.len())?;

    let value = if is_scalar_op(operation) {
        Value::float64(values[0])
    } else {
        Value::Float64(Matrix::column(values))
    };
    Ok(Frame::from(value))
}

pub(super) fn write_block_gradient<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let size = r.count("size")?;
    let ids = r.i32s("valueIndices")?;
    let gradients = r.f64s("gradientValues")?;
    r.finish()?;
    expect_len(operation, "valueIndices", size, ids.len())?;
    expect_records(operation, "gradientValues", size, gradients.len())?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    let mesh_dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(operation, "gradientValues", size * dim * mesh_dim, gradients.len())?;
    cx.engine.write_gradient_data(&mesh, &data, ids, gradients)?;
    Ok(Frame::empty())
}

pub(super) fn write_single_gradient<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh, data) = cx.data(&mut r)?;
    let vertex = r.i32("valueIndex")?;
    let gradients = r.f64s("gradientValues")?;
    r.finish()?;

    let dim = cx.engine.get_data_dimensions(&mesh, &data)?;
    check_rank(operation, &data, dim)?;
    let mesh_dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(operation, "gradientValues", dim * mesh_dim, gradients.len())?;
    cx.engine.write_gradient_data(&mesh, &data, &[vertex], gradients)?;
    Ok(Frame::empty())
}
