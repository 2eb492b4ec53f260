//! Mesh definition and direct mesh access

use cosim_core::{CouplingEngine, EngineError};
use tracing::debug;

use super::{int32, Context};
use crate::error::GatewayResult;
use crate::frame::{expect_len, expect_records, Frame, FrameReader};
use crate::opcode::Operation;
use crate::value::{Matrix, Value};

/// Positions are always emitted with three columns
const POSITION_COLUMNS: usize = 3;

pub(super) fn has_mesh<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let name = r.str("meshName")?;
    r.finish()?;
    Ok(Frame::from(Value::Bool(cx.engine.has_mesh(name))))
}

pub(super) fn get_mesh_id<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let name = r.str("meshName")?;
    r.finish()?;
    if !cx.engine.has_mesh(name) {
        return Err(EngineError::UnknownMesh(name.to_string()).into());
    }
    let id = cx.registry.mesh_id(name);
    debug!(mesh = name, id, "Issued mesh id");
    Ok(Frame::from(Value::int32(id)))
}

pub(super) fn requires_connectivity<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    r.finish()?;
    Ok(Frame::from(Value::Bool(
        cx.engine.requires_mesh_connectivity_for(&mesh)?,
    )))
}

pub(super) fn set_vertex<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let mesh = cx.mesh(&mut r)?;
    let position = r.f64s("position")?;
    r.finish()?;

    let dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(op, "position", dim, position.len())?;
    let id = cx.engine.set_mesh_vertex(&mesh, position)?;
    Ok(Frame::from(Value::int32(id)))
}

pub(super) fn set_vertices<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let mesh = cx.mesh(&mut r)?;
    let size = r.count("size")?;
    let positions = r.f64s("positions")?;
    r.finish()?;
    expect_records(op, "positions", size, positions.len())?;

    let dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(op, "positions", size * dim, positions.len())?;
    let ids = cx.engine.set_mesh_vertices(&mesh, positions)?;
    debug!(mesh = %mesh, count = ids.len(), "Vertices set");
    Ok(Frame::from(Value::Int32(ids)))
}

pub(super) fn vertex_size<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    r.finish()?;
    Ok(Frame::from(int32(cx.engine.get_mesh_vertex_size(&mesh)?)?))
}

pub(super) fn set_edge<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    let first = r.i32("firstVertexID")?;
    let second = r.i32("secondVertexID")?;
    r.finish()?;
    cx.engine.set_mesh_edge(&mesh, first, second)?;
    Ok(Frame::empty())
}

/// Older generation: the edge gets an id that triangles and quads refer to
pub(super) fn set_edge_with_id<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh_id, mesh) = cx.mesh_handle(&mut r)?;
    let first = r.i32("firstVertexID")?;
    let second = r.i32("secondVertexID")?;
    r.finish()?;
    cx.engine.set_mesh_edge(&mesh, first, second)?;
    let edge = cx.registry.add_edge(mesh_id, first, second);
    Ok(Frame::from(Value::int32(edge)))
}

pub(super) fn set_triangle<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    let first = r.i32("firstVertexID")?;
    let second = r.i32("secondVertexID")?;
    let third = r.i32("thirdVertexID")?;
    r.finish()?;
    cx.engine.set_mesh_triangle(&mesh, first, second, third)?;
    Ok(Frame::empty())
}

pub(super) fn set_triangle_from_edges<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh_id, mesh) = cx.mesh_handle(&mut r)?;
    let edges = [
        r.i32("firstEdgeID")?,
        r.i32("secondEdgeID")?,
        r.i32("thirdEdgeID")?,
    ];
    r.finish()?;
    let [a, b, c] = cx.registry.triangle_from_edges(mesh_id, edges)?;
    cx.engine.set_mesh_triangle(&mesh, a, b, c)?;
    Ok(Frame::empty())
}

pub(super) fn set_quad<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    let v = [
        r.i32("firstVertexID")?,
        r.i32("secondVertexID")?,
        r.i32("thirdVertexID")?,
        r.i32("fourthVertexID")?,
    ];
    r.finish()?;
    cx.engine.set_mesh_quad(&mesh, v[0], v[1], v[2], v[3])?;
    Ok(Frame::empty())
}

pub(super) fn set_quad_from_edges<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let (mesh_id, mesh) = cx.mesh_handle(&mut r)?;
    let edges = [
        r.i32("firstEdgeID")?,
        r.i32("secondEdgeID")?,
        r.i32("thirdEdgeID")?,
        r.i32("fourthEdgeID")?,
    ];
    r.finish()?;
    let [a, b, c, d] = cx.registry.quad_from_edges(mesh_id, edges)?;
    cx.engine.set_mesh_quad(&mesh, a, b, c, d)?;
    Ok(Frame::empty())
}

pub(super) fn set_tetrahedron<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    let v = [
        r.i32("firstVertexID")?,
        r.i32("secondVertexID")?,
        r.i32("thirdVertexID")?,
        r.i32("fourthVertexID")?,
    ];
    r.finish()?;
    cx.engine.set_mesh_tetrahedron(&mesh, v[0], v[1], v[2], v[3])?;
    Ok(Frame::empty())
}

/// `setMeshEdges` / `Triangles` / `Quads` / `Tetrahedra` with a flat id list
pub(super) fn set_connectivity_batch<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let mesh = cx.mesh(&mut r)?;
    // Only the edge batch carries an explicit edge count
    let size = match operation {
        Operation::SetMeshEdges => Some(r.count("size")?),
        _ => None,
    };
    let ids = r.i32s("vertices")?;
    let width = match operation {
        Operation::SetMeshEdges => 2,
        Operation::SetMeshTriangles => 3,
        _ => 4,
    };
    if ids.len() % width != 0 {
        return Err(r.mismatch(format!(
            "vertices must hold a multiple of {} ids, got {}",
            width,
            ids.len()
        )));
    }
    if let Some(size) = size {
        expect_len(operation, "vertices", width * size, ids.len())?;
    }
    r.finish()?;

    match operation {
        Operation::SetMeshEdges => cx.engine.set_mesh_edges(&mesh, ids)?,
        Operation::SetMeshTriangles => cx.engine.set_mesh_triangles(&mesh, ids)?,
        Operation::SetMeshQuads => cx.engine.set_mesh_quads(&mesh, ids)?,
        _ => cx.engine.set_mesh_tetrahedra(&mesh, ids)?,
    }
    Ok(Frame::empty())
}

pub(super) fn set_access_region<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let mesh = cx.mesh(&mut r)?;
    let bounding_box = r.f64s("boundingBox")?;
    r.finish()?;

    let dim = cx.engine.get_mesh_dimensions(&mesh)?;
    expect_len(op, "boundingBox", 2 * dim, bounding_box.len())?;
    cx.engine.set_mesh_access_region(&mesh, bounding_box)?;
    Ok(Frame::empty())
}

/// Two result slots: ids, then an `[n, 3]` position matrix
pub(super) fn vertices_and_ids<E: CouplingEngine>(
    cx: &mut Context<'_, E>,
    mut r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    let op = r.operation();
    let mesh = cx.mesh(&mut r)?;
    let size = r.count("size")?;
    r.finish()?;

    let dim = cx.engine.get_mesh_dimensions(&mesh)?;
    let (ids, positions) = cx.engine.get_mesh_vertices_and_ids(&mesh)?;
    expect_len(op, "ids", size, ids.len())?;
    if positions.len() != ids.len() * dim {
        return Err(EngineError::InvalidState(format!(
            "engine returned {} coordinates for {} vertices",
            positions.len(),
            ids.len()
        ))
        .into());
    }

    Ok(Frame::from(vec![
        Value::Int32(ids),
        Value::Float64(Matrix::from_records(&positions, dim, POSITION_COLUMNS)),
    ]))
}
