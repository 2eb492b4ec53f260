//! Per-group opcode handlers
//!
//! Each operation is implemented once against [`CouplingEngine`]. Mesh and
//! data references are resolved through the session's addressing mode, so
//! the same handler serves both generations where their semantics agree.

mod data;
mod mesh;
mod status;
mod steering;

use cosim_core::{CouplingEngine, EngineError};

use crate::capabilities::Addressing;
use crate::error::{GatewayError, GatewayResult};
use crate::frame::{Frame, FrameReader};
use crate::opcode::Operation;
use crate::registry::{DataHandle, HandleRegistry};
use crate::value::Value;

/// Borrowed session state a handler runs against
pub(crate) struct Context<'a, E> {
    pub engine: &'a mut E,
    pub registry: &'a mut HandleRegistry,
    pub addressing: Addressing,
}

impl<E: CouplingEngine> Context<'_, E> {
    /// Mesh argument: a name, or a registry handle
    pub fn mesh(&self, r: &mut FrameReader<'_>) -> GatewayResult<String> {
        match self.addressing {
            Addressing::ByName => Ok(r.str("mesh")?.to_string()),
            Addressing::ById => Ok(self.registry.mesh(r.i32("meshID")?)?.to_string()),
        }
    }

    /// Mesh handle argument of the identifier-addressed generation
    pub fn mesh_handle(&self, r: &mut FrameReader<'_>) -> GatewayResult<(i32, String)> {
        let id = r.i32("meshID")?;
        Ok((id, self.registry.mesh(id)?.to_string()))
    }

    /// Data argument(s): mesh and data names, or one data handle bound to its mesh
    pub fn data(&self, r: &mut FrameReader<'_>) -> GatewayResult<(String, String)> {
        match self.addressing {
            Addressing::ByName => {
                let mesh = r.str("mesh")?.to_string();
                let data = r.str("data")?.to_string();
                Ok((mesh, data))
            }
            Addressing::ById => {
                let DataHandle { mesh, data, .. } = self.registry.data(r.i32("dataID")?)?.clone();
                Ok((mesh, data))
            }
        }
    }
}

/// Dimension results travel as uint8
pub(crate) fn dimension(value: usize) -> GatewayResult<Value> {
    u8::try_from(value)
        .map(Value::UInt8)
        .map_err(|_| EngineError::InvalidState(format!("dimension {} out of range", value)).into())
}

/// Counts and ids travel as int32
pub(crate) fn int32(value: usize) -> GatewayResult<Value> {
    i32::try_from(value)
        .map(Value::int32)
        .map_err(|_| EngineError::InvalidState(format!("count {} out of range", value)).into())
}

/// Run one engine-backed operation
pub(crate) fn handle<E: CouplingEngine>(
    operation: Operation,
    cx: &mut Context<'_, E>,
    r: FrameReader<'_>,
) -> GatewayResult<Frame> {
    use Operation::*;
    match operation {
        Initialize => steering::initialize(cx, r, false),
        InitializeWithStepSize => steering::initialize(cx, r, true),
        Advance => steering::advance(cx, r, false),
        AdvanceWithStepSize => steering::advance(cx, r, true),
        Finalize => steering::finalize(cx, r),

        GetDimensions
        | IsCouplingOngoing
        | IsTimeWindowComplete
        | GetMaxTimeStepSize
        | RequiresInitialData
        | RequiresReadingCheckpoint
        | RequiresWritingCheckpoint => status::query(operation, cx, r),
        GetMeshDimensions => status::mesh_dimensions(cx, r),
        GetDataDimensions => status::data_dimensions(cx, r),
        IsActionRequired => status::is_action_required(cx, r),
        MarkActionFulfilled => status::mark_action_fulfilled(r),

        HasMesh => mesh::has_mesh(cx, r),
        GetMeshId => mesh::get_mesh_id(cx, r),
        RequiresMeshConnectivity => mesh::requires_connectivity(cx, r),
        SetMeshVertex => mesh::set_vertex(cx, r),
        SetMeshVertices => mesh::set_vertices(cx, r),
        GetMeshVertexSize => mesh::vertex_size(cx, r),
        SetMeshEdge => mesh::set_edge(cx, r),
        SetMeshEdgeWithId => mesh::set_edge_with_id(cx, r),
        SetMeshTriangle => mesh::set_triangle(cx, r),
        SetMeshTriangleFromEdges => mesh::set_triangle_from_edges(cx, r),
        SetMeshQuad => mesh::set_quad(cx, r),
        SetMeshQuadFromEdges => mesh::set_quad_from_edges(cx, r),
        SetMeshTetrahedron => mesh::set_tetrahedron(cx, r),
        SetMeshEdges | SetMeshTriangles | SetMeshQuads | SetMeshTetrahedra => {
            mesh::set_connectivity_batch(operation, cx, r)
        }
        SetMeshAccessRegion => mesh::set_access_region(cx, r),
        GetMeshVerticesAndIds => mesh::vertices_and_ids(cx, r),

        HasData => data::has_data(cx, r),
        GetDataId => data::get_data_id(cx, r),
        WriteData => data::write(cx, r),
        ReadData => data::read(cx, r),
        RequiresGradientData => data::requires_gradient(cx, r),
        WriteGradientData => data::write_gradient(cx, r),
        WriteBlockVectorData | WriteBlockScalarData => data::write_block(operation, cx, r),
        WriteVectorData | WriteScalarData => data::write_single(operation, cx, r),
        ReadBlockVectorData | ReadBlockScalarData => data::read_block(operation, cx, r),
        ReadVectorData | ReadScalarData => data::read_single(operation, cx, r),
        WriteBlockVectorGradientData | WriteBlockScalarGradientData => {
            data::write_block_gradient(operation, cx, r)
        }
        WriteVectorGradientData | WriteScalarGradientData => {
            data::write_single_gradient(operation, cx, r)
        }

        Construct | Destruct | GetVersionInformation => Err(GatewayError::shape(
            operation,
            "not an engine operation",
        )),
    }
}
