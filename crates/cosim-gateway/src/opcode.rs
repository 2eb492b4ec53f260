//! Opcode tables
//!
//! Opcodes are a stable wire contract, partitioned by numeric range:
//!
//! | Range | Group |
//! |-------|-------|
//! | 0-9   | construction / destruction |
//! | 10-19 | steering |
//! | 20-29 | status queries |
//! | 30-39 | actions |
//! | 40-59 | mesh access |
//! | 60-79 | data access |
//!
//! Renumbering an existing opcode breaks every caller built against it.

use std::fmt;

use crate::capabilities::{Addressing, Capabilities, DataOps, Generation, StepReturn};

/// Opcodes of the name-addressed Participant generation
pub mod participant_opcode {
    pub const CONSTRUCT: u8 = 0;
    pub const DESTRUCT: u8 = 1;

    pub const INITIALIZE: u8 = 10;
    pub const ADVANCE: u8 = 11;
    pub const FINALIZE: u8 = 12;

    pub const GET_MESH_DIMENSIONS: u8 = 20;
    pub const GET_DATA_DIMENSIONS: u8 = 21;
    pub const IS_COUPLING_ONGOING: u8 = 22;
    pub const IS_TIME_WINDOW_COMPLETE: u8 = 23;
    pub const GET_MAX_TIME_STEP_SIZE: u8 = 24;
    pub const REQUIRES_INITIAL_DATA: u8 = 25;
    pub const REQUIRES_READING_CHECKPOINT: u8 = 26;
    pub const REQUIRES_WRITING_CHECKPOINT: u8 = 27;

    pub const REQUIRES_MESH_CONNECTIVITY_FOR: u8 = 42;
    pub const SET_MESH_VERTEX: u8 = 43;
    pub const SET_MESH_VERTICES: u8 = 44;
    pub const GET_MESH_VERTEX_SIZE: u8 = 45;
    pub const SET_MESH_EDGE: u8 = 46;
    pub const SET_MESH_EDGES: u8 = 47;
    pub const SET_MESH_TRIANGLE: u8 = 48;
    pub const SET_MESH_TRIANGLES: u8 = 49;
    pub const SET_MESH_QUAD: u8 = 50;
    pub const SET_MESH_QUADS: u8 = 51;
    pub const SET_MESH_TETRAHEDRON: u8 = 52;
    pub const SET_MESH_TETRAHEDRA: u8 = 53;

    pub const WRITE_DATA: u8 = 60;
    pub const READ_DATA: u8 = 61;
    pub const REQUIRES_GRADIENT_DATA_FOR: u8 = 62;
    pub const WRITE_GRADIENT_DATA: u8 = 63;
    pub const SET_MESH_ACCESS_REGION: u8 = 64;
    pub const GET_MESH_VERTICES_AND_IDS: u8 = 65;
}

/// Opcodes of the id-addressed SolverInterface generation
pub mod solver_interface_opcode {
    pub const CONSTRUCT: u8 = 0;
    pub const DESTRUCT: u8 = 1;

    pub const INITIALIZE: u8 = 10;
    pub const ADVANCE: u8 = 12;
    pub const FINALIZE: u8 = 13;

    pub const GET_DIMENSIONS: u8 = 20;
    pub const IS_COUPLING_ONGOING: u8 = 21;
    pub const IS_TIME_WINDOW_COMPLETE: u8 = 24;
    pub const GET_VERSION_INFORMATION: u8 = 27;

    pub const IS_ACTION_REQUIRED: u8 = 30;
    pub const MARK_ACTION_FULFILLED: u8 = 31;

    pub const HAS_MESH: u8 = 40;
    pub const GET_MESH_ID: u8 = 41;
    pub const SET_MESH_VERTEX: u8 = 44;
    pub const GET_MESH_VERTEX_SIZE: u8 = 45;
    pub const SET_MESH_VERTICES: u8 = 46;
    pub const SET_MESH_EDGE: u8 = 49;
    pub const SET_MESH_TRIANGLE: u8 = 50;
    pub const SET_MESH_TRIANGLE_WITH_EDGES: u8 = 51;
    pub const SET_MESH_QUAD: u8 = 52;
    pub const SET_MESH_QUAD_WITH_EDGES: u8 = 53;
    pub const IS_MESH_CONNECTIVITY_REQUIRED: u8 = 54;
    pub const SET_MESH_ACCESS_REGION: u8 = 55;
    pub const GET_MESH_VERTICES_AND_IDS: u8 = 56;

    pub const HAS_DATA: u8 = 60;
    pub const GET_DATA_ID: u8 = 61;
    pub const WRITE_BLOCK_VECTOR_DATA: u8 = 64;
    pub const WRITE_VECTOR_DATA: u8 = 65;
    pub const WRITE_BLOCK_SCALAR_DATA: u8 = 66;
    pub const WRITE_SCALAR_DATA: u8 = 67;
    pub const READ_BLOCK_VECTOR_DATA: u8 = 68;
    pub const READ_VECTOR_DATA: u8 = 69;
    pub const READ_BLOCK_SCALAR_DATA: u8 = 70;
    pub const READ_SCALAR_DATA: u8 = 71;
    pub const IS_GRADIENT_DATA_REQUIRED: u8 = 72;
    pub const WRITE_BLOCK_VECTOR_GRADIENT_DATA: u8 = 73;
    pub const WRITE_VECTOR_GRADIENT_DATA: u8 = 74;
    pub const WRITE_BLOCK_SCALAR_GRADIENT_DATA: u8 = 75;
    pub const WRITE_SCALAR_GRADIENT_DATA: u8 = 76;
}

/// Semantic operation selected by an opcode.
///
/// Operations with different result arity are distinct variants, even when
/// two generations share a wire name (`advance` returns the next step size
/// only in the SolverInterface generation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Construct,
    Destruct,

    Initialize,
    InitializeWithStepSize,
    Advance,
    AdvanceWithStepSize,
    Finalize,

    GetDimensions,
    GetMeshDimensions,
    GetDataDimensions,
    IsCouplingOngoing,
    IsTimeWindowComplete,
    GetMaxTimeStepSize,
    RequiresInitialData,
    RequiresReadingCheckpoint,
    RequiresWritingCheckpoint,
    GetVersionInformation,

    IsActionRequired,
    MarkActionFulfilled,

    HasMesh,
    GetMeshId,
    RequiresMeshConnectivity,
    SetMeshVertex,
    SetMeshVertices,
    GetMeshVertexSize,
    SetMeshEdge,
    SetMeshEdgeWithId,
    SetMeshEdges,
    SetMeshTriangle,
    SetMeshTriangleFromEdges,
    SetMeshTriangles,
    SetMeshQuad,
    SetMeshQuadFromEdges,
    SetMeshQuads,
    SetMeshTetrahedron,
    SetMeshTetrahedra,
    SetMeshAccessRegion,
    GetMeshVerticesAndIds,

    HasData,
    GetDataId,
    WriteData,
    ReadData,
    RequiresGradientData,
    WriteGradientData,
    WriteBlockVectorData,
    WriteVectorData,
    WriteBlockScalarData,
    WriteScalarData,
    ReadBlockVectorData,
    ReadVectorData,
    ReadBlockScalarData,
    ReadScalarData,
    WriteBlockVectorGradientData,
    WriteVectorGradientData,
    WriteBlockScalarGradientData,
    WriteScalarGradientData,
}

impl Operation {
    /// Whether a generation with these capabilities may expose this operation
    pub fn permitted_by(&self, caps: &Capabilities) -> bool {
        use Operation::*;
        match self {
            InitializeWithStepSize | AdvanceWithStepSize => caps.step_return == StepReturn::Value,
            Initialize | Advance | GetMaxTimeStepSize => caps.step_return == StepReturn::Void,

            GetMeshId | GetDataId | SetMeshEdgeWithId | SetMeshTriangleFromEdges
            | SetMeshQuadFromEdges => caps.addressing == Addressing::ById,

            WriteData | ReadData | WriteGradientData => caps.data_ops == DataOps::Unified,

            WriteBlockVectorData
            | WriteVectorData
            | WriteBlockScalarData
            | WriteScalarData
            | ReadBlockVectorData
            | ReadVectorData
            | ReadBlockScalarData
            | ReadScalarData
            | WriteBlockVectorGradientData
            | WriteVectorGradientData
            | WriteBlockScalarGradientData
            | WriteScalarGradientData => caps.data_ops == DataOps::Block,

            _ => true,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Readability grouping of the opcode space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeGroup {
    Lifecycle,
    Steering,
    Status,
    Action,
    Mesh,
    Data,
    Reserved,
}

impl OpcodeGroup {
    pub fn of(opcode: u8) -> Self {
        match opcode {
            0..=9 => OpcodeGroup::Lifecycle,
            10..=19 => OpcodeGroup::Steering,
            20..=29 => OpcodeGroup::Status,
            30..=39 => OpcodeGroup::Action,
            40..=59 => OpcodeGroup::Mesh,
            60..=79 => OpcodeGroup::Data,
            _ => OpcodeGroup::Reserved,
        }
    }
}

/// One row of an opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub opcode: u8,
    /// Method name as the host-side wrapper spells it
    pub name: &'static str,
    pub operation: Operation,
}

const fn entry(opcode: u8, name: &'static str, operation: Operation) -> OpcodeEntry {
    OpcodeEntry {
        opcode,
        name,
        operation,
    }
}

static PARTICIPANT_TABLE: &[OpcodeEntry] = {
    use participant_opcode::*;
    use Operation::*;
    &[
        entry(CONSTRUCT, "constructor", Construct),
        entry(DESTRUCT, "destructor", Destruct),
        entry(INITIALIZE, "initialize", Initialize),
        entry(ADVANCE, "advance", Advance),
        entry(FINALIZE, "finalize", Finalize),
        entry(GET_MESH_DIMENSIONS, "getMeshDimensions", GetMeshDimensions),
        entry(GET_DATA_DIMENSIONS, "getDataDimensions", GetDataDimensions),
        entry(IS_COUPLING_ONGOING, "isCouplingOngoing", IsCouplingOngoing),
        entry(IS_TIME_WINDOW_COMPLETE, "isTimeWindowComplete", IsTimeWindowComplete),
        entry(GET_MAX_TIME_STEP_SIZE, "getMaxTimeStepSize", GetMaxTimeStepSize),
        entry(REQUIRES_INITIAL_DATA, "requiresInitialData", RequiresInitialData),
        entry(REQUIRES_READING_CHECKPOINT, "requiresReadingCheckpoint", RequiresReadingCheckpoint),
        entry(REQUIRES_WRITING_CHECKPOINT, "requiresWritingCheckpoint", RequiresWritingCheckpoint),
        entry(REQUIRES_MESH_CONNECTIVITY_FOR, "requiresMeshConnectivityFor", RequiresMeshConnectivity),
        entry(SET_MESH_VERTEX, "setMeshVertex", SetMeshVertex),
        entry(SET_MESH_VERTICES, "setMeshVertices", SetMeshVertices),
        entry(GET_MESH_VERTEX_SIZE, "getMeshVertexSize", GetMeshVertexSize),
        entry(SET_MESH_EDGE, "setMeshEdge", SetMeshEdge),
        entry(SET_MESH_EDGES, "setMeshEdges", SetMeshEdges),
        entry(SET_MESH_TRIANGLE, "setMeshTriangle", SetMeshTriangle),
        entry(SET_MESH_TRIANGLES, "setMeshTriangles", SetMeshTriangles),
        entry(SET_MESH_QUAD, "setMeshQuad", SetMeshQuad),
        entry(SET_MESH_QUADS, "setMeshQuads", SetMeshQuads),
        entry(SET_MESH_TETRAHEDRON, "setMeshTetrahedron", SetMeshTetrahedron),
        entry(SET_MESH_TETRAHEDRA, "setMeshTetrahedra", SetMeshTetrahedra),
        entry(WRITE_DATA, "writeData", WriteData),
        entry(READ_DATA, "readData", ReadData),
        entry(REQUIRES_GRADIENT_DATA_FOR, "requiresGradientDataFor", RequiresGradientData),
        entry(WRITE_GRADIENT_DATA, "writeGradientData", WriteGradientData),
        entry(SET_MESH_ACCESS_REGION, "setMeshAccessRegion", SetMeshAccessRegion),
        entry(GET_MESH_VERTICES_AND_IDS, "getMeshVerticesAndIDs", GetMeshVerticesAndIds),
    ]
};

static SOLVER_INTERFACE_TABLE: &[OpcodeEntry] = {
    use solver_interface_opcode::*;
    use Operation::*;
    &[
        entry(CONSTRUCT, "constructor", Construct),
        entry(DESTRUCT, "destructor", Destruct),
        entry(INITIALIZE, "initialize", InitializeWithStepSize),
        entry(ADVANCE, "advance", AdvanceWithStepSize),
        entry(FINALIZE, "finalize", Finalize),
        entry(GET_DIMENSIONS, "getDimensions", GetDimensions),
        entry(IS_COUPLING_ONGOING, "isCouplingOngoing", IsCouplingOngoing),
        entry(IS_TIME_WINDOW_COMPLETE, "isTimeWindowComplete", IsTimeWindowComplete),
        entry(GET_VERSION_INFORMATION, "getVersionInformation", GetVersionInformation),
        entry(IS_ACTION_REQUIRED, "isActionRequired", IsActionRequired),
        entry(MARK_ACTION_FULFILLED, "markActionFulfilled", MarkActionFulfilled),
        entry(HAS_MESH, "hasMesh", HasMesh),
        entry(GET_MESH_ID, "getMeshID", GetMeshId),
        entry(SET_MESH_VERTEX, "setMeshVertex", SetMeshVertex),
        entry(GET_MESH_VERTEX_SIZE, "getMeshVertexSize", GetMeshVertexSize),
        entry(SET_MESH_VERTICES, "setMeshVertices", SetMeshVertices),
        entry(SET_MESH_EDGE, "setMeshEdge", SetMeshEdgeWithId),
        entry(SET_MESH_TRIANGLE, "setMeshTriangle", SetMeshTriangleFromEdges),
        entry(SET_MESH_TRIANGLE_WITH_EDGES, "setMeshTriangleWithEdges", SetMeshTriangle),
        entry(SET_MESH_QUAD, "setMeshQuad", SetMeshQuadFromEdges),
        entry(SET_MESH_QUAD_WITH_EDGES, "setMeshQuadWithEdges", SetMeshQuad),
        entry(IS_MESH_CONNECTIVITY_REQUIRED, "isMeshConnectivityRequired", RequiresMeshConnectivity),
        entry(SET_MESH_ACCESS_REGION, "setMeshAccessRegion", SetMeshAccessRegion),
        entry(GET_MESH_VERTICES_AND_IDS, "getMeshVerticesAndIDs", GetMeshVerticesAndIds),
        entry(HAS_DATA, "hasData", HasData),
        entry(GET_DATA_ID, "getDataID", GetDataId),
        entry(WRITE_BLOCK_VECTOR_DATA, "writeBlockVectorData", WriteBlockVectorData),
        entry(WRITE_VECTOR_DATA, "writeVectorData", WriteVectorData),
        entry(WRITE_BLOCK_SCALAR_DATA, "writeBlockScalarData", WriteBlockScalarData),
        entry(WRITE_SCALAR_DATA, "writeScalarData", WriteScalarData),
        entry(READ_BLOCK_VECTOR_DATA, "readBlockVectorData", ReadBlockVectorData),
        entry(READ_VECTOR_DATA, "readVectorData", ReadVectorData),
        entry(READ_BLOCK_SCALAR_DATA, "readBlockScalarData", ReadBlockScalarData),
        entry(READ_SCALAR_DATA, "readScalarData", ReadScalarData),
        entry(IS_GRADIENT_DATA_REQUIRED, "isGradientDataRequired", RequiresGradientData),
        entry(WRITE_BLOCK_VECTOR_GRADIENT_DATA, "writeBlockVectorGradientData", WriteBlockVectorGradientData),
        entry(WRITE_VECTOR_GRADIENT_DATA, "writeVectorGradientData", WriteVectorGradientData),
        entry(WRITE_BLOCK_SCALAR_GRADIENT_DATA, "writeBlockScalarGradientData", WriteBlockScalarGradientData),
        entry(WRITE_SCALAR_GRADIENT_DATA, "writeScalarGradientData", WriteScalarGradientData),
    ]
};

/// The closed opcode enumeration of one generation
#[derive(Debug, Clone, Copy)]
pub struct OpcodeTable {
    generation: Generation,
    entries: &'static [OpcodeEntry],
}

impl OpcodeTable {
    pub fn for_generation(generation: Generation) -> Self {
        let entries = match generation {
            Generation::SolverInterface => SOLVER_INTERFACE_TABLE,
            Generation::Participant => PARTICIPANT_TABLE,
        };
        Self {
            generation,
            entries,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn entries(&self) -> &'static [OpcodeEntry] {
        self.entries
    }

    /// Decode a wire opcode; `None` if it is outside this generation's table
    pub fn decode(&self, opcode: u8) -> Option<OpcodeEntry> {
        self.entries.iter().find(|e| e.opcode == opcode).copied()
    }

    /// Wire opcode of an operation in this generation
    pub fn opcode_of(&self, operation: Operation) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.operation == operation)
            .map(|e| e.opcode)
    }

    /// Look up an entry by its host-side method name (case-insensitive)
    pub fn by_name(&self, name: &str) -> Option<OpcodeEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .copied()
    }
}
