//! CouplingEngine trait - the contract the gateway forwards calls to

use std::path::Path;

use crate::error::{EngineError, EngineResult};

/// Mesh vertex identifier, owned by the engine and passed through by callers
pub type VertexId = i32;

/// A live coupling-interface instance for one participant.
///
/// Meshes and data fields are addressed by name. Position, value and
/// gradient buffers are flat and vertex-major: vertex `i` occupies
/// `buf[i * dim..(i + 1) * dim]`.
///
/// Calls may block for as long as the engine needs to rendezvous with its
/// peers; callers must not impose a timeout.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait CouplingEngine {
    // =========================================================================
    // Steering
    // =========================================================================

    /// Set up data structures and communication; ends the mesh definition phase
    fn initialize(&mut self) -> EngineResult<()>;

    /// Advance the coupled simulation by the step size the solver just computed
    fn advance(&mut self, computed_time_step_size: f64) -> EngineResult<()>;

    /// Tear down communication; no further steering afterwards
    fn finalize(&mut self) -> EngineResult<()>;

    // =========================================================================
    // Status queries
    // =========================================================================

    /// Spatial dimensionality of the coupling configuration
    fn get_dimensions(&self) -> EngineResult<usize>;

    fn is_coupling_ongoing(&self) -> EngineResult<bool>;

    fn is_time_window_complete(&self) -> EngineResult<bool>;

    /// Largest step size the solver may take without leaving the time window
    fn get_max_time_step_size(&self) -> EngineResult<f64>;

    fn requires_initial_data(&self) -> EngineResult<bool>;

    fn requires_reading_checkpoint(&self) -> EngineResult<bool>;

    fn requires_writing_checkpoint(&self) -> EngineResult<bool>;

    // =========================================================================
    // Mesh access
    // =========================================================================

    fn has_mesh(&self, mesh: &str) -> bool;

    fn has_data(&self, mesh: &str, data: &str) -> bool;

    fn get_mesh_dimensions(&self, mesh: &str) -> EngineResult<usize>;

    fn get_data_dimensions(&self, mesh: &str, data: &str) -> EngineResult<usize>;

    fn requires_mesh_connectivity_for(&self, mesh: &str) -> EngineResult<bool>;

    fn set_mesh_vertex(&mut self, mesh: &str, position: &[f64]) -> EngineResult<VertexId>;

    /// Register `positions.len() / dim` vertices; ids come back in input order
    fn set_mesh_vertices(&mut self, mesh: &str, positions: &[f64]) -> EngineResult<Vec<VertexId>>;

    fn get_mesh_vertex_size(&self, mesh: &str) -> EngineResult<usize>;

    fn set_mesh_edge(&mut self, mesh: &str, first: VertexId, second: VertexId)
        -> EngineResult<()>;

    fn set_mesh_triangle(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
    ) -> EngineResult<()>;

    fn set_mesh_quad(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
        fourth: VertexId,
    ) -> EngineResult<()>;

    fn set_mesh_tetrahedron(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
        fourth: VertexId,
    ) -> EngineResult<()>;

    fn set_mesh_edges(&mut self, mesh: &str, vertices: &[VertexId]) -> EngineResult<()> {
        for edge in chunks(vertices, 2, "edges")? {
            self.set_mesh_edge(mesh, edge[0], edge[1])?;
        }
        Ok(())
    }

    fn set_mesh_triangles(&mut self, mesh: &str, vertices: &[VertexId]) -> EngineResult<()> {
        for tri in chunks(vertices, 3, "triangles")? {
            self.set_mesh_triangle(mesh, tri[0], tri[1], tri[2])?;
        }
        Ok(())
    }

    fn set_mesh_quads(&mut self, mesh: &str, vertices: &[VertexId]) -> EngineResult<()> {
        for quad in chunks(vertices, 4, "quads")? {
            self.set_mesh_quad(mesh, quad[0], quad[1], quad[2], quad[3])?;
        }
        Ok(())
    }

    fn set_mesh_tetrahedra(&mut self, mesh: &str, vertices: &[VertexId]) -> EngineResult<()> {
        for tet in chunks(vertices, 4, "tetrahedra")? {
            self.set_mesh_tetrahedron(mesh, tet[0], tet[1], tet[2], tet[3])?;
        }
        Ok(())
    }

    /// Restrict a directly accessed received mesh to `[min, max]` per axis
    fn set_mesh_access_region(&mut self, mesh: &str, bounding_box: &[f64]) -> EngineResult<()>;

    /// Ids and vertex-major positions (mesh dimensionality) of a directly accessed mesh
    fn get_mesh_vertices_and_ids(&self, mesh: &str)
        -> EngineResult<(Vec<VertexId>, Vec<f64>)>;

    // =========================================================================
    // Data access
    // =========================================================================

    fn write_data(
        &mut self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        values: &[f64],
    ) -> EngineResult<()>;

    /// Sample `data` at `relative_read_time` past the current time
    fn read_data(
        &self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        relative_read_time: f64,
    ) -> EngineResult<Vec<f64>>;

    fn requires_gradient_data_for(&self, mesh: &str, data: &str) -> EngineResult<bool>;

    /// Gradients are `data_dim * mesh_dim` values per vertex
    fn write_gradient_data(
        &mut self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        gradients: &[f64],
    ) -> EngineResult<()>;
}

/// Creates engine instances for a gateway session
pub trait EngineFactory {
    type Engine: CouplingEngine;

    /// Construct the interface for one participant rank
    fn construct(
        &self,
        participant: &str,
        config_path: &Path,
        rank: i32,
        size: i32,
    ) -> EngineResult<Self::Engine>;

    /// Human-readable version of the underlying engine
    fn version_information(&self) -> String;
}

fn chunks<'a>(
    vertices: &'a [VertexId],
    width: usize,
    what: &str,
) -> EngineResult<std::slice::ChunksExact<'a, VertexId>> {
    if vertices.len() % width != 0 {
        return Err(EngineError::InvalidArgument(format!(
            "{} expect a multiple of {} vertex ids, got {}",
            what,
            width,
            vertices.len()
        )));
    }
    Ok(vertices.chunks_exact(width))
}
