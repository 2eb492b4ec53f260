//! In-process loopback coupling engine
//!
//! A single participant coupled with itself: whatever is written in a time
//! window is what is read back. Time-window bookkeeping, implicit-coupling
//! checkpoints, direct mesh access and gradients behave the way a real
//! engine exposes them through [`CouplingEngine`], which makes this engine
//! suitable for exercising a gateway end to end.

use std::collections::HashMap;
use std::path::Path;

use cosim_core::{CouplingEngine, EngineError, EngineFactory, EngineResult, VertexId};
use tracing::{debug, info};

use crate::config::LoopbackConfig;

/// Tolerance for time comparisons
const EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Initialized,
    Finalized,
}

#[derive(Debug)]
struct Mesh {
    dimensions: usize,
    connectivity: bool,
    direct_access: bool,
    /// Vertex-major positions of solver-defined vertices
    positions: Vec<f64>,
    /// Vertex-major positions a peer provides (direct access only)
    provided: Vec<f64>,
    region: Option<Vec<f64>>,
    edges: Vec<[VertexId; 2]>,
    triangles: Vec<[VertexId; 3]>,
    quads: Vec<[VertexId; 4]>,
    tetrahedra: Vec<[VertexId; 4]>,
}

impl Mesh {
    fn vertex_count(&self) -> usize {
        if self.direct_access {
            self.provided.len() / self.dimensions
        } else {
            self.positions.len() / self.dimensions
        }
    }

    fn vertex(&self, id: usize) -> &[f64] {
        let d = self.dimensions;
        &self.provided[id * d..(id + 1) * d]
    }

    fn in_region(&self, id: usize) -> bool {
        let Some(region) = &self.region else {
            return true;
        };
        self.vertex(id)
            .iter()
            .enumerate()
            .all(|(axis, x)| *x >= region[2 * axis] && *x <= region[2 * axis + 1])
    }
}

#[derive(Debug)]
struct Field {
    mesh: String,
    dimensions: usize,
    gradient: bool,
    /// Sample at the start of the current window
    start: Vec<f64>,
    /// Sample at the end of the current window (last write)
    end: Vec<f64>,
    gradients: Vec<f64>,
}

/// Loopback implementation of [`CouplingEngine`]
#[derive(Debug)]
pub struct LoopbackEngine {
    config: LoopbackConfig,
    participant: String,
    rank: i32,
    size: i32,
    phase: Phase,
    meshes: HashMap<String, Mesh>,
    fields: HashMap<(String, String), Field>,
    /// Start of the current time window
    time: f64,
    time_in_window: f64,
    /// 1-based iteration within the current window
    iteration: u32,
    window_complete: bool,
    reading_checkpoint: bool,
    writing_checkpoint: bool,
}

impl LoopbackEngine {
    pub fn new(config: LoopbackConfig, participant: &str, rank: i32, size: i32) -> EngineResult<Self> {
        config.validate()?;
        if participant != config.participant {
            return Err(EngineError::UnknownParticipant(participant.to_string()));
        }
        if size < 1 || rank < 0 || rank >= size {
            return Err(EngineError::InvalidArgument(format!(
                "rank {} is not in 0..{}",
                rank, size
            )));
        }

        let meshes = config
            .meshes
            .iter()
            .map(|m| {
                let mesh = Mesh {
                    dimensions: config.mesh_dimensions(m),
                    connectivity: m.connectivity,
                    direct_access: m.direct_access,
                    positions: Vec::new(),
                    provided: m.provided_vertices.concat(),
                    region: None,
                    edges: Vec::new(),
                    triangles: Vec::new(),
                    quads: Vec::new(),
                    tetrahedra: Vec::new(),
                };
                (m.name.clone(), mesh)
            })
            .collect();
        let fields = config
            .data
            .iter()
            .map(|d| {
                let field = Field {
                    mesh: d.mesh.clone(),
                    dimensions: d.dimensions,
                    gradient: d.gradient,
                    start: Vec::new(),
                    end: Vec::new(),
                    gradients: Vec::new(),
                };
                ((d.mesh.clone(), d.name.clone()), field)
            })
            .collect();

        Ok(Self {
            participant: participant.to_string(),
            rank,
            size,
            phase: Phase::Constructed,
            meshes,
            fields,
            time: 0.0,
            time_in_window: 0.0,
            iteration: 1,
            window_complete: false,
            reading_checkpoint: false,
            writing_checkpoint: false,
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn rank(&self) -> (i32, i32) {
        (self.rank, self.size)
    }

    /// Coupled time reached so far
    pub fn time(&self) -> f64 {
        self.time + self.time_in_window
    }

    /// Connectivity counts of a mesh: edges, triangles, quads, tetrahedra
    pub fn connectivity_counts(&self, mesh: &str) -> EngineResult<[usize; 4]> {
        let m = self.mesh(mesh)?;
        Ok([
            m.edges.len(),
            m.triangles.len(),
            m.quads.len(),
            m.tetrahedra.len(),
        ])
    }

    /// Stored gradients of one vertex
    pub fn gradient_of(&self, mesh: &str, data: &str, vertex: VertexId) -> EngineResult<Vec<f64>> {
        let field = self.field(mesh, data)?;
        let width = field.dimensions * self.mesh(mesh)?.dimensions;
        let i = self.vertex_index(mesh, vertex)?;
        Ok(field
            .gradients
            .get(i * width..(i + 1) * width)
            .map(<[f64]>::to_vec)
            .unwrap_or_else(|| vec![0.0; width]))
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn require(&self, allowed: &[Phase], what: &str) -> EngineResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(EngineError::InvalidState(format!(
                "{} is not allowed while {:?}",
                what, self.phase
            )))
        }
    }

    fn require_alive(&self, what: &str) -> EngineResult<()> {
        self.require(&[Phase::Constructed, Phase::Initialized], what)
    }

    fn mesh(&self, name: &str) -> EngineResult<&Mesh> {
        self.meshes
            .get(name)
            .ok_or_else(|| EngineError::UnknownMesh(name.to_string()))
    }

    fn mesh_mut(&mut self, name: &str) -> EngineResult<&mut Mesh> {
        self.meshes
            .get_mut(name)
            .ok_or_else(|| EngineError::UnknownMesh(name.to_string()))
    }

    fn field(&self, mesh: &str, data: &str) -> EngineResult<&Field> {
        self.mesh(mesh)?;
        self.fields
            .get(&(mesh.to_string(), data.to_string()))
            .ok_or_else(|| EngineError::unknown_data(mesh, data))
    }

    fn vertex_index(&self, mesh: &str, id: VertexId) -> EngineResult<usize> {
        let count = self.mesh(mesh)?.vertex_count();
        usize::try_from(id)
            .ok()
            .filter(|i| *i < count)
            .ok_or(EngineError::InvalidVertex {
                mesh: mesh.to_string(),
                id,
            })
    }

    fn vertex_indices(&self, mesh: &str, ids: &[VertexId]) -> EngineResult<Vec<usize>> {
        ids.iter().map(|id| self.vertex_index(mesh, *id)).collect()
    }

    /// Vertex ids of one connectivity element: existing and pairwise distinct
    fn check_element(&self, mesh: &str, ids: &[VertexId]) -> EngineResult<()> {
        self.vertex_indices(mesh, ids)?;
        for (i, a) in ids.iter().enumerate() {
            if ids[i + 1..].contains(a) {
                return Err(EngineError::InvalidGeometry(format!(
                    "vertex {} repeated in {:?} on mesh \"{}\"",
                    a, ids, mesh
                )));
            }
        }
        Ok(())
    }

    /// Defining vertices is only possible on solver-owned meshes before initialize
    fn definable_mesh(&mut self, mesh: &str, what: &str) -> EngineResult<&mut Mesh> {
        self.require(&[Phase::Constructed], what)?;
        let m = self.mesh_mut(mesh)?;
        if m.direct_access {
            return Err(EngineError::InvalidArgument(format!(
                "mesh \"{}\" is received; its vertices cannot be set",
                mesh
            )));
        }
        Ok(m)
    }

    fn is_ongoing(&self) -> bool {
        self.time < self.config.max_time - EPS
    }

    /// Length of the current window, clipped to the end time
    fn window_size(&self) -> f64 {
        self.config
            .time_window_size
            .min(self.config.max_time - self.time)
            .max(0.0)
    }

    fn max_step(&self) -> f64 {
        if self.is_ongoing() {
            (self.window_size() - self.time_in_window).max(0.0)
        } else {
            0.0
        }
    }

    fn is_implicit(&self) -> bool {
        self.config.max_iterations > 1
    }

    /// Grow per-vertex buffers to the current vertex count
    fn size_buffers(&mut self) {
        for field in self.fields.values_mut() {
            let Some(mesh) = self.meshes.get(&field.mesh) else {
                continue;
            };
            let n = mesh.vertex_count();
            field.start.resize(n * field.dimensions, 0.0);
            field.end.resize(n * field.dimensions, 0.0);
            if field.gradient {
                field
                    .gradients
                    .resize(n * field.dimensions * mesh.dimensions, 0.0);
            }
        }
    }

    fn complete_window(&mut self) {
        self.time += self.window_size();
        self.time_in_window = 0.0;
        self.iteration = 1;
        self.window_complete = true;
        self.reading_checkpoint = false;
        self.writing_checkpoint = self.is_implicit() && self.is_ongoing();
        for field in self.fields.values_mut() {
            field.start.clone_from(&field.end);
        }
        debug!(time = self.time, "Time window complete");
        if !self.is_ongoing() {
            info!(time = self.time, "Coupling has ended");
        }
    }

    fn repeat_window(&mut self) {
        self.time_in_window = 0.0;
        self.iteration += 1;
        self.window_complete = false;
        self.reading_checkpoint = true;
        self.writing_checkpoint = false;
        debug!(
            time = self.time,
            iteration = self.iteration,
            "Repeating time window"
        );
    }
}

impl CouplingEngine for LoopbackEngine {
    fn initialize(&mut self) -> EngineResult<()> {
        self.require(&[Phase::Constructed], "initialize")?;
        self.size_buffers();
        // Data written so far is the initial sample
        for field in self.fields.values_mut() {
            field.start.clone_from(&field.end);
        }
        self.phase = Phase::Initialized;
        self.writing_checkpoint = self.is_implicit() && self.is_ongoing();
        info!(
            participant = %self.participant,
            meshes = self.meshes.len(),
            data = self.fields.len(),
            "Loopback engine initialized"
        );
        Ok(())
    }

    fn advance(&mut self, computed_time_step_size: f64) -> EngineResult<()> {
        self.require(&[Phase::Initialized], "advance")?;
        if !self.is_ongoing() {
            return Err(EngineError::InvalidState(
                "advance after coupling has ended".to_string(),
            ));
        }
        let dt = computed_time_step_size;
        let max = self.max_step();
        if dt.is_nan() || dt <= 0.0 || dt > max + EPS {
            return Err(EngineError::InvalidArgument(format!(
                "time step size {} is not in (0, {}]",
                dt, max
            )));
        }

        self.time_in_window += dt;
        if self.time_in_window >= self.window_size() - EPS {
            if self.iteration < self.config.max_iterations {
                self.repeat_window();
            } else {
                self.complete_window();
            }
        } else {
            self.window_complete = false;
            self.reading_checkpoint = false;
            self.writing_checkpoint = false;
        }
        Ok(())
    }

    fn finalize(&mut self) -> EngineResult<()> {
        self.require_alive("finalize")?;
        self.phase = Phase::Finalized;
        info!(time = self.time(), "Loopback engine finalized");
        Ok(())
    }

    fn get_dimensions(&self) -> EngineResult<usize> {
        self.require_alive("getDimensions")?;
        Ok(self.config.dimensions)
    }

    fn is_coupling_ongoing(&self) -> EngineResult<bool> {
        self.require_alive("isCouplingOngoing")?;
        Ok(self.is_ongoing())
    }

    fn is_time_window_complete(&self) -> EngineResult<bool> {
        self.require_alive("isTimeWindowComplete")?;
        Ok(self.window_complete)
    }

    fn get_max_time_step_size(&self) -> EngineResult<f64> {
        self.require_alive("getMaxTimeStepSize")?;
        Ok(self.max_step())
    }

    fn requires_initial_data(&self) -> EngineResult<bool> {
        self.require_alive("requiresInitialData")?;
        Ok(self.config.initial_data && self.phase == Phase::Constructed)
    }

    fn requires_reading_checkpoint(&self) -> EngineResult<bool> {
        self.require_alive("requiresReadingCheckpoint")?;
        Ok(self.reading_checkpoint)
    }

    fn requires_writing_checkpoint(&self) -> EngineResult<bool> {
        self.require_alive("requiresWritingCheckpoint")?;
        Ok(self.writing_checkpoint)
    }

    fn has_mesh(&self, mesh: &str) -> bool {
        self.meshes.contains_key(mesh)
    }

    fn has_data(&self, mesh: &str, data: &str) -> bool {
        self.fields
            .contains_key(&(mesh.to_string(), data.to_string()))
    }

    fn get_mesh_dimensions(&self, mesh: &str) -> EngineResult<usize> {
        self.require_alive("getMeshDimensions")?;
        Ok(self.mesh(mesh)?.dimensions)
    }

    fn get_data_dimensions(&self, mesh: &str, data: &str) -> EngineResult<usize> {
        self.require_alive("getDataDimensions")?;
        Ok(self.field(mesh, data)?.dimensions)
    }

    fn requires_mesh_connectivity_for(&self, mesh: &str) -> EngineResult<bool> {
        self.require_alive("requiresMeshConnectivityFor")?;
        Ok(self.mesh(mesh)?.connectivity)
    }

    fn set_mesh_vertex(&mut self, mesh: &str, position: &[f64]) -> EngineResult<VertexId> {
        let m = self.definable_mesh(mesh, "setMeshVertex")?;
        if position.len() != m.dimensions {
            return Err(EngineError::InvalidArgument(format!(
                "position of mesh \"{}\" needs {} coordinates, got {}",
                mesh,
                m.dimensions,
                position.len()
            )));
        }
        let id = m.vertex_count();
        m.positions.extend_from_slice(position);
        VertexId::try_from(id).map_err(|_| EngineError::InvalidState("too many vertices".into()))
    }

    fn set_mesh_vertices(&mut self, mesh: &str, positions: &[f64]) -> EngineResult<Vec<VertexId>> {
        let m = self.definable_mesh(mesh, "setMeshVertices")?;
        if positions.len() % m.dimensions != 0 {
            return Err(EngineError::InvalidArgument(format!(
                "{} coordinates do not describe {}-D vertices",
                positions.len(),
                m.dimensions
            )));
        }
        let first = m.vertex_count();
        m.positions.extend_from_slice(positions);
        let last = m.vertex_count();
        (first..last)
            .map(|i| {
                VertexId::try_from(i).map_err(|_| EngineError::InvalidState("too many vertices".into()))
            })
            .collect()
    }

    fn get_mesh_vertex_size(&self, mesh: &str) -> EngineResult<usize> {
        self.require_alive("getMeshVertexSize")?;
        let m = self.mesh(mesh)?;
        if !m.direct_access {
            return Ok(m.vertex_count());
        }
        // Received vertices become visible with initialize
        if self.phase == Phase::Constructed {
            return Ok(0);
        }
        Ok((0..m.vertex_count()).filter(|i| m.in_region(*i)).count())
    }

    fn set_mesh_edge(&mut self, mesh: &str, first: VertexId, second: VertexId) -> EngineResult<()> {
        self.definable_mesh(mesh, "setMeshEdge")?;
        self.check_element(mesh, &[first, second])?;
        self.mesh_mut(mesh)?.edges.push([first, second]);
        Ok(())
    }

    fn set_mesh_triangle(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
    ) -> EngineResult<()> {
        self.definable_mesh(mesh, "setMeshTriangle")?;
        self.check_element(mesh, &[first, second, third])?;
        self.mesh_mut(mesh)?.triangles.push([first, second, third]);
        Ok(())
    }

    fn set_mesh_quad(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
        fourth: VertexId,
    ) -> EngineResult<()> {
        self.definable_mesh(mesh, "setMeshQuad")?;
        let quad = [first, second, third, fourth];
        self.check_element(mesh, &quad)?;
        self.mesh_mut(mesh)?.quads.push(quad);
        Ok(())
    }

    fn set_mesh_tetrahedron(
        &mut self,
        mesh: &str,
        first: VertexId,
        second: VertexId,
        third: VertexId,
        fourth: VertexId,
    ) -> EngineResult<()> {
        let m = self.definable_mesh(mesh, "setMeshTetrahedron")?;
        if m.dimensions != 3 {
            return Err(EngineError::InvalidGeometry(format!(
                "tetrahedra need a 3-D mesh, \"{}\" is {}-D",
                mesh, m.dimensions
            )));
        }
        let tet = [first, second, third, fourth];
        self.check_element(mesh, &tet)?;
        self.mesh_mut(mesh)?.tetrahedra.push(tet);
        Ok(())
    }

    fn set_mesh_access_region(&mut self, mesh: &str, bounding_box: &[f64]) -> EngineResult<()> {
        self.require(&[Phase::Constructed], "setMeshAccessRegion")?;
        let m = self.mesh_mut(mesh)?;
        if !m.direct_access {
            return Err(EngineError::InvalidArgument(format!(
                "mesh \"{}\" is not accessed directly",
                mesh
            )));
        }
        if m.region.is_some() {
            return Err(EngineError::InvalidState(format!(
                "access region of mesh \"{}\" is already set",
                mesh
            )));
        }
        if bounding_box.len() != 2 * m.dimensions {
            return Err(EngineError::InvalidArgument(format!(
                "bounding box needs {} values, got {}",
                2 * m.dimensions,
                bounding_box.len()
            )));
        }
        if bounding_box.chunks_exact(2).any(|axis| axis[0] > axis[1]) {
            return Err(EngineError::InvalidArgument(format!(
                "bounding box {:?} has min > max",
                bounding_box
            )));
        }
        m.region = Some(bounding_box.to_vec());
        Ok(())
    }

    fn get_mesh_vertices_and_ids(&self, mesh: &str) -> EngineResult<(Vec<VertexId>, Vec<f64>)> {
        self.require(&[Phase::Initialized], "getMeshVerticesAndIDs")?;
        let m = self.mesh(mesh)?;
        if !m.direct_access {
            return Err(EngineError::InvalidArgument(format!(
                "mesh \"{}\" is not accessed directly",
                mesh
            )));
        }
        let mut ids = Vec::new();
        let mut positions = Vec::new();
        for i in (0..m.vertex_count()).filter(|i| m.in_region(*i)) {
            ids.push(
                VertexId::try_from(i)
                    .map_err(|_| EngineError::InvalidState("too many vertices".into()))?,
            );
            positions.extend_from_slice(m.vertex(i));
        }
        Ok((ids, positions))
    }

    fn write_data(
        &mut self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        values: &[f64],
    ) -> EngineResult<()> {
        self.require_alive("writeData")?;
        let dim = self.field(mesh, data)?.dimensions;
        if values.len() != vertices.len() * dim {
            return Err(EngineError::InvalidArgument(format!(
                "{} values for {} vertices of {}-D data \"{}\"",
                values.len(),
                vertices.len(),
                dim,
                data
            )));
        }
        let indices = self.vertex_indices(mesh, vertices)?;
        self.size_buffers();

        let key = (mesh.to_string(), data.to_string());
        let field = self
            .fields
            .get_mut(&key)
            .ok_or_else(|| EngineError::unknown_data(mesh, data))?;
        for (i, value) in indices.iter().zip(values.chunks_exact(dim)) {
            field.end[i * dim..(i + 1) * dim].copy_from_slice(value);
        }
        Ok(())
    }

    fn read_data(
        &self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        relative_read_time: f64,
    ) -> EngineResult<Vec<f64>> {
        self.require(&[Phase::Initialized], "readData")?;
        let field = self.field(mesh, data)?;
        let max = self.max_step();
        let t = relative_read_time;
        if t.is_nan() || t < -EPS || t > max + EPS {
            return Err(EngineError::InvalidArgument(format!(
                "relative read time {} is not in [0, {}]",
                t, max
            )));
        }
        let indices = self.vertex_indices(mesh, vertices)?;

        let window = self.window_size();
        let factor = if window <= EPS {
            1.0
        } else {
            (self.time_in_window + t) / window
        };

        let dim = field.dimensions;
        let sample = |buf: &[f64], k: usize| buf.get(k).copied().unwrap_or(0.0);
        let mut out = Vec::with_capacity(indices.len() * dim);
        for i in indices {
            for k in i * dim..(i + 1) * dim {
                let (start, end) = (sample(&field.start, k), sample(&field.end, k));
                out.push(if factor >= 1.0 - EPS {
                    end
                } else if factor <= EPS {
                    start
                } else {
                    (1.0 - factor) * start + factor * end
                });
            }
        }
        Ok(out)
    }

    fn requires_gradient_data_for(&self, mesh: &str, data: &str) -> EngineResult<bool> {
        self.require_alive("requiresGradientDataFor")?;
        Ok(self.field(mesh, data)?.gradient)
    }

    fn write_gradient_data(
        &mut self,
        mesh: &str,
        data: &str,
        vertices: &[VertexId],
        gradients: &[f64],
    ) -> EngineResult<()> {
        self.require_alive("writeGradientData")?;
        let field = self.field(mesh, data)?;
        if !field.gradient {
            return Err(EngineError::InvalidArgument(format!(
                "data \"{}\" on mesh \"{}\" does not use gradients",
                data, mesh
            )));
        }
        let width = field.dimensions * self.mesh(mesh)?.dimensions;
        if gradients.len() != vertices.len() * width {
            return Err(EngineError::InvalidArgument(format!(
                "{} gradient values for {} vertices, expected {} each",
                gradients.len(),
                vertices.len(),
                width
            )));
        }
        let indices = self.vertex_indices(mesh, vertices)?;
        self.size_buffers();

        let key = (mesh.to_string(), data.to_string());
        let field = self
            .fields
            .get_mut(&key)
            .ok_or_else(|| EngineError::unknown_data(mesh, data))?;
        for (i, g) in indices.iter().zip(gradients.chunks_exact(width)) {
            field.gradients[i * width..(i + 1) * width].copy_from_slice(g);
        }
        Ok(())
    }
}

/// Constructs [`LoopbackEngine`]s from configuration files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackFactory;

impl EngineFactory for LoopbackFactory {
    type Engine = LoopbackEngine;

    fn construct(
        &self,
        participant: &str,
        config_path: &Path,
        rank: i32,
        size: i32,
    ) -> EngineResult<LoopbackEngine> {
        let config = LoopbackConfig::load(config_path)?;
        debug!(path = %config_path.display(), "Loaded loopback configuration");
        LoopbackEngine::new(config, participant, rank, size)
    }

    fn version_information(&self) -> String {
        format!("cosim-loopback {}", env!("CARGO_PKG_VERSION"))
    }
}
