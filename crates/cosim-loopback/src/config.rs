//! Loopback engine configuration
//!
//! This is the file a host passes as the configuration path at construct.
//! TOML and YAML are accepted, chosen by file extension.

use std::collections::HashSet;
use std::path::Path;

use cosim_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Complete loopback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// The only participant allowed to construct an interface
    pub participant: String,

    /// Spatial dimensionality (2 or 3)
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_time_window_size")]
    pub time_window_size: f64,

    /// Coupling ends once this time is reached
    #[serde(default = "default_max_time")]
    pub max_time: f64,

    /// Iterations per window; 1 is explicit coupling, more is implicit with checkpoints
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Whether the solver has to provide data before `initialize`
    #[serde(default)]
    pub initial_data: bool,

    #[serde(default)]
    pub meshes: Vec<MeshConfig>,

    #[serde(default)]
    pub data: Vec<DataConfig>,
}

fn default_dimensions() -> usize {
    3
}

fn default_time_window_size() -> f64 {
    0.1
}

fn default_max_time() -> f64 {
    1.0
}

fn default_max_iterations() -> u32 {
    1
}

/// Mesh definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub name: String,

    /// Overrides the global dimensionality
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Whether the engine wants edges and faces for this mesh
    #[serde(default)]
    pub connectivity: bool,

    /// Received mesh whose vertices the solver accesses directly
    #[serde(default)]
    pub direct_access: bool,

    /// Vertices a peer provides for a direct-access mesh
    #[serde(default)]
    pub provided_vertices: Vec<Vec<f64>>,
}

/// Data field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub name: String,
    pub mesh: String,

    /// 1 for scalar data, more for vector data
    #[serde(default = "default_data_dimensions")]
    pub dimensions: usize,

    /// Whether gradient data is requested for this field
    #[serde(default)]
    pub gradient: bool,
}

fn default_data_dimensions() -> usize {
    1
}

impl LoopbackConfig {
    /// Load a configuration file, picking the format from its extension
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(EngineError::Config(format!(
                "unsupported configuration format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(s: &str) -> EngineResult<Self> {
        let config: Self =
            serde_yaml::from_str(s).map_err(|e| EngineError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Dimensionality of a mesh
    pub fn mesh_dimensions(&self, mesh: &MeshConfig) -> usize {
        mesh.dimensions.unwrap_or(self.dimensions)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| Err(EngineError::Config(msg));

        if !matches!(self.dimensions, 2 | 3) {
            return invalid(format!("dimensions must be 2 or 3, got {}", self.dimensions));
        }
        if self.time_window_size.is_nan() || self.time_window_size <= 0.0 {
            return invalid(format!(
                "time_window_size must be positive, got {}",
                self.time_window_size
            ));
        }
        if self.max_time.is_nan() || self.max_time <= 0.0 {
            return invalid(format!("max_time must be positive, got {}", self.max_time));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }

        let mut meshes = HashSet::new();
        for mesh in &self.meshes {
            if !meshes.insert(mesh.name.as_str()) {
                return invalid(format!("duplicate mesh \"{}\"", mesh.name));
            }
            let dim = self.mesh_dimensions(mesh);
            if !matches!(dim, 2 | 3) {
                return invalid(format!("mesh \"{}\" has dimension {}", mesh.name, dim));
            }
            if !mesh.direct_access && !mesh.provided_vertices.is_empty() {
                return invalid(format!(
                    "mesh \"{}\" provides vertices but is not direct_access",
                    mesh.name
                ));
            }
            if let Some(v) = mesh.provided_vertices.iter().find(|v| v.len() != dim) {
                return invalid(format!(
                    "provided vertex {:?} of mesh \"{}\" is not {}-D",
                    v, mesh.name, dim
                ));
            }
        }

        let mut fields = HashSet::new();
        for data in &self.data {
            if !meshes.contains(data.mesh.as_str()) {
                return invalid(format!(
                    "data \"{}\" refers to unknown mesh \"{}\"",
                    data.name, data.mesh
                ));
            }
            if !fields.insert((data.mesh.as_str(), data.name.as_str())) {
                return invalid(format!(
                    "duplicate data \"{}\" on mesh \"{}\"",
                    data.name, data.mesh
                ));
            }
            if data.dimensions == 0 {
                return invalid(format!("data \"{}\" has dimension 0", data.name));
            }
        }
        Ok(())
    }
}
