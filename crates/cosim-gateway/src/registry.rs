//! Handle registry for the identifier-addressed generation
//!
//! The engine addresses meshes and data fields by name. Callers of the
//! older API hold small integer handles instead; this registry issues them
//! and resolves them back to names. It also owns edge ids, which the
//! name-addressed engine does not have.
//!
//! Ids come from one counter that lives as long as the session, while the
//! maps are cleared on destruct, so a handle issued for an earlier
//! construction never resolves again.

use std::collections::HashMap;
use std::fmt;

use cosim_core::{EngineError, VertexId};

use crate::error::{GatewayError, GatewayResult};

/// What an integer handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Mesh,
    Data,
    Edge,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Mesh => write!(f, "mesh"),
            HandleKind::Data => write!(f, "data"),
            HandleKind::Edge => write!(f, "edge"),
        }
    }
}

/// A data field bound to the mesh it was looked up on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataHandle {
    pub mesh_id: i32,
    pub mesh: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: i32,
    meshes: HashMap<i32, String>,
    mesh_ids: HashMap<String, i32>,
    data: HashMap<i32, DataHandle>,
    data_ids: HashMap<(i32, String), i32>,
    /// Edge id is the index into the mesh's list
    edges: HashMap<i32, Vec<(VertexId, VertexId)>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Handle for a mesh name; repeated lookups return the same id
    pub fn mesh_id(&mut self, name: &str) -> i32 {
        if let Some(id) = self.mesh_ids.get(name) {
            return *id;
        }
        let id = self.issue();
        self.meshes.insert(id, name.to_string());
        self.mesh_ids.insert(name.to_string(), id);
        id
    }

    /// Handle for a data field on a registered mesh
    pub fn data_id(&mut self, mesh_id: i32, name: &str) -> GatewayResult<i32> {
        let mesh = self.mesh(mesh_id)?.to_string();
        let key = (mesh_id, name.to_string());
        if let Some(id) = self.data_ids.get(&key) {
            return Ok(*id);
        }
        let id = self.issue();
        self.data.insert(
            id,
            DataHandle {
                mesh_id,
                mesh,
                data: name.to_string(),
            },
        );
        self.data_ids.insert(key, id);
        Ok(id)
    }

    /// Mesh name behind a handle
    pub fn mesh(&self, id: i32) -> GatewayResult<&str> {
        self.meshes
            .get(&id)
            .map(String::as_str)
            .ok_or(GatewayError::InvalidHandle {
                kind: HandleKind::Mesh,
                id,
            })
    }

    pub fn data(&self, id: i32) -> GatewayResult<&DataHandle> {
        self.data.get(&id).ok_or(GatewayError::InvalidHandle {
            kind: HandleKind::Data,
            id,
        })
    }

    /// Record an edge the engine accepted and return its id
    pub fn add_edge(&mut self, mesh_id: i32, first: VertexId, second: VertexId) -> i32 {
        let edges = self.edges.entry(mesh_id).or_default();
        edges.push((first, second));
        (edges.len() - 1) as i32
    }

    pub fn edge(&self, mesh_id: i32, edge_id: i32) -> GatewayResult<(VertexId, VertexId)> {
        usize::try_from(edge_id)
            .ok()
            .and_then(|i| self.edges.get(&mesh_id)?.get(i).copied())
            .ok_or(GatewayError::InvalidHandle {
                kind: HandleKind::Edge,
                id: edge_id,
            })
    }

    /// Vertices of the triangle closed by three edges
    pub fn triangle_from_edges(&self, mesh_id: i32, edges: [i32; 3]) -> GatewayResult<[VertexId; 3]> {
        let resolved = self.resolve_edges(mesh_id, &edges)?;
        let (a, b) = resolved[0];
        let third = resolved[1..]
            .iter()
            .flat_map(|(x, y)| [*x, *y])
            .find(|v| *v != a && *v != b);

        match third {
            Some(c) if a != b && closes_cycle(&resolved, &[a, b, c]) => Ok([a, b, c]),
            _ => Err(EngineError::InvalidGeometry(format!(
                "edges {:?} do not form a triangle",
                edges
            ))
            .into()),
        }
    }

    /// Vertices of the quad formed by four edges, in cycle order
    pub fn quad_from_edges(&self, mesh_id: i32, edges: [i32; 4]) -> GatewayResult<[VertexId; 4]> {
        let resolved = self.resolve_edges(mesh_id, &edges)?;
        walk_cycle(&resolved)
            .filter(|order| closes_cycle(&resolved, order))
            .ok_or_else(|| {
                EngineError::InvalidGeometry(format!("edges {:?} do not form a quad", edges)).into()
            })
    }

    fn resolve_edges(&self, mesh_id: i32, edges: &[i32]) -> GatewayResult<Vec<(VertexId, VertexId)>> {
        edges.iter().map(|e| self.edge(mesh_id, *e)).collect()
    }

    /// Forget every handle; ids already issued are not reused
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.mesh_ids.clear();
        self.data.clear();
        self.data_ids.clear();
        self.edges.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Follow four edges from the first one; `None` if the walk gets stuck
fn walk_cycle(edges: &[(VertexId, VertexId)]) -> Option<[VertexId; 4]> {
    let (start, mut current) = edges[0];
    let mut order = vec![start, current];
    let mut used = vec![false; edges.len()];
    used[0] = true;

    while order.len() < edges.len() {
        let (i, next) = edges.iter().enumerate().find_map(|(i, (x, y))| {
            if used[i] {
                None
            } else if *x == current {
                Some((i, *y))
            } else if *y == current {
                Some((i, *x))
            } else {
                None
            }
        })?;
        used[i] = true;
        order.push(next);
        current = next;
    }
    order.try_into().ok()
}

/// Whether `edges` are exactly the sides of the polygon `vertices`
fn closes_cycle(edges: &[(VertexId, VertexId)], vertices: &[VertexId]) -> bool {
    let n = vertices.len();
    let distinct = (0..n).all(|i| (i + 1..n).all(|j| vertices[i] != vertices[j]));
    if !distinct || edges.len() != n {
        return false;
    }
    let same = |(a, b): (VertexId, VertexId), (c, d): (VertexId, VertexId)| {
        (a == c && b == d) || (a == d && b == c)
    };
    let mut used = vec![false; n];
    (0..n).all(|i| {
        let side = (vertices[i], vertices[(i + 1) % n]);
        match (0..n).find(|k| !used[*k] && same(edges[*k], side)) {
            Some(k) => {
                used[k] = true;
                true
            }
            None => false,
        }
    })
}
