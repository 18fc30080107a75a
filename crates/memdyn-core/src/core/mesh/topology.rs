use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum MeshError {
    #[error("Mesh has no faces")]
    Empty,

    #[error("Face {face} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    VertexOutOfBounds {
        face: usize,
        vertex: usize,
        vertex_count: usize,
    },

    #[error("Face {face} repeats a vertex: {vertices:?}")]
    RepeatedVertex { face: usize, vertices: [usize; 3] },

    #[error("Directed edge ({from}, {to}) appears in more than one face; orientation is inconsistent")]
    InconsistentOrientation { from: usize, to: usize },

    #[error("Edge ({a}, {b}) is shared by more than two faces")]
    NonManifoldEdge { a: usize, b: usize },

    #[error("Vertex {vertex} is not referenced by any face")]
    IsolatedVertex { vertex: usize },

    #[error("Expected {expected} {what}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// An undirected edge record.
///
/// `vertices` is stored as `[a, b]` with `a < b`. `faces[0]` is the face in which
/// the directed edge `a -> b` appears (so that face reads `(a, b, opposite[0])`
/// counter-clockwise) and `faces[1]` the face containing `b -> a`. Either side
/// is `None` on a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub vertices: [usize; 2],
    pub faces: [Option<usize>; 2],
    pub opposite: [Option<usize>; 2],
}

impl Edge {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.faces[0].is_none() || self.faces[1].is_none()
    }

    /// The diamond `(a, b, c, d)` around an interior edge.
    #[inline]
    pub fn diamond(&self) -> Option<[usize; 4]> {
        match (self.opposite[0], self.opposite[1]) {
            (Some(c), Some(d)) => Some([self.vertices[0], self.vertices[1], c, d]),
            _ => None,
        }
    }
}

/// Fixed connectivity of a triangulated surface.
///
/// Vertices, edges and faces live in flat arenas addressed by `usize`
/// indices; all adjacency is stored as index lists.
#[derive(Debug, Clone)]
pub struct MeshTopology {
    vertex_count: usize,
    faces: Vec<[usize; 3]>,
    edges: Vec<Edge>,
    face_edges: Vec<[usize; 3]>,
    vertex_faces: Vec<Vec<usize>>,
    vertex_edges: Vec<Vec<usize>>,
    boundary_vertices: Vec<bool>,
}

impl MeshTopology {
    /// Builds the arena from counter-clockwise oriented faces.
    pub fn new(vertex_count: usize, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if faces.is_empty() {
            return Err(MeshError::Empty);
        }

        let mut undirected: HashMap<(usize, usize), usize> = HashMap::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut face_edges = Vec::with_capacity(faces.len());
        let mut vertex_faces = vec![Vec::new(); vertex_count];
        let mut vertex_edges = vec![Vec::new(); vertex_count];

        for (face_idx, face) in faces.iter().enumerate() {
            for &v in face {
                if v >= vertex_count {
                    return Err(MeshError::VertexOutOfBounds {
                        face: face_idx,
                        vertex: v,
                        vertex_count,
                    });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::RepeatedVertex {
                    face: face_idx,
                    vertices: *face,
                });
            }

            let mut local_edges = [0usize; 3];
            for k in 0..3 {
                // Edge k is the one opposite corner k.
                let from = face[(k + 1) % 3];
                let to = face[(k + 2) % 3];
                let opposite = face[k];

                let key = (from.min(to), from.max(to));
                let side = if from < to { 0 } else { 1 };
                let edge_idx = match undirected.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = edges.len();
                        edges.push(Edge {
                            vertices: [key.0, key.1],
                            faces: [None, None],
                            opposite: [None, None],
                        });
                        undirected.insert(key, idx);
                        vertex_edges[key.0].push(idx);
                        vertex_edges[key.1].push(idx);
                        idx
                    }
                };

                let edge = &mut edges[edge_idx];
                if edge.faces[0].is_some() && edge.faces[1].is_some() {
                    return Err(MeshError::NonManifoldEdge { a: key.0, b: key.1 });
                }
                if edge.faces[side].is_some() {
                    return Err(MeshError::InconsistentOrientation { from, to });
                }
                edge.faces[side] = Some(face_idx);
                edge.opposite[side] = Some(opposite);
                local_edges[k] = edge_idx;
            }

            face_edges.push(local_edges);
            for &v in face {
                vertex_faces[v].push(face_idx);
            }
        }

        if let Some(vertex) = vertex_faces.iter().position(Vec::is_empty) {
            return Err(MeshError::IsolatedVertex { vertex });
        }

        let mut boundary_vertices = vec![false; vertex_count];
        for edge in edges.iter().filter(|e| e.is_boundary()) {
            boundary_vertices[edge.vertices[0]] = true;
            boundary_vertices[edge.vertices[1]] = true;
        }

        Ok(Self {
            vertex_count,
            faces,
            edges,
            face_edges,
            vertex_faces,
            vertex_edges,
            boundary_vertices,
        })
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edge indices of a face; entry `k` is the edge opposite corner `k`.
    #[inline]
    pub fn face_edges(&self, face: usize) -> &[usize; 3] {
        &self.face_edges[face]
    }

    #[inline]
    pub fn vertex_faces(&self, vertex: usize) -> &[usize] {
        &self.vertex_faces[vertex]
    }

    #[inline]
    pub fn vertex_edges(&self, vertex: usize) -> &[usize] {
        &self.vertex_edges[vertex]
    }

    #[inline]
    pub fn is_boundary_vertex(&self, vertex: usize) -> bool {
        self.boundary_vertices[vertex]
    }

    pub fn is_closed(&self) -> bool {
        self.edges.iter().all(|e| !e.is_boundary())
    }

    pub fn euler_characteristic(&self) -> i64 {
        self.vertex_count as i64 - self.edges.len() as i64 + self.faces.len() as i64
    }
}
