/// Indexed triangle meshes
use image::Rgb;
use nalgebra::Vector4;

use crate::error::{RenderError, Result};

/// A mesh vertex: homogeneous position and color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector4<f32>,
    pub color: Rgb<u8>,
}

impl Vertex {
    pub fn new(position: Vector4<f32>, color: Rgb<u8>) -> Self {
        Self { position, color }
    }

    /// Vertex at the cartesian point `(x, y, z)` (`w = 1`).
    pub fn from_xyz(x: f32, y: f32, z: f32, color: Rgb<u8>) -> Self {
        Self::new(Vector4::new(x, y, z, 1.0), color)
    }
}

/// Index triple into [`Mesh::vertices`].
pub type Face = [usize; 3];

/// Immutable vertex buffer plus face list.
///
/// Every face index is checked against the vertex count at construction.
/// Faces that repeat an index are legal; the rasterizer skips them.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Result<Self> {
        let vertex_count = vertices.len();
        for (face_index, face) in faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&index| index >= vertex_count) {
                return Err(RenderError::FaceIndexOutOfRange {
                    face: face_index,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(Self { vertices, faces })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Axis-aligned cube of edge length `size` centered at the origin, every
    /// face wound counter-clockwise when seen from outside.
    pub fn cube(size: f32, color: Rgb<u8>) -> Self {
        let half = size / 2.0;
        let vertices = vec![
            Vertex::from_xyz(-half, -half, half, color),
            Vertex::from_xyz(half, -half, half, color),
            Vertex::from_xyz(half, half, half, color),
            Vertex::from_xyz(-half, half, half, color),
            Vertex::from_xyz(-half, -half, -half, color),
            Vertex::from_xyz(half, -half, -half, color),
            Vertex::from_xyz(half, half, -half, color),
            Vertex::from_xyz(-half, half, -half, color),
        ];
        let faces = vec![
            // Front
            [0, 1, 2],
            [0, 2, 3],
            // Back
            [5, 4, 7],
            [5, 7, 6],
            // Top
            [3, 2, 6],
            [3, 6, 7],
            // Bottom
            [4, 5, 1],
            [4, 1, 0],
            // Right
            [1, 5, 6],
            [1, 6, 2],
            // Left
            [4, 0, 3],
            [4, 3, 7],
        ];
        Self { vertices, faces }
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }
}

/// A face is degenerate when two of its corners share a vertex index.
pub fn is_degenerate(face: &Face) -> bool {
    face[0] == face[1] || face[1] == face[2] || face[0] == face[2]
}
