use crate::utils::error::MeshError;

pub type Position = [f32; 3];
pub type Rgba = [f32; 4];

/// One flat-colored quad, corners in counter-clockwise order.
pub type Face = ([Position; 4], Rgba);

const CUBE_FACES: [Face; 6] = [
    // Front
    (
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
        [1.0, 1.0, 1.0, 1.0],
    ),
    // Back
    (
        [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
        [1.0, 0.0, 0.0, 1.0],
    ),
    // Top
    (
        [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
        [0.0, 1.0, 0.0, 1.0],
    ),
    // Bottom
    (
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
        [0.0, 0.0, 1.0, 1.0],
    ),
    // Right
    (
        [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
        [1.0, 1.0, 0.0, 1.0],
    ),
    // Left
    (
        [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
        [1.0, 0.0, 1.0, 1.0],
    ),
];

/// Indexed triangle mesh with one color per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<Position>,
    pub colors: Vec<Rgba>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mesh from quads, replicating each face color across its four
    /// corners and splitting every quad into two triangles.
    pub fn from_faces(faces: &[Face]) -> Self {
        let mut mesh = Self::new();
        for (corners, color) in faces {
            let base = mesh.positions.len() as u16;
            mesh.positions.extend_from_slice(corners);
            mesh.colors.extend(std::iter::repeat(*color).take(corners.len()));
            mesh.indices
                .extend([0u16, 1, 2, 0, 2, 3].iter().map(|i| base + i));
        }
        mesh
    }

    /// The 24-vertex, 36-index cube with six flat-colored faces.
    pub fn cube() -> Self {
        Self::from_faces(&CUBE_FACES)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.vertex_count();
        if vertex_count > u16::MAX as usize + 1 {
            return Err(MeshError::TooManyVertices(vertex_count));
        }
        if self.colors.len() != vertex_count {
            return Err(MeshError::ColorCountMismatch {
                positions: vertex_count,
                colors: self.colors.len(),
            });
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IncompleteTriangle(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_satisfies_mesh_invariant() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.index_count() % 3, 0);
        assert!(cube.indices.iter().all(|&i| (i as usize) < 24));
        assert_eq!(cube.validate(), Ok(()));
    }

    #[test]
    fn face_color_is_replicated_per_vertex() {
        let cube = Mesh::cube();
        assert_eq!(cube.colors.len(), cube.positions.len());
        for face in cube.colors.chunks(4) {
            assert!(face.iter().all(|c| *c == face[0]));
        }
        assert_eq!(cube.colors[0], [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(cube.colors[4], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let cube = Mesh::cube();
        assert_eq!(&cube.indices[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&cube.indices[30..], &[20, 21, 22, 20, 22, 23]);
    }

    #[test]
    fn validate_rejects_broken_meshes() {
        let mut mesh = Mesh::cube();
        mesh.indices.pop();
        assert_eq!(mesh.validate(), Err(MeshError::IncompleteTriangle(35)));

        let mut mesh = Mesh::cube();
        mesh.indices[5] = 24;
        assert_eq!(
            mesh.validate(),
            Err(MeshError::IndexOutOfRange {
                index: 24,
                vertex_count: 24
            })
        );

        let mut mesh = Mesh::cube();
        mesh.colors.pop();
        assert!(matches!(
            mesh.validate(),
            Err(MeshError::ColorCountMismatch { .. })
        ));
    }
}
