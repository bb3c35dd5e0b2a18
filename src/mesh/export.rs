//! Index buffers and per-vertex data for renderers and exporters.
//!
//! Everything here is read-only and indexed by vertex slot, so positions
//! can be uploaded once with [`HalfEdgeMesh::points`] and the index buffers
//! refer into them directly. Combine with [`super::MeshVersion`] to decide
//! when buffers need rebuilding.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::halfedge::HalfEdgeMesh;
use super::index::{MeshIndex, VertexId};

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Corner indices of every live face, concatenated.
    ///
    /// Use [`Self::face_sizes`] to split the buffer.
    pub fn face_indices(&self) -> Vec<usize> {
        self.faces()
            .flat_map(|f| self.face_vertices(f).map(|v| v.index()))
            .collect()
    }

    /// Number of corners of every live face, in the order of
    /// [`Self::face_indices`].
    pub fn face_sizes(&self) -> Vec<usize> {
        self.faces().map(|f| self.face_size(f)).collect()
    }

    /// Triangle list with every polygon fan-split from its first corner.
    pub fn triangle_indices(&self) -> Vec<[usize; 3]> {
        let mut triangles = Vec::with_capacity(self.num_faces());
        for f in self.faces() {
            let corners: Vec<usize> = self.face_vertices(f).map(|v| v.index()).collect();
            for i in 1..corners.len().saturating_sub(1) {
                triangles.push([corners[0], corners[i], corners[i + 1]]);
            }
        }
        triangles
    }

    /// Endpoints of every live edge, source first.
    pub fn edge_indices(&self) -> Vec<[usize; 2]> {
        self.edges()
            .map(|e| {
                let h = e.halfedge();
                [self.source(h).index(), self.sink(h).index()]
            })
            .collect()
    }

    /// Endpoints of every edge with a boundary side, following the boundary
    /// orientation.
    pub fn boundary_edge_indices(&self) -> Vec<[usize; 2]> {
        self.edges()
            .filter_map(|e| {
                let h = e.halfedge();
                let b = if self.is_boundary_halfedge(h) {
                    h
                } else if self.is_boundary_halfedge(h.opposite()) {
                    h.opposite()
                } else {
                    return None;
                };
                Some([self.source(b).index(), self.sink(b).index()])
            })
            .collect()
    }

    /// Angle-weighted normal of every vertex slot (zero for isolated ones).
    ///
    /// Computed in parallel.
    pub fn vertex_normals(&self) -> Vec<Vector3<f64>> {
        (0..self.num_vertices())
            .into_par_iter()
            .map(|i| {
                let v = VertexId::new(i);
                if self.is_vertex_valid(v) {
                    self.angle_weighted_vertex_normal(v)
                } else {
                    Vector3::zeros()
                }
            })
            .collect()
    }

    /// Line segments from each live vertex along its normal, scaled by `scale`.
    pub fn vertex_normal_vectors(&self, scale: f64) -> Vec<[Point3<f64>; 2]> {
        let normals = self.vertex_normals();
        self.vertices()
            .map(|v| {
                let p = *self.position(v);
                [p, p + normals[v.index()] * scale]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;

    fn house() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.5, 2.0, 0.0),
        ];
        let polygons = vec![vec![0, 1, 2, 3], vec![3, 2, 4]];
        build_from_polygons(&vertices, &polygons).unwrap()
    }

    #[test]
    fn test_face_buffers() {
        let mesh = house();
        assert_eq!(mesh.face_indices(), vec![0, 1, 2, 3, 3, 2, 4]);
        assert_eq!(mesh.face_sizes(), vec![4, 3]);
        assert_eq!(
            mesh.triangle_indices(),
            vec![[0, 1, 2], [0, 2, 3], [3, 2, 4]]
        );
    }

    #[test]
    fn test_edge_buffers() {
        let mesh = house();
        assert_eq!(mesh.edge_indices().len(), 6);

        let boundary = mesh.boundary_edge_indices();
        assert_eq!(boundary.len(), 5);
        assert!(!boundary.contains(&[2, 3]) && !boundary.contains(&[3, 2]));
        // Boundary runs opposite to the faces.
        assert!(boundary.contains(&[1, 0]));
    }

    #[test]
    fn test_vertex_normal_vectors() {
        let mut mesh = house();
        let extra = mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));

        let normals = mesh.vertex_normals();
        assert_eq!(normals.len(), 6);
        assert_eq!(normals[extra.index()], Vector3::zeros());

        let segments = mesh.vertex_normal_vectors(2.0);
        assert_eq!(segments.len(), 5);
        for [from, to] in segments {
            assert!(((to - from) - Vector3::new(0.0, 0.0, 2.0)).norm() < 1e-10);
        }
    }
}
