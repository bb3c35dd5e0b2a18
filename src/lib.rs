//! # hemesh
//!
//! A half-edge mesh connectivity kernel with subdivision surfaces and
//! discrete differential operators.
//!
//! hemesh stores polygon meshes as twin-paired halfedges with a typed
//! property store, supports incremental editing (add and remove faces,
//! edges and vertices) with manifold checks, and builds Loop and
//! Catmull-Clark subdivision, cotangent Laplacians and implicit mean
//! curvature flow on top of it.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Custom properties**: typed per-vertex, per-halfedge and per-face data
//! - **Change tracking**: version counters and geometry listeners
//! - **Subdivision**: Loop and Catmull-Clark, optionally parallel
//! - **Discrete exterior calculus**: Hodge stars, `d0`, Laplacian, curvature flow
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use hemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! // Define vertices and faces
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! // Build the mesh
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.num_faces(), 4);
//! assert!(mesh.is_closed());
//! ```
//!
//! ## Incremental Editing
//!
//! ```
//! use hemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
//! let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
//!
//! let f = mesh.add_face(&[a, b, c]).unwrap();
//! assert_eq!(mesh.face_size(f), 3);
//!
//! mesh.remove_face(f).unwrap();
//! assert_eq!(mesh.faces().count(), 0);
//! ```
//!
//! ## Mesh Traversal
//!
//! The half-edge structure enables efficient traversal of mesh elements:
//!
//! ```
//! use hemesh::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! # let faces = vec![[0, 1, 2]];
//! # let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! // Iterate over neighbors of a vertex
//! let v = VertexId::new(0);
//! for neighbor in mesh.vertex_neighbors(v) {
//!     println!("Neighbor: {:?}", neighbor);
//! }
//!
//! // Iterate over faces around a vertex
//! for face in mesh.vertex_faces(v) {
//!     println!("Adjacent face: {:?}", face);
//! }
//!
//! // Get vertices of a face
//! let corners: Vec<_> = mesh.face_vertices(FaceId::new(0)).collect();
//! assert_eq!(corners.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use hemesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex, EdgeId,
        FaceId, GeometryEvent, HalfEdgeId, HalfEdgeMesh, MeshIndex, MeshVersion, PropertyHandle,
        VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.num_faces(), 4);
        // Closed: every halfedge has a face
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());

        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v), "vertex {:?} should not be on boundary", v);
        }
    }

    #[test]
    fn test_single_quad_boundary() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_quads(&vertices, &[[0, 1, 2, 3]]).unwrap();

        let boundary = mesh
            .edges()
            .filter(|e| mesh.is_boundary_edge(e.halfedge()))
            .count();
        assert_eq!(boundary, 4);
        assert_eq!(mesh.edges().count() - boundary, 0);
        for e in mesh.edges() {
            let h = e.halfedge();
            // Exactly one side is boundary.
            assert!(mesh.is_boundary_halfedge(h) != mesh.is_boundary_halfedge(h.opposite()));
        }
    }
}
