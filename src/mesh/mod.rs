//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation and related types
//! for representing and manipulating polygon meshes.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], which represents a polygon mesh
//! using a half-edge (doubly-connected edge list) data structure. This
//! representation provides O(1) adjacency queries and supports incremental
//! insertion and removal of faces, edges and vertices.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge (a twin pair of half-edges)
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Properties
//!
//! Per-element data lives in [`Property`] arrays. Custom data can be attached
//! with [`HalfEdgeMesh::add_vertex_property`] and its halfedge and face
//! counterparts; the arrays grow with the mesh.
//!
//! # Construction
//!
//! Meshes are built incrementally with [`HalfEdgeMesh::add_face`], or in one
//! pass from face-vertex lists:
//!
//! ```
//! use hemesh::mesh::{HalfEdgeMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
mod edit;
mod export;
mod halfedge;
mod index;
mod observer;
mod property;
mod traverse;

pub use builder::{
    build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex, AddFacesReport,
};
pub use halfedge::{FaceAdjacency, HalfEdgeAdjacency, HalfEdgeMesh, VertexAdjacency};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use observer::{GeometryEvent, ListenerId, MeshVersion};
pub use property::{ErasedProperty, Property, PropertyHandle, PropertySet};
pub use traverse::{EdgeIter, FaceCirculator, FaceIter, VertexCirculator, VertexIter};
