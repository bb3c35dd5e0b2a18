//! Error types for hemesh.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors fall into
//! three groups: bad arguments (handles that do not refer to a live element,
//! malformed polygons, out-of-range parameters), topology violations (a
//! request that would make an edge bound more than two faces), and numerical
//! failures from the sparse solvers. [`MeshError::CapacityExceeded`] marks a
//! mesh that outgrew its index type.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// The input contained no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A handle did not refer to a live element.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A polygon references a vertex slot that does not exist.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The polygon index within the batch.
        face: usize,
        /// The offending vertex index.
        vertex: usize,
    },

    /// A polygon has fewer than three vertices or repeats a vertex.
    #[error("face {face} is degenerate (fewer than three distinct vertices)")]
    DegenerateFace {
        /// The polygon index within the batch.
        face: usize,
    },

    /// The requested mutation would create non-manifold topology.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// An edge would get more than two incident faces.
    #[error("edge ({v0}, {v1}) has more than two incident faces")]
    NonManifoldEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// The mesh would need more elements than its index type can address.
    #[error("{element} capacity exceeded: {requested} requested, at most {max} addressable")]
    CapacityExceeded {
        /// Kind of element ("vertex", "halfedge" or "face").
        element: &'static str,
        /// Total count the operation needs.
        requested: usize,
        /// Largest count the index type supports.
        max: usize,
    },

    /// A sparse factorization or solve did not succeed.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// An iterative solver failed to converge.
    #[error("algorithm failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error signals a rejected non-manifold request.
    pub fn is_topology_error(&self) -> bool {
        matches!(
            self,
            MeshError::InvalidTopology(_) | MeshError::NonManifoldEdge { .. }
        )
    }

    /// Whether this error came from a linear solver.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            MeshError::NumericalFailure(_) | MeshError::ConvergenceFailed { .. }
        )
    }
}
