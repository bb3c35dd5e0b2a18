//! Mesh processing algorithms.
//!
//! - **Subdivision**: Loop subdivision, Catmull-Clark subdivision
//! - **Transforms**: orientation reversal, translation, dual, triangulation, merging
//! - **Discrete exterior calculus**: Hodge stars, exterior derivative,
//!   cotangent Laplacian, mean curvature normals and flow
//! - **Sparse linear algebra**: CSR matrices, conjugate gradient, envelope Cholesky

pub mod dec;
pub mod progress;
pub mod sparse;
pub mod subdivide;
pub mod transform;

pub use progress::Progress;
