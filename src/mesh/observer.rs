//! Change notification for mesh collaborators.
//!
//! Two mechanisms are offered:
//!
//! - [`MeshVersion`]: a pair of counters bumped by every topology or geometry
//!   mutation. Render caches and similar consumers keep a snapshot and compare
//!   it with [`MeshVersion::changed_since`] instead of being pushed updates.
//! - Listeners: boxed callbacks registered with [`HalfEdgeMesh::subscribe`]
//!   that receive a [`GeometryEvent`] for every vertex insertion, move,
//!   removal and clear. This is the hook for spatial indices.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use hemesh::mesh::{GeometryEvent, HalfEdgeMesh};
//! use nalgebra::Point3;
//!
//! let seen = Arc::new(Mutex::new(0));
//! let counter = Arc::clone(&seen);
//!
//! let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
//! let id = mesh.subscribe(move |event| {
//!     if let GeometryEvent::VertexAdded { .. } = event {
//!         *counter.lock().unwrap() += 1;
//!     }
//! });
//!
//! mesh.add_vertex(Point3::origin());
//! mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! mesh.unsubscribe(id);
//! mesh.add_vertex(Point3::new(2.0, 0.0, 0.0));
//!
//! assert_eq!(*seen.lock().unwrap(), 2);
//! ```

use std::fmt;

use nalgebra::Point3;

use super::halfedge::HalfEdgeMesh;
use super::index::{MeshIndex, VertexId};

/// A geometry change delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryEvent<I: MeshIndex = u32> {
    /// A vertex was appended. Sent after insertion.
    VertexAdded {
        /// The new vertex.
        vertex: VertexId<I>,
        /// Its position.
        position: Point3<f64>,
    },
    /// A vertex is about to move. Sent before the position is written, so
    /// the old position is still readable from the mesh.
    VertexWillMove {
        /// The vertex being moved.
        vertex: VertexId<I>,
        /// Its current position.
        from: Point3<f64>,
        /// The position it is moving to.
        to: Point3<f64>,
    },
    /// A vertex is about to lose all of its edges. Sent before removal.
    VertexWillBeRemoved {
        /// The vertex being removed.
        vertex: VertexId<I>,
    },
    /// Every element was dropped. Sent after the clear.
    VerticesCleared,
}

/// Token identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Modification counters.
///
/// `topology` counts connectivity mutations, `geometry` counts position
/// writes. Adding a vertex bumps both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshVersion {
    /// Number of topology mutations so far.
    pub topology: u64,
    /// Number of geometry mutations so far.
    pub geometry: u64,
}

impl MeshVersion {
    /// Whether anything changed since `earlier` was taken.
    pub fn changed_since(&self, earlier: &MeshVersion) -> bool {
        self != earlier
    }

    /// Whether connectivity changed since `earlier` was taken.
    pub fn topology_changed_since(&self, earlier: &MeshVersion) -> bool {
        self.topology != earlier.topology
    }

    /// Whether positions changed since `earlier` was taken.
    pub fn geometry_changed_since(&self, earlier: &MeshVersion) -> bool {
        self.geometry != earlier.geometry
    }
}

type Callback<I> = Box<dyn FnMut(&GeometryEvent<I>) + Send + Sync>;

/// Registered listeners of one mesh.
///
/// Cloning a mesh does not clone its listeners.
pub(crate) struct Listeners<I: MeshIndex> {
    entries: Vec<(ListenerId, Callback<I>)>,
    next_id: u64,
}

impl<I: MeshIndex> Listeners<I> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, callback: Callback<I>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn notify(&mut self, event: &GeometryEvent<I>) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<I: MeshIndex> Clone for Listeners<I> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> fmt::Debug for Listeners<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    // ==================== Change Tracking ====================

    /// Current modification counters.
    #[inline]
    pub fn version(&self) -> MeshVersion {
        self.version
    }

    /// Register a callback for geometry events.
    ///
    /// Callbacks run synchronously inside the mutating call and cannot touch
    /// the mesh themselves.
    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(&GeometryEvent<I>) + Send + Sync + 'static,
    {
        self.listeners.insert(Box::new(callback))
    }

    /// Remove a previously registered callback.
    ///
    /// Returns `false` if the id was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of registered callbacks.
    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn notify(&mut self, event: GeometryEvent<I>) {
        self.listeners.notify(&event);
    }

    pub(crate) fn touch_topology(&mut self) {
        self.version.topology += 1;
    }

    pub(crate) fn touch_geometry(&mut self) {
        self.version.geometry += 1;
    }
}
