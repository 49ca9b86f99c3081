//! Cached orbit index.
//!
//! The half-edge table is the single source of truth for connectivity. The
//! [`Topology`] built from it answers orbit queries (face → ordered half-edges,
//! cell → faces, vertex → outgoing half-edges) in O(1). It is computed lazily
//! and dropped by every topology mutation.

use super::halfedge::Mesh;
use super::index::{CellId, EdgeId, FaceId, VertId};

/// Orbit index derived from the half-edge table.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    /// Half-edges of each face, in cycle order.
    pub(crate) face_edges: Vec<Vec<EdgeId>>,
    /// Whether each face's half-edges close into a single cycle.
    pub(crate) face_closed: Vec<bool>,
    /// Owning cell of each face (invalid on sheets).
    pub(crate) face_cell: Vec<CellId>,
    /// Faces of each cell.
    pub(crate) cell_faces: Vec<Vec<FaceId>>,
    /// Outgoing half-edges of each vertex.
    pub(crate) vert_edges: Vec<Vec<EdgeId>>,
}

impl Topology {
    /// Build the orbit index of `mesh`.
    ///
    /// Out-of-range references are skipped here; the structural validator
    /// reports them.
    pub(crate) fn build(mesh: &Mesh) -> Self {
        let nv = mesh.nv();
        let nf = mesh.nf();
        let nc = mesh.nc();

        let mut rows: Vec<Vec<EdgeId>> = vec![Vec::new(); nf];
        let mut vert_edges: Vec<Vec<EdgeId>> = vec![Vec::new(); nv];
        for e in mesh.edge_ids() {
            let f = mesh.edge_face[e.index()];
            if f.is_valid() && f.index() < nf {
                rows[f.index()].push(e);
            }
            let s = mesh.srce[e.index()];
            if s.is_valid() && s.index() < nv {
                vert_edges[s.index()].push(e);
            }
        }

        let mut face_edges = Vec::with_capacity(nf);
        let mut face_closed = Vec::with_capacity(nf);
        let mut face_cell = Vec::with_capacity(nf);
        let mut cell_faces: Vec<Vec<FaceId>> = vec![Vec::new(); nc];

        for (fi, face_rows) in rows.into_iter().enumerate() {
            let (ordered, closed) = order_cycle(&face_rows, &mesh.srce, &mesh.trgt);
            let cell = face_rows
                .first()
                .map(|e| mesh.edge_cell[e.index()])
                .unwrap_or_default();
            if cell.is_valid() && cell.index() < nc {
                cell_faces[cell.index()].push(FaceId::new(fi));
            }
            face_edges.push(ordered);
            face_closed.push(closed);
            face_cell.push(cell);
        }

        Self {
            face_edges,
            face_closed,
            face_cell,
            cell_faces,
            vert_edges,
        }
    }
}

/// Order the half-edges of one face by chaining `trgt -> srce`.
///
/// Starts from the lowest id. When the chain does not close over every row,
/// the leftovers are appended in id order and the cycle is reported open.
fn order_cycle(rows: &[EdgeId], srce: &[VertId], trgt: &[VertId]) -> (Vec<EdgeId>, bool) {
    let n = rows.len();
    if n == 0 {
        return (Vec::new(), false);
    }

    let mut used = vec![false; n];
    let mut ordered = Vec::with_capacity(n);
    let mut cur = 0;
    used[0] = true;
    ordered.push(rows[0]);

    loop {
        let t = trgt[rows[cur].index()];
        match (0..n).find(|&k| !used[k] && srce[rows[k].index()] == t) {
            Some(k) => {
                used[k] = true;
                ordered.push(rows[k]);
                cur = k;
            }
            None => break,
        }
    }

    let closed = ordered.len() == n && trgt[rows[cur].index()] == srce[rows[0].index()];
    if ordered.len() < n {
        ordered.extend((0..n).filter(|&k| !used[k]).map(|k| rows[k]));
    }
    (ordered, closed)
}
