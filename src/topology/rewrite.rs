//! Rewrite plans for topology transitions.
//!
//! A transition describes its effect as a [`Rewrite`]: vertices to append or
//! move, new vertex cycles for existing faces, new faces and cells, and rows to
//! drop. [`Rewrite::apply`] turns the plan into half-edge rows, prunes whatever
//! the plan left unused and compacts the tables.

use std::collections::HashMap;

use nalgebra::Point3;

use super::Transition;
use crate::mesh::{CellId, EdgeId, FaceId, Mesh, Removal, Segment, VertId};

/// A vertex of a rewritten cycle: an existing row or the n-th appended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum VRef {
    Old(VertId),
    New(usize),
}

/// An existing cell or the n-th appended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellRef {
    Old(CellId),
    New(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct NewFace {
    /// Owning cell, `None` on sheets.
    pub cell: Option<CellRef>,
    pub segment: Segment,
    /// Face whose attributes (and half-edge attributes) are copied.
    pub template: FaceId,
    pub cycle: Vec<VRef>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Rewrite {
    new_verts: Vec<(Point3<f64>, VertId)>,
    moves: Vec<(VertId, Point3<f64>)>,
    cycles: Vec<(FaceId, Vec<VRef>)>,
    new_cells: Vec<CellId>,
    new_faces: Vec<NewFace>,
    reassign: Vec<(FaceId, CellRef)>,
    removed_faces: Vec<FaceId>,
    removed_cells: Vec<CellId>,
}

impl Rewrite {
    /// Append a vertex copying the attributes of `template`.
    pub(crate) fn new_vertex(&mut self, pos: Point3<f64>, template: VertId) -> VRef {
        self.new_verts.push((pos, template));
        VRef::New(self.new_verts.len() - 1)
    }

    pub(crate) fn move_vertex(&mut self, v: VertId, pos: Point3<f64>) {
        self.moves.push((v, pos));
    }

    /// Replace the vertex cycle of an existing face.
    pub(crate) fn set_cycle(&mut self, face: FaceId, cycle: Vec<VRef>) {
        self.cycles.push((face, cycle));
    }

    /// Append a cell copying the attributes of `template`.
    pub(crate) fn new_cell(&mut self, template: CellId) -> CellRef {
        self.new_cells.push(template);
        CellRef::New(self.new_cells.len() - 1)
    }

    pub(crate) fn new_face(&mut self, face: NewFace) {
        self.new_faces.push(face);
    }

    /// Move a whole face to another cell.
    pub(crate) fn reassign(&mut self, face: FaceId, cell: CellRef) {
        self.reassign.push((face, cell));
    }

    pub(crate) fn remove_face(&mut self, face: FaceId) {
        self.removed_faces.push(face);
    }

    pub(crate) fn remove_cell(&mut self, cell: CellId) {
        self.removed_cells.push(cell);
    }

    /// Write the plan into `mesh` and compact it.
    ///
    /// Half-edges of a rewritten cycle keep their row (and attributes) when
    /// the same directed pair survives. Faces left without half-edges, cells
    /// left without faces and vertices left without half-edges are dropped.
    pub(crate) fn apply(self, mesh: &mut Mesh) -> Transition {
        let prev = mesh.counts();
        let snapshot = mesh.topology();
        let face_edges = snapshot.face_edges.clone();
        let face_cell = snapshot.face_cell.clone();

        let new_verts: Vec<VertId> = self
            .new_verts
            .iter()
            .map(|&(pos, template)| mesh.push_vertex_like(template, pos))
            .collect();
        let new_cells: Vec<CellId> = self
            .new_cells
            .iter()
            .map(|&template| mesh.push_cell(Some(template)))
            .collect();
        for &(v, pos) in &self.moves {
            mesh.set_position(v, pos);
        }

        let vert = |r: VRef| match r {
            VRef::Old(v) => v,
            VRef::New(i) => new_verts[i],
        };
        let cell_of = |r: CellRef| match r {
            CellRef::Old(c) => c,
            CellRef::New(i) => new_cells[i],
        };

        let mut dead: Vec<EdgeId> = Vec::new();
        let mut created_edges: Vec<EdgeId> = Vec::new();

        for (face, cycle) in &self.cycles {
            let old = &face_edges[face.index()];
            let cell = face_cell[face.index()];
            let mut kept: HashMap<(VertId, VertId), EdgeId> = old
                .iter()
                .map(|&e| ((mesh.srce(e), mesh.trgt(e)), e))
                .collect();

            let verts: Vec<VertId> = cycle.iter().map(|&r| vert(r)).collect();
            for (s, t) in pairs(&verts) {
                if kept.remove(&(s, t)).is_some() {
                    continue;
                }
                let template = old
                    .iter()
                    .find(|&&e| mesh.srce(e) == s)
                    .or_else(|| old.iter().find(|&&e| mesh.trgt(e) == t))
                    .or(old.first())
                    .copied();
                created_edges.push(mesh.push_edge(s, t, *face, cell, template));
            }
            dead.extend(kept.into_values());
        }

        let mut created_faces: Vec<FaceId> = Vec::with_capacity(self.new_faces.len());
        for new in &self.new_faces {
            let face = mesh.push_face(new.segment, Some(new.template));
            let cell = new.cell.map_or(CellId::invalid(), cell_of);
            let source = &face_edges[new.template.index()];
            let verts: Vec<VertId> = new.cycle.iter().map(|&r| vert(r)).collect();
            for (s, t) in pairs(&verts) {
                let template = source
                    .iter()
                    .find(|&&e| mesh.srce(e) == s)
                    .or(source.first())
                    .copied();
                created_edges.push(mesh.push_edge(s, t, face, cell, template));
            }
            created_faces.push(face);
        }

        if !self.reassign.is_empty() {
            let target: HashMap<FaceId, CellId> = self
                .reassign
                .iter()
                .map(|&(f, c)| (f, cell_of(c)))
                .collect();
            for e in 0..mesh.ne() {
                if let Some(&c) = target.get(&mesh.edge_face[e]) {
                    mesh.edge_cell[e] = c;
                }
            }
        }

        let mut removal = Removal::for_counts(mesh.counts());
        for e in dead {
            removal.edges[e.index()] = true;
        }
        for f in &self.removed_faces {
            removal.faces[f.index()] = true;
            for e in &face_edges[f.index()] {
                removal.edges[e.index()] = true;
            }
        }
        for c in &self.removed_cells {
            removal.cells[c.index()] = true;
        }
        prune(mesh, &mut removal);

        let remaps = mesh.compact(&removal);

        let touched: Vec<VertId> = new_verts
            .iter()
            .copied()
            .chain(self.moves.iter().map(|&(v, _)| v))
            .filter_map(|v| remaps.verts.get(v.index()).map(VertId::new))
            .collect();
        if mesh.has_segments() {
            for &v in &touched {
                let segment = vertex_segment(mesh, v);
                mesh.set_vert_segment(v, segment);
            }
        }

        Transition {
            prev,
            verts: new_verts
                .iter()
                .filter_map(|v| remaps.verts.get(v.index()).map(VertId::new))
                .collect(),
            edges: created_edges
                .iter()
                .filter_map(|e| remaps.edges.get(e.index()).map(EdgeId::new))
                .collect(),
            faces: created_faces
                .iter()
                .filter_map(|f| remaps.faces.get(f.index()).map(FaceId::new))
                .collect(),
            cells: new_cells
                .iter()
                .filter_map(|c| remaps.cells.get(c.index()).map(CellId::new))
                .collect(),
        }
    }
}

/// Consecutive pairs of a closed cycle.
pub(crate) fn pairs<T: Copy>(cycle: &[T]) -> impl Iterator<Item = (T, T)> + '_ {
    let n = cycle.len();
    (0..n).map(move |i| (cycle[i], cycle[(i + 1) % n]))
}

/// Flag rows no surviving half-edge refers to.
fn prune(mesh: &Mesh, removal: &mut Removal) {
    let mut face_used = vec![false; mesh.nf()];
    let mut cell_used = vec![false; mesh.nc()];
    let mut vert_used = vec![false; mesh.nv()];

    for e in 0..mesh.ne() {
        if removal.edges[e] {
            continue;
        }
        face_used[mesh.edge_face[e].index()] = true;
        if mesh.edge_cell[e].is_valid() {
            cell_used[mesh.edge_cell[e].index()] = true;
        }
        vert_used[mesh.srce[e].index()] = true;
        vert_used[mesh.trgt[e].index()] = true;
    }

    for (flag, used) in removal.faces.iter_mut().zip(face_used) {
        *flag |= !used;
    }
    for (flag, used) in removal.cells.iter_mut().zip(cell_used) {
        *flag |= !used;
    }
    for (flag, used) in removal.verts.iter_mut().zip(vert_used) {
        *flag |= !used;
    }
}

/// Segment of a vertex from the faces around it: apical wins over basal,
/// which wins over lateral.
fn vertex_segment(mesh: &Mesh, v: VertId) -> Segment {
    let faces = mesh.vert_faces(v);
    let has = |seg: Segment| faces.iter().any(|&f| mesh.face_segment(f) == seg);
    if has(Segment::Apical) {
        Segment::Apical
    } else if has(Segment::Basal) {
        Segment::Basal
    } else {
        Segment::Lateral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{generation, MeshKind};

    #[test]
    fn test_identity_rewrite_keeps_rows() {
        let mut mesh = generation::hexagonal_sheet(2, 2).unwrap();
        let before = mesh.clone();
        let report = Rewrite::default().apply(&mut mesh);

        assert_eq!(report.prev, before.counts());
        assert_eq!(mesh.counts(), before.counts());
        assert!(report.verts.is_empty() && report.edges.is_empty());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_same_cycle_reuses_half_edges() {
        let mut mesh = generation::three_faces_sheet().unwrap();
        let face = FaceId::new(0);
        let cycle = mesh.face_verts(face).into_iter().map(VRef::Old).collect();

        let mut plan = Rewrite::default();
        plan.set_cycle(face, cycle);
        let report = plan.apply(&mut mesh);

        assert!(report.edges.is_empty());
        assert_eq!(mesh.counts(), report.prev);
    }

    #[test]
    fn test_removing_a_face_prunes_orphans() {
        let mut mesh = generation::square_pair().unwrap();
        assert_eq!(mesh.kind(), MeshKind::Planar);

        let mut plan = Rewrite::default();
        plan.remove_face(FaceId::new(1));
        let report = plan.apply(&mut mesh);

        assert_eq!(report.prev.nv, 6);
        assert_eq!(mesh.nf(), 1);
        assert_eq!(mesh.nv(), 4);
        assert_eq!(mesh.ne(), 4);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_pairs_wraps_around() {
        let got: Vec<_> = pairs(&[1, 2, 3]).collect();
        assert_eq!(got, vec![(1, 2), (2, 3), (3, 1)]);
    }
}
