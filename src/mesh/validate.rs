//! Structural validator.
//!
//! Checks the invariants every public mutation must preserve: consistent row
//! counts, in-range references, closed face cycles, involutive opposites and
//! no orphaned vertices. Transitions run it on their candidate mesh before
//! committing.

use std::collections::HashSet;
use std::fmt;

use super::halfedge::{Mesh, MeshKind};
use super::index::{CellId, EdgeId, FaceId, VertId};

/// One broken structural invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// A column does not have one entry per row.
    ColumnLength {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
    /// A half-edge references a vertex that does not exist.
    DanglingVertex {
        /// The half-edge.
        edge: EdgeId,
    },
    /// A half-edge references a face that does not exist.
    DanglingFace {
        /// The half-edge.
        edge: EdgeId,
    },
    /// A bulk half-edge has no valid cell, or a sheet half-edge has one.
    DanglingCell {
        /// The half-edge.
        edge: EdgeId,
    },
    /// A half-edge joins a vertex to itself.
    Loop {
        /// The half-edge.
        edge: EdgeId,
    },
    /// Two half-edges share source, target (and cell in bulk meshes).
    DuplicateHalfEdge {
        /// The second occurrence.
        edge: EdgeId,
    },
    /// The stored opposite differs from the one implied by the table.
    StaleOpposite {
        /// The half-edge.
        edge: EdgeId,
    },
    /// `opp(opp(e)) != e` or the opposite is not reversed.
    OppositeMismatch {
        /// The half-edge.
        edge: EdgeId,
    },
    /// A face's half-edges do not close into a single cycle.
    BrokenCycle {
        /// The face.
        face: FaceId,
    },
    /// A face has fewer than three sides.
    TooFewSides {
        /// The face.
        face: FaceId,
        /// Its number of sides.
        sides: usize,
    },
    /// A face visits the same vertex twice.
    RepeatedVertex {
        /// The face.
        face: FaceId,
        /// The repeated vertex.
        vert: VertId,
    },
    /// A face's half-edges belong to different cells.
    MixedCells {
        /// The face.
        face: FaceId,
    },
    /// A bulk cell owns no face.
    EmptyCell {
        /// The cell.
        cell: CellId,
    },
    /// A vertex is not used by any half-edge.
    OrphanVertex {
        /// The vertex.
        vert: VertId,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ColumnLength {
                table,
                column,
                expected,
                found,
            } => write!(f, "{table}.{column} has {found} rows, expected {expected}"),
            Violation::DanglingVertex { edge } => write!(f, "{edge:?} references a missing vertex"),
            Violation::DanglingFace { edge } => write!(f, "{edge:?} references a missing face"),
            Violation::DanglingCell { edge } => write!(f, "{edge:?} has an inconsistent cell"),
            Violation::Loop { edge } => write!(f, "{edge:?} joins a vertex to itself"),
            Violation::DuplicateHalfEdge { edge } => write!(f, "{edge:?} duplicates another half-edge"),
            Violation::StaleOpposite { edge } => write!(f, "{edge:?} has a stale opposite"),
            Violation::OppositeMismatch { edge } => write!(f, "{edge:?} opposite is not an involution"),
            Violation::BrokenCycle { face } => write!(f, "{face:?} is not a closed cycle"),
            Violation::TooFewSides { face, sides } => write!(f, "{face:?} has {sides} sides"),
            Violation::RepeatedVertex { face, vert } => write!(f, "{face:?} visits {vert:?} twice"),
            Violation::MixedCells { face } => write!(f, "{face:?} spans several cells"),
            Violation::EmptyCell { cell } => write!(f, "{cell:?} has no face"),
            Violation::OrphanVertex { vert } => write!(f, "{vert:?} has no half-edge"),
        }
    }
}

impl Mesh {
    /// Check every structural invariant, returning the violations found.
    pub fn validate(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        self.check_columns(&mut out);
        if !out.is_empty() {
            // row-level checks would index out of bounds
            return out;
        }
        self.check_references(&mut out);
        if !out.is_empty() {
            return out;
        }
        self.check_opposites(&mut out);
        self.check_faces(&mut out);
        self.check_usage(&mut out);
        out
    }

    /// Whether [`validate`](Self::validate) finds nothing.
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    fn check_columns(&self, out: &mut Vec<Violation>) {
        let mut expect = |table: &'static str, column: &'static str, expected: usize, found: usize| {
            if expected != found {
                out.push(Violation::ColumnLength {
                    table,
                    column,
                    expected,
                    found,
                });
            }
        };
        let (nv, ne, nf, nc) = (self.nv(), self.ne(), self.nf(), self.nc());
        expect("vert", "segment", nv, self.vert_segment.len());
        expect("edge", "trgt", ne, self.trgt.len());
        expect("edge", "face", ne, self.edge_face.len());
        expect("edge", "cell", ne, self.edge_cell.len());
        expect("edge", "opposite", ne, self.opposite.len());
        expect("edge", "segment", ne, self.edge_segment.len());
        for (columns, n) in [
            (&self.vert_attrs, nv),
            (&self.edge_attrs, ne),
            (&self.face_attrs, nf),
            (&self.cell_attrs, nc),
        ] {
            let table = columns.element().name();
            for (attr, len) in columns.lengths() {
                expect(table, attr.name(), n, len);
            }
        }
    }

    fn check_references(&self, out: &mut Vec<Violation>) {
        let bulk = self.kind() == MeshKind::Bulk;
        for e in self.edge_ids() {
            let i = e.index();
            let (s, t) = (self.srce[i], self.trgt[i]);
            if !s.is_valid() || !t.is_valid() || s.index() >= self.nv() || t.index() >= self.nv() {
                out.push(Violation::DanglingVertex { edge: e });
            } else if s == t {
                out.push(Violation::Loop { edge: e });
            }
            let f = self.edge_face[i];
            if !f.is_valid() || f.index() >= self.nf() {
                out.push(Violation::DanglingFace { edge: e });
            }
            let c = self.edge_cell[i];
            let cell_ok = if bulk {
                c.is_valid() && c.index() < self.nc()
            } else {
                !c.is_valid()
            };
            if !cell_ok {
                out.push(Violation::DanglingCell { edge: e });
            }
            let o = self.opposite[i];
            if o.is_valid() && o.index() >= self.ne() {
                out.push(Violation::StaleOpposite { edge: e });
            }
        }
    }

    fn check_opposites(&self, out: &mut Vec<Violation>) {
        let bulk = self.kind() == MeshKind::Bulk;
        let key = |e: usize| {
            let cell = if bulk { self.edge_cell[e] } else { CellId::invalid() };
            (self.srce[e], self.trgt[e], cell)
        };

        let mut seen = HashSet::with_capacity(self.ne());
        for e in 0..self.ne() {
            if !seen.insert(key(e)) {
                out.push(Violation::DuplicateHalfEdge { edge: EdgeId::new(e) });
            }
        }

        let mut expected = self.clone();
        expected.reset_topo();
        for e in self.edge_ids() {
            let o = self.opposite[e.index()];
            if o != expected.opposite[e.index()] {
                out.push(Violation::StaleOpposite { edge: e });
                continue;
            }
            if let Some(o) = o.valid() {
                let back = self.opposite[o.index()] == e;
                let reversed = self.srce(o) == self.trgt(e) && self.trgt(o) == self.srce(e);
                if !back || !reversed {
                    out.push(Violation::OppositeMismatch { edge: e });
                }
            }
        }
    }

    fn check_faces(&self, out: &mut Vec<Violation>) {
        let topo = self.topology();
        for f in self.face_ids() {
            let edges = &topo.face_edges[f.index()];
            if edges.len() < 3 {
                out.push(Violation::TooFewSides {
                    face: f,
                    sides: edges.len(),
                });
                continue;
            }
            if !topo.face_closed[f.index()] {
                out.push(Violation::BrokenCycle { face: f });
                continue;
            }
            let mut verts = HashSet::with_capacity(edges.len());
            for &e in edges {
                let v = self.srce(e);
                if !verts.insert(v) {
                    out.push(Violation::RepeatedVertex { face: f, vert: v });
                }
            }
            let cell = self.edge_cell[edges[0].index()];
            if edges.iter().any(|&e| self.edge_cell[e.index()] != cell) {
                out.push(Violation::MixedCells { face: f });
            }
        }
        if self.kind() == MeshKind::Bulk {
            for c in self.cell_ids() {
                if topo.cell_faces[c.index()].is_empty() {
                    out.push(Violation::EmptyCell { cell: c });
                }
            }
        }
    }

    fn check_usage(&self, out: &mut Vec<Violation>) {
        let mut used = vec![false; self.nv()];
        for (&s, &t) in self.srce.iter().zip(&self.trgt) {
            used[s.index()] = true;
            used[t.index()] = true;
        }
        for (i, &u) in used.iter().enumerate() {
            if !u {
                out.push(Violation::OrphanVertex { vert: VertId::new(i) });
            }
        }
    }
}
