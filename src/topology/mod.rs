//! Topology transitions.
//!
//! Every transition follows the same protocol:
//!
//! 1. Check its preconditions on the untouched mesh
//! 2. Describe the connectivity change as a rewrite plan
//! 3. Apply the plan to a copy of the mesh and run the structural validator
//! 4. Swap the copy in only when the validator finds nothing
//!
//! A failed transition therefore leaves the mesh exactly as it was. On
//! success a [`Transition`] report lists the rows it created, with the
//! identifiers they have after compaction.
//!
//! # Operations
//!
//! - Monolayers: [`ih_transition`], [`hi_transition`], [`divide_cell`],
//!   [`remove_cell`]
//! - Sheets: [`type1_transition`], [`collapse_face`], [`divide_face`]
//! - Any kind: [`eliminate_face`]
//!
//! # Example
//!
//! ```
//! use epithelium::mesh::{generation, FaceId};
//! use epithelium::topology::divide_face;
//! use nalgebra::Vector3;
//!
//! let mut sheet = generation::hexagonal_sheet(3, 3).unwrap();
//! let report = divide_face(&mut sheet, FaceId::new(4), Vector3::y()).unwrap();
//!
//! assert_eq!(report.faces.len(), 1);
//! assert_eq!(sheet.nf(), 10);
//! assert!(sheet.is_valid());
//! ```

mod bulk;
mod rewrite;
mod sheet;

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::error::{MeshError, Result};
use crate::geometry::EPS;
use crate::mesh::{CellId, Counts, EdgeId, Element, FaceId, Mesh, MeshKind, VertId};
use rewrite::{Rewrite, VRef};

pub use bulk::{divide_cell, hi_transition, ih_transition, remove_cell};
pub use sheet::{collapse_face, divide_face, type1_transition};

/// Report of a committed transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Row counts before the transition.
    pub prev: Counts,
    /// Appended vertices.
    pub verts: Vec<VertId>,
    /// Appended half-edges.
    pub edges: Vec<EdgeId>,
    /// Appended faces.
    pub faces: Vec<FaceId>,
    /// Appended cells.
    pub cells: Vec<CellId>,
}

/// Apply `plan` to a copy of `mesh`, validate it and commit.
pub(crate) fn commit(mesh: &mut Mesh, operation: &'static str, plan: Rewrite) -> Result<Transition> {
    let mut candidate = mesh.clone();
    let report = plan.apply(&mut candidate);

    let violations = candidate.validate();
    if !violations.is_empty() {
        log::warn!(
            "{} rolled back: {} structural violation(s), first: {}",
            operation,
            violations.len(),
            violations[0]
        );
        return Err(MeshError::InvariantViolation {
            operation,
            violations,
        });
    }

    let after = candidate.counts();
    log::debug!(
        "{}: nv {} -> {}, ne {} -> {}, nf {} -> {}, nc {} -> {}",
        operation,
        report.prev.nv,
        after.nv,
        report.prev.ne,
        after.ne,
        report.prev.nf,
        after.nf,
        report.prev.nc,
        after.nc
    );
    *mesh = candidate;
    Ok(report)
}

/// Fail with `UnsupportedKind` unless the mesh is one of `kinds`.
pub(crate) fn require_kind(mesh: &Mesh, operation: &'static str, kinds: &[MeshKind]) -> Result<()> {
    if kinds.contains(&mesh.kind()) {
        Ok(())
    } else {
        Err(MeshError::UnsupportedKind {
            operation,
            kind: mesh.kind(),
        })
    }
}

pub(crate) const SHEETS: &[MeshKind] = &[MeshKind::Sheet, MeshKind::Planar];
pub(crate) const BULK: &[MeshKind] = &[MeshKind::Bulk];

/// Remove a face and its half-edges. Vertices no longer used by any
/// half-edge go with it, and so does a cell left without faces.
pub fn eliminate_face(mesh: &mut Mesh, face: FaceId) -> Result<Transition> {
    mesh.check_face(face)?;
    let mut plan = Rewrite::default();
    plan.remove_face(face);
    commit(mesh, "eliminate_face", plan)
}

/// Chain directed edges `(s, t)` into a single closed cycle.
///
/// Returns `None` when the edges do not form exactly one cycle of at least
/// three vertices.
pub(crate) fn close_cycle(edges: &[(VRef, VRef)]) -> Option<Vec<VRef>> {
    if edges.len() < 3 {
        return None;
    }
    let mut next: HashMap<VRef, VRef> = HashMap::with_capacity(edges.len());
    for &(s, t) in edges {
        if next.insert(s, t).is_some() {
            return None;
        }
    }
    let start = edges[0].0;
    let mut cycle = vec![start];
    let mut at = *next.get(&start)?;
    while at != start {
        if cycle.len() >= edges.len() {
            return None;
        }
        cycle.push(at);
        at = *next.get(&at)?;
    }
    (cycle.len() == edges.len()).then_some(cycle)
}

// ==================== Division helpers ====================

/// Unordered key of the junction between two vertices.
pub(crate) fn junction(a: VertId, b: VertId) -> (VertId, VertId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Position of a vertex relative to a division plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Negative,
    On,
    Positive,
}

/// Division plane through `origin`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Plane {
    origin: Point3<f64>,
    normal: Vector3<f64>,
}

impl Plane {
    pub(crate) fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Result<Self> {
        let normal = normal
            .try_normalize(EPS)
            .ok_or_else(|| MeshError::invalid_param("normal", normal.norm(), "must be non-zero"))?;
        Ok(Self { origin, normal })
    }

    /// Signed distance of a vertex to the plane.
    pub(crate) fn distance(&self, mesh: &Mesh, v: VertId) -> f64 {
        (mesh.position(v) - self.origin).dot(&self.normal)
    }

    /// Vertices closer than `EPS` lie on the plane.
    pub(crate) fn side(&self, mesh: &Mesh, v: VertId) -> Side {
        let d = self.distance(mesh, v);
        if d > EPS {
            Side::Positive
        } else if d < -EPS {
            Side::Negative
        } else {
            Side::On
        }
    }

    /// Where the plane cuts the segment `s -> t`, if its ends lie strictly on
    /// opposite sides.
    pub(crate) fn crossing(&self, mesh: &Mesh, s: VertId, t: VertId) -> Option<Point3<f64>> {
        match (self.side(mesh, s), self.side(mesh, t)) {
            (Side::Positive, Side::Negative) | (Side::Negative, Side::Positive) => {
                let (ds, dt) = (self.distance(mesh, s), self.distance(mesh, t));
                let w = ds / (ds - dt);
                Some(mesh.position(s) + (mesh.position(t) - mesh.position(s)) * w)
            }
            _ => None,
        }
    }
}

/// Insert crossing vertices into a face's vertex cycle.
pub(crate) fn insert_crossings(
    verts: &[VertId],
    crossings: &HashMap<(VertId, VertId), VRef>,
) -> Vec<VRef> {
    let mut cycle = Vec::with_capacity(verts.len() + 2);
    for (s, t) in rewrite::pairs(verts) {
        cycle.push(VRef::Old(s));
        if let Some(&q) = crossings.get(&junction(s, t)) {
            cycle.push(q);
        }
    }
    cycle
}

/// Split a cycle at two of its vertices into `[q0 ..= q1]` and `[q1 ..= q0]`.
pub(crate) fn split_cycle(cycle: &[VRef], q0: VRef, q1: VRef) -> Option<(Vec<VRef>, Vec<VRef>)> {
    let i = cycle.iter().position(|&v| v == q0)?;
    let j = cycle.iter().position(|&v| v == q1)?;
    let n = cycle.len();
    let walk = |from: usize, to: usize| {
        let mut part = vec![cycle[from]];
        let mut k = from;
        while k != to {
            k = (k + 1) % n;
            part.push(cycle[k]);
        }
        part
    };
    Some((walk(i, j), walk(j, i)))
}

/// Whether a part of a cycle lies on the positive side of the plane.
pub(crate) fn part_is_positive(mesh: &Mesh, plane: &Plane, part: &[VRef]) -> bool {
    part.iter().any(|&r| match r {
        VRef::Old(v) => plane.side(mesh, v) == Side::Positive,
        VRef::New(_) => false,
    })
}

/// How a division plane meets a face cycle with its crossings inserted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cut {
    /// The face stays on one side. `chord` is the reversed face edge lying
    /// on the plane, if any; `cuts` counts the cycle vertices on the plane.
    Whole {
        positive: bool,
        chord: Option<(VRef, VRef)>,
        cuts: usize,
    },
    /// The face splits along the chord between two cut points. Each part
    /// starts and ends on the chord.
    Split {
        positive: Vec<VRef>,
        negative: Vec<VRef>,
    },
    /// The plane meets the face at more than two vertices.
    Irregular(usize),
}

/// Cut points are inserted crossings and existing vertices lying on the
/// plane; an existing vertex on the plane is split at, never duplicated.
pub(crate) fn cut_face(mesh: &Mesh, plane: &Plane, cycle: &[VRef]) -> Cut {
    let n = cycle.len();
    let cuts: Vec<usize> = (0..n)
        .filter(|&i| match cycle[i] {
            VRef::New(_) => true,
            VRef::Old(v) => plane.side(mesh, v) == Side::On,
        })
        .collect();
    let positive = part_is_positive(mesh, plane, cycle);
    match cuts[..] {
        [i, j] if j == i + 1 => Cut::Whole {
            positive,
            chord: Some((cycle[j], cycle[i])),
            cuts: 2,
        },
        [i, j] if i == 0 && j == n - 1 => Cut::Whole {
            positive,
            chord: Some((cycle[i], cycle[j])),
            cuts: 2,
        },
        [i, j] => {
            let Some((first, second)) = split_cycle(cycle, cycle[i], cycle[j]) else {
                return Cut::Irregular(2);
            };
            if part_is_positive(mesh, plane, &first) {
                Cut::Split {
                    positive: first,
                    negative: second,
                }
            } else {
                Cut::Split {
                    positive: second,
                    negative: first,
                }
            }
        }
        _ if cuts.len() > 2 => Cut::Irregular(cuts.len()),
        _ => Cut::Whole {
            positive,
            chord: None,
            cuts: cuts.len(),
        },
    }
}

pub(crate) fn no_plane(element: Element, index: usize, crossings: usize) -> MeshError {
    MeshError::NoDivisionPlane {
        element,
        index,
        crossings,
    }
}
