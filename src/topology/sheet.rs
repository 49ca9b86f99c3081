//! Transitions of sheets and planar meshes.

use std::collections::{BTreeSet, HashMap};

use nalgebra::{Point3, Vector3};

use super::rewrite::{pairs, NewFace, Rewrite, VRef};
use super::{
    commit, cut_face, insert_crossings, junction, no_plane, require_kind, Cut, Plane, Transition,
    SHEETS,
};
use crate::error::{MeshError, Result};
use crate::geometry::EPS;
use crate::mesh::{EdgeId, Element, FaceId, Mesh, MeshKind, VertId};

/// Twice the vector area of a face, from current positions.
fn vector_area(mesh: &Mesh, face: FaceId) -> Vector3<f64> {
    let c = mesh.face_centroid(face);
    pairs(&mesh.face_verts(face))
        .map(|(s, t)| (mesh.position(s) - c).cross(&(mesh.position(t) - c)))
        .sum()
}

/// The only face at `v` besides `f1` and `f2`.
fn third_face(mesh: &Mesh, v: VertId, f1: FaceId, f2: FaceId) -> Result<FaceId> {
    let others: Vec<FaceId> = mesh
        .vert_faces(v)
        .into_iter()
        .filter(|&f| f != f1 && f != f2)
        .collect();
    match others[..] {
        [f] => Ok(f),
        _ => Err(MeshError::IrregularJunction {
            vert: v,
            details: format!("{} faces meet at the vertex, expected 3", others.len() + 2),
        }),
    }
}

/// Insert `v` right before `before` in a face cycle.
fn insert_before(verts: &[VertId], v: VertId, before: VertId) -> Vec<VRef> {
    let mut cycle = Vec::with_capacity(verts.len() + 1);
    for &u in verts {
        if u == before {
            cycle.push(VRef::Old(v));
        }
        cycle.push(VRef::Old(u));
    }
    cycle
}

fn without(verts: &[VertId], v: VertId) -> Vec<VRef> {
    verts.iter().filter(|&&u| u != v).map(|&u| VRef::Old(u)).collect()
}

// ==================== T1 ====================

/// Rotate an interior edge by a quarter turn (T1 transition).
///
/// The edge `a -> b` separates faces `f1` and `f2`, each with more than three
/// sides. Afterwards `f1` and `f2` no longer touch and lose a side, while the
/// two faces at the ends of the edge become neighbours and gain one. The edge
/// is rotated in the tangent plane around its midpoint and stretched to at
/// least `1.01 × threshold_length`, so it does not qualify again right away.
/// Row counts are unchanged.
pub fn type1_transition(mesh: &mut Mesh, edge: EdgeId) -> Result<Transition> {
    mesh.check_edge(edge)?;
    require_kind(mesh, "type1_transition", SHEETS)?;
    let opp = mesh.opposite(edge).ok_or(MeshError::BorderEdge { edge })?;

    let (a, b) = (mesh.srce(edge), mesh.trgt(edge));
    let (f1, f2) = (mesh.edge_face(edge), mesh.edge_face(opp));
    for f in [f1, f2] {
        if mesh.num_sides(f) <= 3 {
            return Err(MeshError::AdjacentTriangle { edge, face: f });
        }
    }
    let fa = third_face(mesh, a, f1, f2)?;
    let fb = third_face(mesh, b, f1, f2)?;
    if fa == fb {
        return Err(MeshError::IrregularJunction {
            vert: a,
            details: format!("both ends of the edge meet {fa:?}"),
        });
    }

    let (ra, rb) = (mesh.position(a), mesh.position(b));
    let mid = Point3::from((ra.coords + rb.coords) / 2.0);
    let normal = match mesh.kind() {
        MeshKind::Planar => Vector3::z(),
        _ => vector_area(mesh, f1) + vector_area(mesh, f2),
    };
    let mut dir = normal
        .cross(&(rb - ra))
        .try_normalize(EPS)
        .ok_or_else(|| MeshError::IrregularJunction {
            vert: a,
            details: "edge has no tangent rotation".into(),
        })?;
    if dir.dot(&(mesh.face_centroid(f1) - mid)) < 0.0 {
        dir = -dir;
    }
    let half = 0.5 * (rb - ra).norm().max(1.01 * mesh.settings().threshold_length);

    let mut plan = Rewrite::default();
    plan.set_cycle(f1, without(&mesh.face_verts(f1), b));
    plan.set_cycle(f2, without(&mesh.face_verts(f2), a));
    plan.set_cycle(fa, insert_before(&mesh.face_verts(fa), b, a));
    plan.set_cycle(fb, insert_before(&mesh.face_verts(fb), a, b));
    plan.move_vertex(a, mid + dir * half);
    plan.move_vertex(b, mid - dir * half);

    commit(mesh, "type1_transition", plan)
}

// ==================== T2 ====================

/// Collapse a triangular face onto its centroid (T2 transition).
///
/// The first vertex of the triangle is kept and moved to the centroid; the
/// other two are dropped. Every face that shared vertices with the triangle
/// keeps a single vertex in their place.
pub fn collapse_face(mesh: &mut Mesh, face: FaceId) -> Result<Transition> {
    mesh.check_face(face)?;
    require_kind(mesh, "collapse_face", SHEETS)?;
    let sides = mesh.num_sides(face);
    if sides != 3 {
        return Err(MeshError::NotTriangular { face, sides });
    }

    let tri = mesh.face_verts(face);
    let keep = tri[0];
    let mut plan = Rewrite::default();
    plan.move_vertex(keep, mesh.face_centroid(face));

    let mut around: BTreeSet<FaceId> = BTreeSet::new();
    for &v in &tri {
        around.extend(mesh.vert_faces(v));
    }
    around.remove(&face);

    for g in around {
        let mut verts = mesh.face_verts(g);
        let Some(start) = verts.iter().position(|v| !tri.contains(v)) else {
            return Err(MeshError::WouldDegenerate { face: g, sides: 1 });
        };
        verts.rotate_left(start);

        let mut cycle: Vec<VRef> = Vec::with_capacity(verts.len());
        for (i, &v) in verts.iter().enumerate() {
            if !tri.contains(&v) {
                cycle.push(VRef::Old(v));
            } else if i == 0 || !tri.contains(&verts[i - 1]) {
                cycle.push(VRef::Old(keep));
            }
        }
        if cycle.len() < 3 {
            return Err(MeshError::WouldDegenerate {
                face: g,
                sides: cycle.len(),
            });
        }
        plan.set_cycle(g, cycle);
    }
    plan.remove_face(face);

    commit(mesh, "collapse_face", plan)
}

// ==================== Division ====================

/// Cut a face in two with the plane through its centroid.
///
/// The plane must cross exactly two of the face's edges. A vertex is added on
/// each, and also inserted in the neighbouring face across that edge. The
/// mother face keeps the negative side; the positive side becomes a new face
/// with the mother's attributes.
pub fn divide_face(mesh: &mut Mesh, face: FaceId, normal: Vector3<f64>) -> Result<Transition> {
    mesh.check_face(face)?;
    require_kind(mesh, "divide_face", SHEETS)?;
    let plane = Plane::new(mesh.face_centroid(face), normal)?;

    let mut plan = Rewrite::default();
    let mut crossings: HashMap<(VertId, VertId), VRef> = HashMap::new();
    let mut neighbours: BTreeSet<FaceId> = BTreeSet::new();
    for &e in mesh.face_edges(face) {
        let (s, t) = (mesh.srce(e), mesh.trgt(e));
        if let Some(q) = plane.crossing(mesh, s, t) {
            crossings.insert(junction(s, t), plan.new_vertex(q, s));
            if let Some(o) = mesh.opposite(e) {
                neighbours.insert(mesh.edge_face(o));
            }
        }
    }

    let cycle = insert_crossings(&mesh.face_verts(face), &crossings);
    let (positive, negative) = match cut_face(mesh, &plane, &cycle) {
        Cut::Split { positive, negative } => (positive, negative),
        Cut::Whole { cuts, .. } | Cut::Irregular(cuts) => {
            return Err(no_plane(Element::Face, face.index(), cuts))
        }
    };
    plan.set_cycle(face, negative);
    plan.new_face(NewFace {
        cell: None,
        segment: mesh.face_segment(face),
        template: face,
        cycle: positive,
    });

    for g in neighbours {
        plan.set_cycle(g, insert_crossings(&mesh.face_verts(g), &crossings));
    }

    commit(mesh, "divide_face", plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::update_all;
    use crate::mesh::{build_sheet, generation};
    use approx::assert_relative_eq;

    /// An inner triangle ringed by three quads.
    fn triangle_in_ring() -> Mesh {
        let ring = |r: f64| {
            [90.0f64, 210.0, 330.0].map(|deg| {
                let a = deg.to_radians();
                Point3::new(r * a.cos(), r * a.sin(), 0.0)
            })
        };
        let vertices: Vec<Point3<f64>> = ring(1.0).into_iter().chain(ring(3.0)).collect();
        let faces = vec![vec![0, 1, 2], vec![1, 0, 3, 4], vec![2, 1, 4, 5], vec![0, 2, 5, 3]];
        build_sheet(MeshKind::Sheet, &vertices, &faces).unwrap()
    }

    fn shared_edge(mesh: &Mesh, f1: FaceId, f2: FaceId) -> EdgeId {
        mesh.face_edges(f1)
            .iter()
            .copied()
            .find(|&e| mesh.opposite(e).map(|o| mesh.edge_face(o)) == Some(f2))
            .unwrap()
    }

    fn total_area(mesh: &mut Mesh) -> f64 {
        update_all(mesh);
        mesh.geometry().unwrap().face.area.iter().sum()
    }

    #[test]
    fn test_t1_keeps_counts() {
        let mut mesh = generation::hexagonal_sheet(3, 3).unwrap();
        let (center, right) = (FaceId::new(4), FaceId::new(5));
        let edge = shared_edge(&mesh, center, right);
        let (a, b) = (mesh.srce(edge), mesh.trgt(edge));

        let report = type1_transition(&mut mesh, edge).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(mesh.counts(), report.prev);
        assert_eq!(mesh.num_sides(center), 5);
        assert_eq!(mesh.num_sides(right), 5);

        // a and b now bound the two faces that gained a side
        let rotated = mesh
            .edge_ids()
            .find(|&e| mesh.srce(e) == a && mesh.trgt(e) == b)
            .unwrap();
        assert!(mesh.opposite(rotated).is_some());
        assert_eq!(mesh.num_sides(mesh.edge_face(rotated)), 7);
        assert_relative_eq!(mesh.edge_length(rotated), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_t1_preconditions() {
        let mut mesh = generation::hexagonal_sheet(3, 3).unwrap();
        let border = mesh.edge_ids().find(|&e| mesh.is_border_edge(e)).unwrap();
        assert!(matches!(
            type1_transition(&mut mesh, border),
            Err(MeshError::BorderEdge { .. })
        ));

        let mut fan = generation::hexagon_fan(1.0).unwrap();
        let spoke = fan.edge_ids().find(|&e| fan.opposite(e).is_some()).unwrap();
        assert!(matches!(
            type1_transition(&mut fan, spoke),
            Err(MeshError::AdjacentTriangle { .. })
        ));

        let mut mono = generation::unit_cube().unwrap();
        assert!(matches!(
            type1_transition(&mut mono, EdgeId::new(0)),
            Err(MeshError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_t1_on_border_junction_is_irregular() {
        let mut mesh = generation::square_pair().unwrap();
        let before = mesh.clone();
        let edge = shared_edge(&mesh, FaceId::new(0), FaceId::new(1));
        let err = type1_transition(&mut mesh, edge).unwrap_err();
        assert!(matches!(err, MeshError::IrregularJunction { .. }));
        assert_eq!(mesh.positions(), before.positions());
    }

    #[test]
    fn test_t2_collapses_triangle() {
        let mut mesh = triangle_in_ring();
        assert!(mesh.is_valid());

        let report = collapse_face(&mut mesh, FaceId::new(0)).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(report.prev.nv, 6);
        assert_eq!(mesh.nv(), 4);
        assert_eq!(mesh.nf(), 3);
        assert_eq!(mesh.ne(), 9);
        assert!(mesh.face_ids().all(|f| mesh.num_sides(f) == 3));
        assert_relative_eq!(mesh.position(VertId::new(0)).coords.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_t2_requires_triangle() {
        let mut mesh = generation::hexagonal_sheet(2, 2).unwrap();
        let err = collapse_face(&mut mesh, FaceId::new(0)).unwrap_err();
        assert!(matches!(err, MeshError::NotTriangular { sides: 6, .. }));
    }

    #[test]
    fn test_divide_face_conserves_area() {
        let mut mesh = generation::hexagonal_sheet(3, 3).unwrap();
        let before = total_area(&mut mesh);
        let center = FaceId::new(4);

        let report = divide_face(&mut mesh, center, Vector3::y()).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(report.verts.len(), 2);
        assert_eq!(report.faces, vec![FaceId::new(9)]);
        assert_eq!(mesh.num_sides(center), 5);
        assert_eq!(mesh.num_sides(FaceId::new(9)), 5);
        // the left and right neighbours gained the cut vertices
        assert_eq!(mesh.num_sides(FaceId::new(3)), 7);
        assert_eq!(mesh.num_sides(FaceId::new(5)), 7);

        assert_relative_eq!(total_area(&mut mesh), before, epsilon = 1e-9);
        let geom = mesh.geometry().unwrap();
        assert_relative_eq!(geom.face.area[4], geom.face.area[9], epsilon = 1e-9);
        assert!(geom.face.centroid[9].y > geom.face.centroid[4].y);
    }

    #[test]
    fn test_divide_face_through_corners() {
        let mut mesh = generation::hexagonal_sheet(3, 3).unwrap();
        let before = total_area(&mut mesh);
        let center = FaceId::new(4);
        let nv = mesh.nv();

        // the vertical plane holds two opposite corners of the hexagon
        let report = divide_face(&mut mesh, center, Vector3::x()).unwrap();
        assert!(mesh.is_valid());
        assert!(report.verts.is_empty());
        assert_eq!(mesh.nv(), nv);
        assert_eq!(mesh.num_sides(center), 4);
        assert_eq!(mesh.num_sides(report.faces[0]), 4);
        // neighbours are untouched
        assert_eq!(mesh.num_sides(FaceId::new(3)), 6);
        assert_eq!(mesh.num_sides(FaceId::new(5)), 6);

        assert_relative_eq!(total_area(&mut mesh), before, epsilon = 1e-9);
        let geom = mesh.geometry().unwrap();
        assert!(geom.edge.length.iter().all(|&l| l > 0.5));
        assert_relative_eq!(geom.face.area[4], geom.face.area[9], epsilon = 1e-9);
    }

    #[test]
    fn test_divide_face_copies_attributes() {
        let mut mesh = generation::square_pair().unwrap();
        mesh.attr_mut(Element::Face, crate::mesh::Attr::Contractility)[1] = 3.0;
        divide_face(&mut mesh, FaceId::new(1), Vector3::x()).unwrap();
        assert!(mesh.is_valid());
        assert_eq!(mesh.attr(Element::Face, crate::mesh::Attr::Contractility)[2], 3.0);
    }

    #[test]
    fn test_divide_face_rejects_zero_normal() {
        let mut mesh = generation::square_pair().unwrap();
        let err = divide_face(&mut mesh, FaceId::new(0), Vector3::zeros()).unwrap_err();
        assert!(matches!(err, MeshError::InvalidParameter { .. }));
        assert_eq!(mesh.nf(), 2);
    }
}
