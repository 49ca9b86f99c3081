//! Transitions of monolayer (bulk) meshes.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use nalgebra::{Point3, Vector3};

use super::rewrite::{pairs, CellRef, NewFace, Rewrite, VRef};
use super::{
    close_cycle, commit, cut_face, insert_crossings, junction, no_plane, require_kind, Cut, Plane,
    Side, Transition, BULK,
};
use crate::error::{MeshError, Result};
use crate::geometry::EPS;
use crate::mesh::{mean_point, CellId, EdgeId, Element, FaceId, Mesh, Segment, VertId};

/// Segment given to faces created inside the tissue.
fn inner_segment(mesh: &Mesh) -> Segment {
    if mesh.has_segments() {
        Segment::Lateral
    } else {
        Segment::Unset
    }
}

/// The face of another cell with the same vertices, if any.
fn twin_face(mesh: &Mesh, face: FaceId) -> Option<FaceId> {
    let mut verts = mesh.face_verts(face);
    verts.sort_unstable();
    let cell = mesh.face_cell(face);
    let first = *verts.first()?;
    mesh.vert_faces(first).into_iter().find(|&g| {
        if g == face || mesh.face_cell(g) == cell || mesh.num_sides(g) != verts.len() {
            return false;
        }
        let mut other = mesh.face_verts(g);
        other.sort_unstable();
        other == verts
    })
}

fn irregular(vert: VertId, details: String) -> MeshError {
    MeshError::IrregularJunction { vert, details }
}

/// Any unit vector orthogonal to `axis`.
fn any_orthogonal(axis: &Vector3<f64>) -> Vector3<f64> {
    let probe = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    axis.cross(&probe).normalize()
}

// ==================== IH ====================

/// Replace a short edge by a triangular face (I → H).
///
/// The edge `a -> b` must be at most `settings.threshold_length` long and be
/// shared by three interfaces, the outside of the tissue counting as one. Each
/// face along the edge loses a side: `a` and `b` collapse onto one of three
/// vertices placed around the edge midpoint, `a` and `b` themselves being
/// reused for two of them. The triangle they form, equilateral with the
/// length of the removed edge as side, becomes a pair of twin faces between
/// the cell beyond `a` and the cell beyond `b`.
///
/// No vertex, face or cell row is removed: rows at or above `prev.nv` and
/// `prev.nf` in the report are exactly the created ones.
pub fn ih_transition(mesh: &mut Mesh, edge: EdgeId) -> Result<Transition> {
    mesh.check_edge(edge)?;
    require_kind(mesh, "ih_transition", BULK)?;

    let length = mesh.edge_length(edge);
    let threshold = mesh.settings().threshold_length;
    if length > threshold {
        return Err(MeshError::EdgeTooLong {
            edge,
            length,
            threshold,
        });
    }
    let (a, b) = (mesh.srce(edge), mesh.trgt(edge));
    if mesh.has_segments() && mesh.vert_segment(a) != mesh.vert_segment(b) {
        return Err(irregular(
            a,
            format!(
                "the edge joins {:?} and {:?} vertices",
                mesh.vert_segment(a),
                mesh.vert_segment(b)
            ),
        ));
    }

    // Faces along the edge, with the vertices next to `a` and `b` in each.
    let mut along: Vec<(FaceId, VertId, VertId)> = Vec::new();
    for f in mesh.vert_faces(a) {
        let verts = mesh.face_verts(f);
        let n = verts.len();
        let Some(i) = verts.iter().position(|&v| v == a) else {
            continue;
        };
        let (prev, next) = (verts[(i + n - 1) % n], verts[(i + 1) % n]);
        let (x, y) = if next == b {
            (prev, verts[(i + 2) % n])
        } else if prev == b {
            (next, verts[(i + n - 2) % n])
        } else {
            continue;
        };
        if n < 4 {
            return Err(MeshError::AdjacentTriangle { edge, face: f });
        }
        along.push((f, x, y));
    }

    let keys: Vec<(VertId, VertId)> = along
        .iter()
        .map(|&(_, x, y)| (x, y))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if keys.len() != 3 {
        return Err(irregular(
            a,
            format!("{} interfaces around the edge, expected 3", keys.len()),
        ));
    }
    let xmap: HashMap<VertId, usize> = keys.iter().enumerate().map(|(k, &(x, _))| (x, k)).collect();
    let ymap: HashMap<VertId, usize> = keys.iter().enumerate().map(|(k, &(_, y))| (y, k)).collect();
    if xmap.len() != 3 || ymap.len() != 3 {
        return Err(irregular(a, "interfaces share a neighbour".into()));
    }

    let (ra, rb) = (mesh.position(a), mesh.position(b));
    let mid = Point3::from((ra.coords + rb.coords) / 2.0);
    let axis = (rb - ra)
        .try_normalize(EPS)
        .ok_or_else(|| irregular(a, "zero-length edge".into()))?;
    let radius = length / 3f64.sqrt();
    let corners: Vec<Point3<f64>> = keys
        .iter()
        .map(|&(x, y)| {
            let towards = Point3::from((mesh.position(x).coords + mesh.position(y).coords) / 2.0) - mid;
            let radial = towards - axis * towards.dot(&axis);
            let dir = radial
                .try_normalize(EPS)
                .unwrap_or_else(|| any_orthogonal(&axis));
            mid + dir * radius
        })
        .collect();

    let mut plan = Rewrite::default();
    plan.move_vertex(a, corners[0]);
    plan.move_vertex(b, corners[1]);
    let p = [VRef::Old(a), VRef::Old(b), plan.new_vertex(corners[2], a)];

    let mut junction_faces: HashSet<FaceId> = HashSet::new();
    for &(f, x, y) in &along {
        let k = xmap[&x];
        debug_assert_eq!(ymap[&y], k);
        let mut cycle = Vec::with_capacity(mesh.num_sides(f) - 1);
        let mut placed = false;
        for v in mesh.face_verts(f) {
            if v == a || v == b {
                if !placed {
                    cycle.push(p[k]);
                    placed = true;
                }
            } else {
                cycle.push(VRef::Old(v));
            }
        }
        plan.set_cycle(f, cycle);
        junction_faces.insert(f);
    }

    // Faces meeting the edge at one end gain a side. The directed pairs they
    // receive, reversed, close the new faces of the end cells.
    let mut inserted: BTreeMap<CellId, (FaceId, Vec<(VRef, VRef)>)> = BTreeMap::new();
    for (v, map) in [(a, &xmap), (b, &ymap)] {
        for f in mesh.vert_faces(v) {
            if junction_faces.contains(&f) {
                continue;
            }
            let verts = mesh.face_verts(f);
            if verts.contains(&a) && verts.contains(&b) {
                return Err(irregular(v, format!("{f:?} holds both ends of the edge")));
            }
            let n = verts.len();
            let Some(i) = verts.iter().position(|&u| u == v) else {
                continue;
            };
            let (prev, next) = (verts[(i + n - 1) % n], verts[(i + 1) % n]);
            let (Some(&kp), Some(&kn)) = (map.get(&prev), map.get(&next)) else {
                return Err(irregular(v, format!("{f:?} leaves the junction")));
            };
            if kp == kn {
                return Err(irregular(v, format!("{f:?} meets one interface twice")));
            }

            let mut cycle = Vec::with_capacity(n + 1);
            for &u in &verts {
                if u == v {
                    cycle.push(p[kp]);
                    cycle.push(p[kn]);
                } else {
                    cycle.push(VRef::Old(u));
                }
            }
            plan.set_cycle(f, cycle);

            let cell = mesh
                .face_cell(f)
                .ok_or_else(|| irregular(v, format!("{f:?} has no cell")))?;
            inserted
                .entry(cell)
                .or_insert_with(|| (f, Vec::new()))
                .1
                .push((p[kp], p[kn]));
        }
    }

    let segment = inner_segment(mesh);
    let mut closed = 0;
    for (cell, (template, edges)) in inserted {
        let present: HashSet<(VRef, VRef)> = edges.iter().copied().collect();
        let open: Vec<(VRef, VRef)> = edges
            .iter()
            .filter(|&&(s, t)| !present.contains(&(t, s)))
            .map(|&(s, t)| (t, s))
            .collect();
        if open.is_empty() {
            continue;
        }
        let cycle = close_cycle(&open)
            .ok_or_else(|| irregular(a, format!("{cell:?} does not close around the new face")))?;
        plan.new_face(NewFace {
            cell: Some(CellRef::Old(cell)),
            segment,
            template,
            cycle,
        });
        closed += 1;
    }
    // Both ends must lie inside a cell that takes the new triangle.
    if closed != 2 {
        return Err(irregular(
            a,
            format!("{closed} end cells receive the new face, expected 2"),
        ));
    }

    commit(mesh, "ih_transition", plan)
}

// ==================== HI ====================

/// Collapse a triangular face into an edge (H → I).
///
/// The triangle and its twin face are removed and their three vertices merge
/// into a new edge along the triangle normal, its length the mean side of the
/// triangle. The end inside the triangle's cell reuses the first vertex, the
/// end beyond it the second; the third vertex is dropped. A triangle on the
/// surface of the tissue has no twin and its outer end joins the surface.
pub fn hi_transition(mesh: &mut Mesh, face: FaceId) -> Result<Transition> {
    mesh.check_face(face)?;
    require_kind(mesh, "hi_transition", BULK)?;
    let sides = mesh.num_sides(face);
    if sides != 3 {
        return Err(MeshError::NotTriangular { face, sides });
    }

    let tri = mesh.face_verts(face);
    let inner = mesh.face_cell(face);
    let twin = twin_face(mesh, face);
    let outer = twin.and_then(|t| mesh.face_cell(t));

    let f_edges: HashSet<(VertId, VertId)> = pairs(&tri).collect();
    let mut inner_pairs: HashSet<(VertId, VertId)> = HashSet::new();
    if let Some(d) = inner {
        for &g in mesh.cell_faces(d) {
            if g != face {
                inner_pairs.extend(pairs(&mesh.face_verts(g)).map(|(s, t)| junction(s, t)));
            }
        }
    }

    let pos: Vec<Point3<f64>> = tri.iter().map(|&v| mesh.position(v)).collect();
    let center = mean_point(pos.iter().copied());
    let normal = (pos[1] - pos[0])
        .cross(&(pos[2] - pos[0]))
        .try_normalize(EPS)
        .ok_or_else(|| irregular(tri[0], "flat triangle".into()))?;
    let half = pairs(&pos).map(|(s, t)| (t - s).norm()).sum::<f64>() / 6.0;

    let (a, b) = (tri[0], tri[1]);
    let mut plan = Rewrite::default();
    plan.move_vertex(a, center - normal * half);
    plan.move_vertex(b, center + normal * half);

    let mut affected: BTreeSet<FaceId> = BTreeSet::new();
    for &v in &tri {
        affected.extend(mesh.vert_faces(v));
    }
    affected.remove(&face);
    if let Some(t) = twin {
        affected.remove(&t);
    }

    let on_tri = |v: &VertId| tri.contains(v);
    for g in affected {
        let mut verts = mesh.face_verts(g);
        let Some(start) = verts.iter().position(|v| !on_tri(v)) else {
            return Err(irregular(tri[0], format!("{g:?} lies on the triangle")));
        };
        verts.rotate_left(start);
        let cell = mesh.face_cell(g);

        let n = verts.len();
        let mut cycle: Vec<VRef> = Vec::with_capacity(n + 1);
        let mut i = 0;
        while i < n {
            if !on_tri(&verts[i]) {
                cycle.push(VRef::Old(verts[i]));
                i += 1;
                continue;
            }
            let mut j = i;
            while j < n && on_tri(&verts[j]) {
                j += 1;
            }
            match &verts[i..j] {
                &[v] => {
                    let before = verts[i - 1];
                    if inner_pairs.contains(&junction(v, before)) {
                        cycle.extend([VRef::Old(a), VRef::Old(b)]);
                    } else {
                        cycle.extend([VRef::Old(b), VRef::Old(a)]);
                    }
                }
                &[s, t] => {
                    let to_inner = if cell.is_some() && cell == inner {
                        true
                    } else if cell.is_some() && cell == outer {
                        false
                    } else {
                        f_edges.contains(&(s, t))
                    };
                    cycle.push(VRef::Old(if to_inner { a } else { b }));
                }
                run => {
                    return Err(irregular(
                        run[0],
                        format!("{g:?} runs along {} triangle vertices", run.len()),
                    ))
                }
            }
            i = j;
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
    if let Some(t) = twin {
        plan.remove_face(t);
    }
    commit(mesh, "hi_transition", plan)
}

// ==================== Division ====================

/// Cut a cell in two with the plane through the mean of its vertices.
///
/// A vertex is added on every cell edge the plane crosses and inserted in
/// every face sharing that edge. Faces of the cell cut in two keep their
/// negative part; the positive part goes to the daughter cell, as do faces
/// lying entirely on the positive side. The twin faces of cut faces are cut
/// along the same chord and stay with their cell. Both cells are closed by a
/// new cap face on the plane.
pub fn divide_cell(mesh: &mut Mesh, cell: CellId, normal: Vector3<f64>) -> Result<Transition> {
    mesh.check_cell(cell)?;
    require_kind(mesh, "divide_cell", BULK)?;

    let cell_verts = mesh.cell_verts(cell);
    let plane = Plane::new(
        mean_point(cell_verts.iter().map(|&v| mesh.position(v))),
        normal,
    )?;

    let mut plan = Rewrite::default();
    let mut crossings: HashMap<(VertId, VertId), VRef> = HashMap::new();
    for e in mesh.cell_edges(cell) {
        let (s, t) = (mesh.srce(e), mesh.trgt(e));
        let key = junction(s, t);
        if crossings.contains_key(&key) {
            continue;
        }
        if let Some(q) = plane.crossing(mesh, s, t) {
            crossings.insert(key, plan.new_vertex(q, s));
        }
    }
    let on_plane = cell_verts
        .iter()
        .filter(|&&v| plane.side(mesh, v) == Side::On)
        .count();
    let cuts = crossings.len() + on_plane;
    if cuts < 3 {
        return Err(no_plane(Element::Cell, cell.index(), cuts));
    }

    // Every face holding a crossed edge, in this cell or a neighbour.
    let mut touched: BTreeSet<FaceId> = BTreeSet::new();
    for &(s, t) in crossings.keys() {
        for &e in mesh.vert_edges(s).iter().chain(mesh.vert_edges(t)) {
            if junction(mesh.srce(e), mesh.trgt(e)) == (s, t) {
                touched.insert(mesh.edge_face(e));
            }
        }
    }

    let daughter = plan.new_cell(cell);
    let own: BTreeSet<FaceId> = mesh.cell_faces(cell).iter().copied().collect();
    let mut mother_chords: Vec<(VRef, VRef)> = Vec::new();
    let mut daughter_chords: Vec<(VRef, VRef)> = Vec::new();
    let mut cut_twins: BTreeSet<FaceId> = BTreeSet::new();
    let mut cap_template: Option<FaceId> = None;

    for &f in &own {
        let cycle = insert_crossings(&mesh.face_verts(f), &crossings);
        match cut_face(mesh, &plane, &cycle) {
            Cut::Whole {
                positive, chord, ..
            } => {
                if positive {
                    plan.reassign(f, daughter);
                }
                // an edge lying on the plane bounds the cap of its side
                if let Some(chord) = chord {
                    if positive {
                        daughter_chords.push(chord);
                    } else {
                        mother_chords.push(chord);
                    }
                    cap_template.get_or_insert(f);
                }
            }
            Cut::Split { positive, negative } => {
                mother_chords.push((negative[0], negative[negative.len() - 1]));
                daughter_chords.push((positive[0], positive[positive.len() - 1]));
                plan.set_cycle(f, negative);
                plan.new_face(NewFace {
                    cell: Some(daughter),
                    segment: mesh.face_segment(f),
                    template: f,
                    cycle: positive,
                });
                cap_template.get_or_insert(f);
                if let Some(t) = twin_face(mesh, f) {
                    cut_twins.insert(t);
                }
            }
            Cut::Irregular(n) => return Err(no_plane(Element::Face, f.index(), n)),
        }
    }

    let neighbours: BTreeSet<FaceId> = touched.union(&cut_twins).copied().collect();
    for &g in neighbours.difference(&own) {
        let cycle = insert_crossings(&mesh.face_verts(g), &crossings);
        let split = if cut_twins.contains(&g) {
            match cut_face(mesh, &plane, &cycle) {
                Cut::Split { positive, negative } => Some((positive, negative)),
                _ => None,
            }
        } else {
            None
        };
        match split {
            Some((positive, negative)) => {
                plan.set_cycle(g, negative);
                plan.new_face(NewFace {
                    cell: mesh.face_cell(g).map(CellRef::Old),
                    segment: mesh.face_segment(g),
                    template: g,
                    cycle: positive,
                });
            }
            None => plan.set_cycle(g, cycle),
        }
    }

    let cap_template = cap_template.ok_or_else(|| no_plane(Element::Cell, cell.index(), crossings.len()))?;
    let segment = inner_segment(mesh);
    for (owner, chords) in [(CellRef::Old(cell), &mother_chords), (daughter, &daughter_chords)] {
        let cycle = close_cycle(chords).ok_or_else(|| no_plane(Element::Cell, cell.index(), crossings.len()))?;
        plan.new_face(NewFace {
            cell: Some(owner),
            segment,
            template: cap_template,
            cycle,
        });
    }

    commit(mesh, "divide_cell", plan)
}

/// Remove a cell with all its faces. Vertices no longer used go with it.
pub fn remove_cell(mesh: &mut Mesh, cell: CellId) -> Result<Transition> {
    mesh.check_cell(cell)?;
    require_kind(mesh, "remove_cell", BULK)?;
    let mut plan = Rewrite::default();
    for &f in mesh.cell_faces(cell) {
        plan.remove_face(f);
    }
    plan.remove_cell(cell);
    commit(mesh, "remove_cell", plan)
}
