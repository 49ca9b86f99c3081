//! Half-edge tables of a tissue mesh.
//!
//! This module provides the structure-of-arrays representation shared by flat
//! sheets and 3D monolayers.
//!
//! # Structure
//!
//! - Each junction between two faces is split into two **half-edges** pointing
//!   in opposite directions, one per face
//! - Each half-edge stores its **source** and **target** vertices, its owning
//!   **face**, its owning **cell** (bulk meshes only) and its **opposite**
//! - Faces and cells have no pointers of their own: they are the sets of
//!   half-edges that carry their id, ordered on demand by [`Topology`]
//!
//! # Opposites
//!
//! The opposite of `s -> t` is the half-edge `t -> s`. In bulk meshes it must
//! also belong to the same cell, which makes every cell a closed oriented
//! surface. Border half-edges of a sheet have no opposite.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use nalgebra::{Point3, Vector3};

use super::attributes::{retain_rows, Attr, Columns, Element, Segment};
use super::index::{CellId, EdgeId, FaceId, Remap, VertId};
use super::topology::Topology;
use crate::dynamics::specs::{ParamSpec, Settings};
use crate::error::{MeshError, Result};
use crate::geometry::Geometry;

/// Dimensionality of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Polygonal sheet in the xy plane; face areas are signed.
    Planar,
    /// Polygonal sheet embedded in 3D.
    Sheet,
    /// Monolayer of polyhedral cells.
    Bulk,
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshKind::Planar => "planar",
            MeshKind::Sheet => "sheet",
            MeshKind::Bulk => "bulk",
        })
    }
}

/// Row counts of the four tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    /// Number of vertices.
    pub nv: usize,
    /// Number of half-edges.
    pub ne: usize,
    /// Number of faces.
    pub nf: usize,
    /// Number of cells.
    pub nc: usize,
}

/// Rows flagged for deletion by a compaction.
#[derive(Debug, Clone, Default)]
pub(crate) struct Removal {
    pub verts: Vec<bool>,
    pub edges: Vec<bool>,
    pub faces: Vec<bool>,
    pub cells: Vec<bool>,
}

impl Removal {
    pub(crate) fn for_counts(counts: Counts) -> Self {
        Self {
            verts: vec![false; counts.nv],
            edges: vec![false; counts.ne],
            faces: vec![false; counts.nf],
            cells: vec![false; counts.nc],
        }
    }
}

/// Old-to-new row maps of one compaction.
#[derive(Debug, Clone)]
pub(crate) struct Remaps {
    pub verts: Remap,
    pub edges: Remap,
    pub faces: Remap,
    pub cells: Remap,
}

/// A tissue mesh: vertex, half-edge, face and cell tables.
///
/// Identifiers are row indices. Removing operations compact the tables before
/// returning, so surviving rows keep their relative order and new rows are
/// always appended after the existing ones.
#[derive(Debug, Clone)]
pub struct Mesh {
    kind: MeshKind,

    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) vert_segment: Vec<Segment>,
    pub(crate) vert_attrs: Columns,

    pub(crate) srce: Vec<VertId>,
    pub(crate) trgt: Vec<VertId>,
    pub(crate) edge_face: Vec<FaceId>,
    pub(crate) edge_cell: Vec<CellId>,
    pub(crate) opposite: Vec<EdgeId>,
    pub(crate) edge_segment: Vec<Segment>,
    pub(crate) edge_attrs: Columns,

    pub(crate) face_segment: Vec<Segment>,
    pub(crate) face_attrs: Columns,

    pub(crate) num_cells: usize,
    pub(crate) cell_attrs: Columns,

    settings: Settings,
    specs: ParamSpec,

    version: u64,
    topology: OnceLock<Topology>,
    pub(crate) geometry: Option<Geometry>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new(kind: MeshKind) -> Self {
        Self {
            kind,
            positions: Vec::new(),
            vert_segment: Vec::new(),
            vert_attrs: Columns::new(Element::Vert, 0),
            srce: Vec::new(),
            trgt: Vec::new(),
            edge_face: Vec::new(),
            edge_cell: Vec::new(),
            opposite: Vec::new(),
            edge_segment: Vec::new(),
            edge_attrs: Columns::new(Element::Edge, 0),
            face_segment: Vec::new(),
            face_attrs: Columns::new(Element::Face, 0),
            num_cells: 0,
            cell_attrs: Columns::new(Element::Cell, 0),
            settings: Settings::default(),
            specs: ParamSpec::default(),
            version: 0,
            topology: OnceLock::new(),
            geometry: None,
        }
    }

    /// Mesh dimensionality.
    #[inline]
    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    // ==================== Accessors ====================

    /// Number of vertices.
    #[inline]
    pub fn nv(&self) -> usize {
        self.positions.len()
    }

    /// Number of half-edges.
    #[inline]
    pub fn ne(&self) -> usize {
        self.srce.len()
    }

    /// Number of faces.
    #[inline]
    pub fn nf(&self) -> usize {
        self.face_segment.len()
    }

    /// Number of cells.
    #[inline]
    pub fn nc(&self) -> usize {
        self.num_cells
    }

    /// All four row counts.
    pub fn counts(&self) -> Counts {
        Counts {
            nv: self.nv(),
            ne: self.ne(),
            nf: self.nf(),
            nc: self.nc(),
        }
    }

    /// Position of a vertex.
    #[inline]
    pub fn position(&self, v: VertId) -> Point3<f64> {
        self.positions[v.index()]
    }

    /// All vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Move a vertex. Invalidates derived geometry.
    pub fn set_position(&mut self, v: VertId, pos: Point3<f64>) {
        self.positions[v.index()] = pos;
        self.version += 1;
    }

    /// Translate every vertex by `delta[v]`. Invalidates derived geometry.
    pub fn displace(&mut self, delta: &[Vector3<f64>]) -> Result<()> {
        if delta.len() != self.nv() {
            return Err(MeshError::invalid_param(
                "delta",
                delta.len(),
                "one displacement per vertex is required",
            ));
        }
        for (p, d) in self.positions.iter_mut().zip(delta) {
            *p += d;
        }
        self.version += 1;
        Ok(())
    }

    /// Source vertex of a half-edge.
    #[inline]
    pub fn srce(&self, e: EdgeId) -> VertId {
        self.srce[e.index()]
    }

    /// Target vertex of a half-edge.
    #[inline]
    pub fn trgt(&self, e: EdgeId) -> VertId {
        self.trgt[e.index()]
    }

    /// Face owning a half-edge.
    #[inline]
    pub fn edge_face(&self, e: EdgeId) -> FaceId {
        self.edge_face[e.index()]
    }

    /// Cell owning a half-edge, `None` on sheets.
    #[inline]
    pub fn edge_cell(&self, e: EdgeId) -> Option<CellId> {
        self.edge_cell[e.index()].valid()
    }

    /// Opposite half-edge, `None` on a border.
    #[inline]
    pub fn opposite(&self, e: EdgeId) -> Option<EdgeId> {
        self.opposite[e.index()].valid()
    }

    /// Whether a half-edge has no opposite.
    #[inline]
    pub fn is_border_edge(&self, e: EdgeId) -> bool {
        !self.opposite[e.index()].is_valid()
    }

    /// Segment label of a vertex.
    #[inline]
    pub fn vert_segment(&self, v: VertId) -> Segment {
        self.vert_segment[v.index()]
    }

    /// Segment label of a half-edge.
    #[inline]
    pub fn edge_segment(&self, e: EdgeId) -> Segment {
        self.edge_segment[e.index()]
    }

    /// Segment label of a face.
    #[inline]
    pub fn face_segment(&self, f: FaceId) -> Segment {
        self.face_segment[f.index()]
    }

    /// Relabel a face and its half-edges.
    pub fn set_face_segment(&mut self, f: FaceId, segment: Segment) {
        self.face_segment[f.index()] = segment;
        for e in 0..self.ne() {
            if self.edge_face[e] == f {
                self.edge_segment[e] = segment;
            }
        }
    }

    /// Whether any face carries an apical/basal/lateral label.
    pub fn has_segments(&self) -> bool {
        self.face_segment.iter().any(|&s| s != Segment::Unset)
    }

    /// Length of a half-edge, computed from current positions.
    pub fn edge_length(&self, e: EdgeId) -> f64 {
        (self.position(self.trgt(e)) - self.position(self.srce(e))).norm()
    }

    /// Mean position of a face's vertices, computed from current positions.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        mean_point(self.face_edges(f).iter().map(|&e| self.position(self.srce(e))))
    }

    // ==================== Identifiers ====================

    /// Iterate over all vertex ids.
    pub fn vert_ids(&self) -> impl Iterator<Item = VertId> + '_ {
        (0..self.nv()).map(VertId::new)
    }

    /// Iterate over all half-edge ids.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.ne()).map(EdgeId::new)
    }

    /// Iterate over all face ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.nf()).map(FaceId::new)
    }

    /// Iterate over all cell ids.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.nc()).map(CellId::new)
    }

    pub(crate) fn check_vert(&self, v: VertId) -> Result<()> {
        check(Element::Vert, v.index(), v.is_valid(), self.nv())
    }

    pub(crate) fn check_edge(&self, e: EdgeId) -> Result<()> {
        check(Element::Edge, e.index(), e.is_valid(), self.ne())
    }

    pub(crate) fn check_face(&self, f: FaceId) -> Result<()> {
        check(Element::Face, f.index(), f.is_valid(), self.nf())
    }

    pub(crate) fn check_cell(&self, c: CellId) -> Result<()> {
        check(Element::Cell, c.index(), c.is_valid(), self.nc())
    }

    // ==================== Attributes ====================

    fn columns(&self, element: Element) -> &Columns {
        match element {
            Element::Vert => &self.vert_attrs,
            Element::Edge => &self.edge_attrs,
            Element::Face => &self.face_attrs,
            Element::Cell => &self.cell_attrs,
        }
    }

    fn columns_mut(&mut self, element: Element) -> &mut Columns {
        match element {
            Element::Vert => &mut self.vert_attrs,
            Element::Edge => &mut self.edge_attrs,
            Element::Face => &mut self.face_attrs,
            Element::Cell => &mut self.cell_attrs,
        }
    }

    /// Column of `attr` for `element`.
    ///
    /// Empty when the element's schema does not carry the attribute.
    pub fn attr(&self, element: Element, attr: Attr) -> &[f64] {
        self.columns(element).get(attr).unwrap_or(&[])
    }

    /// Mutable column of `attr` for `element`.
    pub fn attr_mut(&mut self, element: Element, attr: Attr) -> &mut [f64] {
        self.columns_mut(element).get_mut(attr).unwrap_or(&mut [])
    }

    /// Install a parameter spec: every named column is set to its value and
    /// the settings section is applied.
    ///
    /// All names are checked against the schema before anything is written.
    pub fn update_specs(&mut self, spec: &ParamSpec) -> Result<()> {
        let mut writes = Vec::new();
        for element in Element::ALL {
            for (name, &value) in spec.section(element) {
                let attr = element.attr(name).ok_or_else(|| MeshError::UnknownAttribute {
                    element,
                    name: name.clone(),
                })?;
                writes.push((element, attr, value));
            }
        }
        for (element, attr, value) in writes {
            self.columns_mut(element).fill(attr, value);
        }
        let shift = self.settings.basal_shift;
        self.settings.update(&spec.settings);
        if self.settings.basal_shift != shift {
            self.version += 1;
        }
        self.specs.merge(spec);
        Ok(())
    }

    /// Scalar settings read by geometry and transitions.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings. Invalidates derived geometry, whose heights
    /// depend on `basal_shift`.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.version += 1;
    }

    /// Set the IH threshold. Derived geometry stays valid.
    pub fn set_threshold_length(&mut self, length: f64) {
        self.settings.threshold_length = length;
    }

    /// The specs installed so far.
    pub fn specs(&self) -> &ParamSpec {
        &self.specs
    }

    // ==================== Orbits ====================

    /// Cached orbit index, built on first use after a topology change.
    pub fn topology(&self) -> &Topology {
        self.topology.get_or_init(|| Topology::build(self))
    }

    /// Half-edges of a face in cycle order.
    pub fn face_edges(&self, f: FaceId) -> &[EdgeId] {
        &self.topology().face_edges[f.index()]
    }

    /// Vertices of a face in cycle order.
    pub fn face_verts(&self, f: FaceId) -> Vec<VertId> {
        self.face_edges(f).iter().map(|&e| self.srce(e)).collect()
    }

    /// Number of sides of a face.
    pub fn num_sides(&self, f: FaceId) -> usize {
        self.face_edges(f).len()
    }

    /// Cell owning a face, `None` on sheets.
    pub fn face_cell(&self, f: FaceId) -> Option<CellId> {
        self.topology().face_cell[f.index()].valid()
    }

    /// Faces of a cell.
    pub fn cell_faces(&self, c: CellId) -> &[FaceId] {
        &self.topology().cell_faces[c.index()]
    }

    /// Half-edges of a cell.
    pub fn cell_edges(&self, c: CellId) -> Vec<EdgeId> {
        self.cell_faces(c)
            .iter()
            .flat_map(|&f| self.face_edges(f).iter().copied())
            .collect()
    }

    /// Distinct vertices of a cell, sorted.
    pub fn cell_verts(&self, c: CellId) -> Vec<VertId> {
        let mut verts: Vec<VertId> = self.cell_edges(c).iter().map(|&e| self.srce(e)).collect();
        verts.sort_unstable();
        verts.dedup();
        verts
    }

    /// Outgoing half-edges of a vertex.
    pub fn vert_edges(&self, v: VertId) -> &[EdgeId] {
        &self.topology().vert_edges[v.index()]
    }

    /// Faces containing a vertex, sorted.
    pub fn vert_faces(&self, v: VertId) -> Vec<FaceId> {
        let mut faces: Vec<FaceId> = self.vert_edges(v).iter().map(|&e| self.edge_face(e)).collect();
        faces.sort_unstable();
        faces.dedup();
        faces
    }

    /// Cells containing a vertex, sorted.
    pub fn vert_cells(&self, v: VertId) -> Vec<CellId> {
        let mut cells: Vec<CellId> = self
            .vert_edges(v)
            .iter()
            .filter_map(|&e| self.edge_cell(e))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }

    /// Generic orbit query: the `to` elements reachable from element `index`
    /// of kind `from`, sorted and deduplicated.
    pub fn orbit(&self, from: Element, index: usize, to: Element) -> Result<Vec<usize>> {
        let edges: Vec<EdgeId> = match from {
            Element::Vert => {
                let v = VertId::new(index);
                self.check_vert(v)?;
                self.vert_edges(v).to_vec()
            }
            Element::Edge => {
                let e = EdgeId::new(index);
                self.check_edge(e)?;
                vec![e]
            }
            Element::Face => {
                let f = FaceId::new(index);
                self.check_face(f)?;
                self.face_edges(f).to_vec()
            }
            Element::Cell => {
                let c = CellId::new(index);
                self.check_cell(c)?;
                self.cell_edges(c)
            }
        };
        let mut out: Vec<usize> = edges
            .iter()
            .filter_map(|&e| match to {
                Element::Vert => Some(self.srce(e).index()),
                Element::Edge => Some(e.index()),
                Element::Face => Some(self.edge_face(e).index()),
                Element::Cell => self.edge_cell(e).map(CellId::index),
            })
            .collect();
        if from == Element::Edge && to == Element::Vert {
            out.push(self.trgt(EdgeId::new(index)).index());
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    // ==================== Geometry ====================

    /// Mutation counter, bumped by every position or topology change.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Derived geometry, if it was computed for the current mesh state.
    pub fn geometry(&self) -> Result<&Geometry> {
        match &self.geometry {
            Some(geom) if geom.version == self.version => Ok(geom),
            _ => Err(MeshError::StaleGeometry),
        }
    }

    /// Whether the stored geometry matches the current mesh state.
    pub fn is_geometry_fresh(&self) -> bool {
        self.geometry().is_ok()
    }

    // ==================== Construction ====================

    /// Append a vertex with default attributes.
    pub(crate) fn push_vertex(&mut self, pos: Point3<f64>, segment: Segment) -> VertId {
        self.positions.push(pos);
        self.vert_segment.push(segment);
        self.vert_attrs.push_default();
        self.version += 1;
        VertId::new(self.nv() - 1)
    }

    /// Append a vertex copying the attributes and segment of `template`.
    pub(crate) fn push_vertex_like(&mut self, template: VertId, pos: Point3<f64>) -> VertId {
        let segment = self.vert_segment[template.index()];
        self.positions.push(pos);
        self.vert_segment.push(segment);
        self.vert_attrs.push_copy(template.index());
        self.version += 1;
        VertId::new(self.nv() - 1)
    }

    /// Append a half-edge. Attributes are copied from `template` when given;
    /// the segment follows the owning face.
    pub(crate) fn push_edge(
        &mut self,
        srce: VertId,
        trgt: VertId,
        face: FaceId,
        cell: CellId,
        template: Option<EdgeId>,
    ) -> EdgeId {
        self.srce.push(srce);
        self.trgt.push(trgt);
        self.edge_face.push(face);
        self.edge_cell.push(cell);
        self.opposite.push(EdgeId::invalid());
        self.edge_segment
            .push(self.face_segment.get(face.index()).copied().unwrap_or_default());
        match template {
            Some(t) => self.edge_attrs.push_copy(t.index()),
            None => self.edge_attrs.push_default(),
        }
        self.touch_topology();
        EdgeId::new(self.ne() - 1)
    }

    /// Append a face, copying attributes from `template` when given.
    pub(crate) fn push_face(&mut self, segment: Segment, template: Option<FaceId>) -> FaceId {
        self.face_segment.push(segment);
        match template {
            Some(t) => self.face_attrs.push_copy(t.index()),
            None => self.face_attrs.push_default(),
        }
        self.touch_topology();
        FaceId::new(self.nf() - 1)
    }

    /// Append a cell, copying attributes from `template` when given.
    pub(crate) fn push_cell(&mut self, template: Option<CellId>) -> CellId {
        self.num_cells += 1;
        match template {
            Some(t) => self.cell_attrs.push_copy(t.index()),
            None => self.cell_attrs.push_default(),
        }
        self.touch_topology();
        CellId::new(self.nc() - 1)
    }

    pub(crate) fn set_vert_segment(&mut self, v: VertId, segment: Segment) {
        self.vert_segment[v.index()] = segment;
    }

    /// Delete flagged rows and renumber every reference.
    pub(crate) fn compact(&mut self, removal: &Removal) -> Remaps {
        let verts = Remap::from_mask(&removal.verts);
        let edges = Remap::from_mask(&removal.edges);
        let faces = Remap::from_mask(&removal.faces);
        let cells = Remap::from_mask(&removal.cells);

        retain_rows(&mut self.positions, &removal.verts);
        retain_rows(&mut self.vert_segment, &removal.verts);
        self.vert_attrs.retain(&removal.verts);

        retain_rows(&mut self.srce, &removal.edges);
        retain_rows(&mut self.trgt, &removal.edges);
        retain_rows(&mut self.edge_face, &removal.edges);
        retain_rows(&mut self.edge_cell, &removal.edges);
        retain_rows(&mut self.opposite, &removal.edges);
        retain_rows(&mut self.edge_segment, &removal.edges);
        self.edge_attrs.retain(&removal.edges);

        retain_rows(&mut self.face_segment, &removal.faces);
        self.face_attrs.retain(&removal.faces);

        self.num_cells = cells.len();
        self.cell_attrs.retain(&removal.cells);

        let remap_vert = |v: VertId| verts.get(v.index()).map_or(VertId::invalid(), VertId::new);
        for v in self.srce.iter_mut().chain(self.trgt.iter_mut()) {
            *v = remap_vert(*v);
        }
        for f in self.edge_face.iter_mut() {
            *f = faces.get(f.index()).map_or(FaceId::invalid(), FaceId::new);
        }
        for c in self.edge_cell.iter_mut() {
            if c.is_valid() {
                *c = cells.get(c.index()).map_or(CellId::invalid(), CellId::new);
            }
        }

        self.reset_topo();
        Remaps {
            verts,
            edges,
            faces,
            cells,
        }
    }

    /// Recompute every opposite from the half-edge table and drop the cached
    /// orbits. Called after any connectivity change.
    pub fn reset_topo(&mut self) {
        let bulk = self.kind == MeshKind::Bulk;
        let key = |e: usize, s: VertId, t: VertId| {
            let cell = if bulk { self.edge_cell[e] } else { CellId::invalid() };
            (s, t, cell)
        };

        let mut index: HashMap<(VertId, VertId, CellId), EdgeId> = HashMap::with_capacity(self.ne());
        for e in 0..self.ne() {
            index
                .entry(key(e, self.srce[e], self.trgt[e]))
                .or_insert(EdgeId::new(e));
        }
        let opposite: Vec<EdgeId> = (0..self.ne())
            .map(|e| {
                index
                    .get(&key(e, self.trgt[e], self.srce[e]))
                    .copied()
                    .unwrap_or_default()
            })
            .collect();

        self.opposite = opposite;
        self.touch_topology();
    }

    fn touch_topology(&mut self) {
        self.version += 1;
        self.topology = OnceLock::new();
    }
}

fn check(element: Element, index: usize, valid: bool, len: usize) -> Result<()> {
    if valid && index < len {
        Ok(())
    } else {
        Err(MeshError::NotFound { element, index })
    }
}

/// Arithmetic mean of a set of points; the origin for an empty set.
pub(crate) fn mean_point(points: impl Iterator<Item = Point3<f64>>) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    let mut n = 0usize;
    for p in points {
        sum += p.coords;
        n += 1;
    }
    if n == 0 {
        Point3::origin()
    } else {
        Point3::from(sum / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generation;

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::new(MeshKind::Sheet);
        assert_eq!(mesh.counts(), Counts::default());
        assert!(mesh.geometry().is_err());
    }

    #[test]
    fn test_opposites_on_square_pair() {
        let mesh = generation::square_pair().unwrap();
        let mut shared = 0;
        for e in mesh.edge_ids() {
            if let Some(o) = mesh.opposite(e) {
                assert_eq!(mesh.opposite(o), Some(e));
                assert_eq!(mesh.srce(o), mesh.trgt(e));
                shared += 1;
            }
        }
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_orbits() {
        let mesh = generation::square_pair().unwrap();
        let f0 = FaceId::new(0);
        assert_eq!(mesh.num_sides(f0), 4);
        let verts = mesh.face_verts(f0);
        assert_eq!(verts.len(), 4);
        for (i, &e) in mesh.face_edges(f0).iter().enumerate() {
            assert_eq!(mesh.srce(e), verts[i]);
            assert_eq!(mesh.trgt(e), verts[(i + 1) % 4]);
        }
        // vertices 1 and 4 lie on the shared junction
        assert_eq!(mesh.vert_faces(VertId::new(1)).len(), 2);
        assert_eq!(mesh.orbit(Element::Face, 1, Element::Vert).unwrap().len(), 4);
        assert_eq!(mesh.orbit(Element::Edge, 0, Element::Vert).unwrap().len(), 2);
        assert_eq!(mesh.orbit(Element::Vert, 1, Element::Face).unwrap(), vec![0, 1]);
        assert!(matches!(
            mesh.orbit(Element::Vert, 6, Element::Face),
            Err(MeshError::NotFound { element: Element::Vert, index: 6 })
        ));
    }

    #[test]
    fn test_bulk_orbits() {
        let mesh = generation::unit_cube().unwrap();
        let c = CellId::new(0);
        assert_eq!(mesh.cell_faces(c).len(), 6);
        assert_eq!(mesh.cell_verts(c).len(), 8);
        assert_eq!(mesh.vert_cells(VertId::new(0)), vec![c]);
        assert_eq!(mesh.face_cell(FaceId::new(3)), Some(c));
        for e in mesh.edge_ids() {
            assert!(mesh.opposite(e).is_some());
        }
    }

    #[test]
    fn test_version_tracks_mutation() {
        let mut mesh = generation::square_pair().unwrap();
        let v0 = mesh.version();
        mesh.set_position(VertId::new(0), Point3::new(-0.1, 0.0, 0.0));
        assert!(mesh.version() > v0);
        let bad = mesh.displace(&[Vector3::zeros()]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_basal_shift_invalidates_geometry() {
        let mut mesh = generation::square_pair().unwrap();
        crate::geometry::update_all(&mut mesh);

        mesh.set_threshold_length(0.5);
        assert!(mesh.is_geometry_fresh());

        let settings = Settings {
            basal_shift: 2.0,
            ..mesh.settings().clone()
        };
        mesh.set_settings(settings);
        assert!(matches!(mesh.geometry(), Err(MeshError::StaleGeometry)));

        crate::geometry::update_all(&mut mesh);
        let spec = ParamSpec::default().with_setting("basal_shift", 3.0);
        mesh.update_specs(&spec).unwrap();
        assert!(!mesh.is_geometry_fresh());
    }

    #[test]
    fn test_update_specs_rejects_unknown_names() {
        let mut mesh = generation::square_pair().unwrap();
        let mut spec = ParamSpec::default();
        spec.set(Element::Face, "contractility", 0.5);
        spec.set(Element::Edge, "not_an_attribute", 1.0);
        let err = mesh.update_specs(&spec);
        assert!(matches!(err, Err(MeshError::UnknownAttribute { .. })));
        // nothing was written
        assert!(mesh.attr(Element::Face, Attr::Contractility).iter().all(|&c| c == 0.0));

        let mut spec = ParamSpec::default();
        spec.set(Element::Face, "contractility", 0.5);
        spec.settings.insert("threshold_length".into(), 0.2);
        mesh.update_specs(&spec).unwrap();
        assert!(mesh.attr(Element::Face, Attr::Contractility).iter().all(|&c| c == 0.5));
        assert_eq!(mesh.settings().threshold_length, 0.2);
        assert_eq!(mesh.specs().get(Element::Face, "contractility"), Some(0.5));
    }

    #[test]
    fn test_compact_renumbers() {
        let mut mesh = generation::square_pair().unwrap();
        let mut removal = Removal::for_counts(mesh.counts());
        // drop face 0, its half-edges and the two vertices only it uses
        for e in 0..mesh.ne() {
            if mesh.edge_face[e] == FaceId::new(0) {
                removal.edges[e] = true;
            }
        }
        removal.faces[0] = true;
        removal.verts[0] = true;
        removal.verts[3] = true;
        mesh.compact(&removal);
        assert_eq!(mesh.counts().nf, 1);
        assert_eq!(mesh.counts().nv, 4);
        assert!(mesh.edge_ids().all(|e| mesh.edge_face(e) == FaceId::new(0)));
        assert!(mesh.validate().is_empty());
    }
}
