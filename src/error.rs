//! Error types for epithelium.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::mesh::{CellId, EdgeId, Element, FaceId, MeshKind, VertId, Violation};

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three distinct vertices.
    #[error("face {face} is degenerate (fewer than 3 distinct vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A parameter required by an effector or a computation is absent.
    #[error("{owner} requires {element} attribute `{name}`, which is absent from the specs")]
    MissingAttribute {
        /// Who asked for the attribute.
        owner: &'static str,
        /// Element kind of the attribute.
        element: Element,
        /// Attribute name.
        name: String,
    },

    /// An effector governs an element kind the specs say nothing about.
    #[error("{owner} governs {element} but the specs define no {element} attribute")]
    EmptyElement {
        /// The effector label.
        owner: &'static str,
        /// The governed element kind.
        element: Element,
    },

    /// A spec names an attribute outside the element's schema.
    #[error("`{name}` is not a {element} attribute")]
    UnknownAttribute {
        /// Element kind of the section.
        element: Element,
        /// Offending name.
        name: String,
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

    /// Derived geometry was read after a position or topology change.
    #[error("derived geometry is stale, run a geometry update first")]
    StaleGeometry,

    /// An identifier does not address a live row.
    #[error("{element} {index} does not exist")]
    NotFound {
        /// Element kind.
        element: Element,
        /// Row index.
        index: usize,
    },

    /// The operation is only defined for other mesh kinds.
    #[error("{operation} is not supported on {kind} meshes")]
    UnsupportedKind {
        /// Operation name.
        operation: &'static str,
        /// Kind of the mesh it was called on.
        kind: MeshKind,
    },

    /// HI and T2 only remove triangular faces.
    #[error("face {face:?} has {sides} sides, a triangle is required")]
    NotTriangular {
        /// The face.
        face: FaceId,
        /// Its number of sides.
        sides: usize,
    },

    /// IH only splits edges at or below the threshold length.
    #[error("edge {edge:?} is {length} long, above the threshold {threshold}")]
    EdgeTooLong {
        /// The edge.
        edge: EdgeId,
        /// Its length.
        length: f64,
        /// `settings.threshold_length`.
        threshold: f64,
    },

    /// A face along the edge would drop below three sides.
    #[error("edge {edge:?} borders face {face:?}, which has too few sides")]
    AdjacentTriangle {
        /// The edge.
        edge: EdgeId,
        /// The face that would degenerate.
        face: FaceId,
    },

    /// The edge lies on the border of the sheet.
    #[error("edge {edge:?} lies on the border")]
    BorderEdge {
        /// The edge.
        edge: EdgeId,
    },

    /// The neighbourhood is not the generic junction the transition expects.
    #[error("irregular junction at vertex {vert:?}: {details}")]
    IrregularJunction {
        /// A vertex of the junction.
        vert: VertId,
        /// What was found instead.
        details: String,
    },

    /// A face would be left with fewer than three sides.
    #[error("face {face:?} would be left with {sides} sides")]
    WouldDegenerate {
        /// The face.
        face: FaceId,
        /// Sides it would keep.
        sides: usize,
    },

    /// The division plane does not cut the element in two.
    #[error("division plane crosses {crossings} edges of {element} {index}, expected a clean cut")]
    NoDivisionPlane {
        /// Element kind.
        element: Element,
        /// Row index.
        index: usize,
        /// Number of crossed edges found.
        crossings: usize,
    },

    /// The cell has no face labelled apical.
    #[error("cell {cell:?} has no apical face")]
    ApicalFaceNotFound {
        /// The cell.
        cell: CellId,
    },

    /// Apoptosis needs a triangular lateral face to eliminate.
    #[error("cell {cell:?} has no triangular lateral face")]
    NoLateralTriangle {
        /// The cell.
        cell: CellId,
    },

    /// A transition produced a mesh breaking a structural invariant. The mesh
    /// was left untouched.
    #[error("{operation} would break {} structural invariant(s), first: {}", .violations.len(), first_violation(.violations))]
    InvariantViolation {
        /// Operation name.
        operation: &'static str,
        /// Every violation found on the candidate mesh.
        violations: Vec<Violation>,
    },
}

fn first_violation(violations: &[Violation]) -> String {
    violations
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
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

    /// Whether the error reports a violated precondition, detected before any
    /// mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MeshError::NotFound { .. }
                | MeshError::UnsupportedKind { .. }
                | MeshError::NotTriangular { .. }
                | MeshError::EdgeTooLong { .. }
                | MeshError::AdjacentTriangle { .. }
                | MeshError::BorderEdge { .. }
                | MeshError::IrregularJunction { .. }
                | MeshError::WouldDegenerate { .. }
                | MeshError::NoDivisionPlane { .. }
        )
    }
}
