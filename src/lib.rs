//! # Epithelium
//!
//! Vertex-model mechanics and topology transitions for epithelial tissues.
//!
//! Tissues are represented as half-edge meshes: flat or curved sheets of
//! polygonal faces, and 3D monolayers of polyhedral cells with apical, basal
//! and lateral faces. On top of the mesh the crate provides the geometry
//! update, an energy functional made of independent effectors with analytic
//! gradients, the topology transitions that rearrange cells, and cell
//! behaviors such as apoptosis.
//!
//! ## Features
//!
//! - **Half-edge tables**: structure-of-arrays storage with type-safe indices
//!   and a structural validator
//! - **Geometry**: lengths, areas, normals and volumes recomputed in one pass
//! - **Energy**: line tension, contractility, area and volume elasticity and
//!   more, evaluated in parallel with `rayon`
//! - **Transitions**: T1, T2, IH/HI, face and cell division, all-or-nothing
//! - **Behaviors**: contraction, growth and apoptotic extrusion
//!
//! ## Quick Start
//!
//! ```
//! use epithelium::prelude::*;
//!
//! let mut sheet = generation::hexagonal_sheet(4, 4).unwrap();
//! let model = Model::new(vec![Box::new(LineTension), Box::new(FaceAreaElasticity)]);
//! sheet.update_specs(model.specs()).unwrap();
//! update_all(&mut sheet);
//!
//! let energy = model.compute_energy(&sheet).unwrap();
//! let grad = model.compute_gradient(&sheet).unwrap();
//! assert!(energy > 0.0);
//! assert_eq!(grad.len(), sheet.nv());
//! ```
//!
//! ## Rearranging Cells
//!
//! Transitions either succeed completely or leave the mesh untouched:
//!
//! ```
//! use epithelium::prelude::*;
//!
//! let mut mono = generation::monolayer(3, 3, 1.0).unwrap();
//! let before = mono.counts();
//!
//! // A long edge is refused and nothing changes.
//! let apical = behaviors::apical_face(&mono, CellId::new(4)).unwrap();
//! let edge = mono.face_edges(apical)[0];
//! assert!(ih_transition(&mut mono, edge).is_err());
//! assert_eq!(mono.counts(), before);
//!
//! // Raising the threshold lets it through.
//! mono.set_threshold_length(2.0);
//! let report = ih_transition(&mut mono, edge).unwrap();
//! assert_eq!(report.faces.len(), 2);
//! assert!(mono.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod behaviors;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod topology;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use epithelium::prelude::*;
/// ```
pub mod prelude {
    pub use crate::behaviors::{self, apoptosis, ApoptosisSettings, Step};
    pub use crate::dynamics::{
        Effector, FaceAreaElasticity, LineTension, Model, ParamSpec, Settings,
    };
    pub use crate::error::{MeshError, Result};
    pub use crate::geometry::{update_all, Geometry};
    pub use crate::mesh::{
        build_bulk, build_sheet, extrude, generation, CellId, EdgeId, Element, FaceId, Mesh,
        MeshKind, Segment, VertId,
    };
    pub use crate::topology::{
        collapse_face, divide_cell, divide_face, hi_transition, ih_transition, type1_transition,
        Transition,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
