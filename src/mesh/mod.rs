//! Core mesh data structures.
//!
//! This module provides the half-edge tables shared by flat sheets and 3D
//! monolayers, their attribute columns and their orbit queries.
//!
//! # Overview
//!
//! The primary type is [`Mesh`], which stores four tables (vertices,
//! half-edges, faces, cells) as parallel columns. The half-edge table is the
//! single source of truth for connectivity; faces and cells are the sets of
//! half-edges that name them.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertId`] - Identifies a vertex
//! - [`EdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`CellId`] - Identifies a cell
//!
//! # Construction
//!
//! ```
//! use epithelium::mesh::{extrude, generation, Segment};
//!
//! let sheet = generation::hexagonal_sheet(3, 3).unwrap();
//! let mono = extrude(&sheet, 1.0).unwrap();
//!
//! assert_eq!(mono.nc(), 9);
//! let apical = mono
//!     .face_ids()
//!     .filter(|&f| mono.face_segment(f) == Segment::Apical)
//!     .count();
//! assert_eq!(apical, 9);
//! ```

mod attributes;
mod builder;
pub mod generation;
mod halfedge;
mod index;
mod topology;
mod validate;

pub use attributes::{Attr, Element, Segment};
pub use builder::{build_bulk, build_sheet, extrude, to_face_vertex};
pub use halfedge::{Counts, Mesh, MeshKind};
pub(crate) use halfedge::{mean_point, Removal};
pub use index::{CellId, EdgeId, FaceId, VertId};
pub use topology::Topology;
pub use validate::Violation;
