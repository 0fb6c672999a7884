//! Error type for the engraving pipeline.
//!
//! Any failure here is a programming or data-integrity error in the
//! supplied document, surfaced immediately; there is no I/O and nothing
//! to retry.

use thiserror::Error;

use crate::model::{ObjId, RelationId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngraveError {
    /// A relation received a start (or end) anchor but never the
    /// matching end (or start) before finalization. Producing a shape
    /// from partial anchor data is never attempted.
    #[error("incomplete relation {relation:?}: {detail}")]
    IncompleteRelation {
        relation: RelationId,
        detail: String,
    },

    /// A relation names a member staff object that is not present in
    /// any column of the document.
    #[error("relation {relation:?} references unknown staff object {object:?}")]
    UnknownStaffObject {
        relation: RelationId,
        object: ObjId,
    },

    /// A relation has fewer than two members.
    #[error("relation {relation:?} has {count} member(s); at least 2 required")]
    DegenerateRelation { relation: RelationId, count: usize },

    /// The document has no instruments or no columns.
    #[error("document is empty: {0}")]
    EmptyDocument(String),

    /// A column index out of range or with a non-positive width.
    #[error("invalid column {index}: {detail}")]
    InvalidColumn { index: usize, detail: String },
}
