//! engravelib: music score engraving engine.
//!
//! Takes a resolved score document (instruments, time-slice columns of
//! staff objects, relation objects) and produces a graphic model: a
//! tree of positioned shapes grouped into system and slice boxes,
//! ready for a drawing backend or for hit-testing.
//!
//! # Example
//! ```no_run
//! use engravelib::{engrave_score, LayoutOptions, ScoreDocument};
//!
//! let doc: ScoreDocument = serde_json::from_str("...").unwrap();
//! let model = engrave_score(&doc, LayoutOptions::default()).unwrap();
//! println!("systems: {}", model.systems.len());
//! ```

pub mod engravers;
pub mod error;
pub mod geometry;
pub mod graphic_model;
pub mod layout;
pub mod model;
pub mod registry;
pub mod shapes;
pub mod units;

pub use error::EngraveError;
pub use graphic_model::GraphicModel;
pub use layout::{BreakerStrategy, ColumnSystemLayouter, LayoutOptions};
pub use model::*;
pub use units::UnitConverter;

/// Engrave a document into a graphic model.
pub fn engrave_score(
    doc: &ScoreDocument,
    options: LayoutOptions,
) -> Result<GraphicModel, EngraveError> {
    ColumnSystemLayouter::new(doc, options).layout()
}

/// Engrave a document and serialize the resulting model to JSON.
/// Useful for passing the layout across FFI boundaries.
pub fn engrave_to_json(doc: &ScoreDocument, options: LayoutOptions) -> Result<String, String> {
    let model = engrave_score(doc, options).map_err(|e| e.to_string())?;
    model.to_json()
}
