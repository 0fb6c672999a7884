//! Chord engraver.
//!
//! A chord produces no shape of its own: it merges its member notes
//! onto one shared stem, flips noteheads that sit a second apart to the
//! other side of the stem, and stacks the accidentals to the left with
//! the right aligner so none of them collide.

use crate::engravers::{AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver};
use crate::error::EngraveError;
use crate::geometry::{Rect, Size};
use crate::layout::constants::{ACCIDENTAL_SPACE, STEM_LENGTH};
use crate::layout::RightAligner;
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind};

pub struct ChordEngraver {
    anchors: RelAnchors,
}

impl ChordEngraver {
    pub fn new(relation: RelationId) -> Self {
        Self { anchors: RelAnchors::new(relation) }
    }
}

impl RelObjEngraver for ChordEngraver {
    fn relation(&self) -> RelationId {
        self.anchors.relation()
    }

    fn set_start_staffobj(&mut self, anchor: AnchorInfo) {
        self.anchors.on_start(anchor);
    }

    fn set_middle_staffobj(&mut self, anchor: AnchorInfo) {
        self.anchors.on_middle(anchor);
    }

    fn set_end_staffobj(&mut self, anchor: AnchorInfo) {
        self.anchors.on_end(anchor);
    }

    fn create_shapes(&mut self, ctx: &mut EngraveContext) -> Result<Vec<ShapeId>, EngraveError> {
        let (start, _end) = self.anchors.require_complete()?;
        // member noteheads sorted top to bottom
        let mut heads: Vec<(ShapeId, ShapeId)> = Vec::new(); // (note, head)
        for a in self.anchors.all() {
            if let Some(head) = ctx.tree.component_of_kind(a.shape, ShapeKind::Notehead) {
                heads.push((a.shape, head));
            }
        }
        if heads.len() < 2 {
            return Err(EngraveError::IncompleteRelation {
                relation: self.anchors.relation(),
                detail: "chord needs at least two notes".into(),
            });
        }
        heads.sort_by(|a, b| {
            ctx.tree
                .bounds(a.1)
                .y
                .partial_cmp(&ctx.tree.bounds(b.1).y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let stem_up = self.merge_stems(ctx, &heads, &start);
        self.flip_seconds(ctx, &heads, stem_up);
        self.stack_accidentals(ctx, &heads, &start);
        Ok(Vec::new())
    }
}

impl ChordEngraver {
    /// Keep one stem running through all noteheads, drop the others.
    /// Returns whether the kept stem points up.
    fn merge_stems(
        &self,
        ctx: &mut EngraveContext,
        heads: &[(ShapeId, ShapeId)],
        start: &AnchorInfo,
    ) -> bool {
        let mut kept: Option<ShapeId> = None;
        let mut stem_up = true;
        for &(note, head) in heads {
            let Some(stem) = ctx.tree.component_of_kind(note, ShapeKind::Stem) else {
                continue;
            };
            match kept {
                None => {
                    let head_b = ctx.tree.bounds(head);
                    let stem_b = ctx.tree.bounds(stem);
                    stem_up = stem_b.y + stem_b.height / 2.0 < head_b.y + head_b.height / 2.0;
                    kept = Some(stem);
                }
                Some(_) => ctx.tree.remove_shape(stem),
            }
        }
        let Some(stem) = kept else { return stem_up };

        let top_center = center_y(ctx, heads[0].1);
        let bottom_center = center_y(ctx, heads[heads.len() - 1].1);
        let b = ctx.tree.bounds(stem);
        let reach = ctx.tenths(STEM_LENGTH, start);
        let rect = if stem_up {
            Rect::new(b.x, top_center - reach, b.width, bottom_center - top_center + reach)
        } else {
            Rect::new(b.x, top_center, b.width, bottom_center - top_center + reach)
        };
        ctx.tree.set_bounds(stem, rect);
        stem_up
    }

    /// Flip every notehead forming a second with the one before it to
    /// the other side of the stem.
    fn flip_seconds(&self, ctx: &mut EngraveContext, heads: &[(ShapeId, ShapeId)], stem_up: bool) {
        let mut prev_flipped = false;
        for i in 1..heads.len() {
            let above = ctx.tree.bounds(heads[i - 1].1);
            let cur = ctx.tree.bounds(heads[i].1);
            let is_second = (cur.y - above.y) < above.height * 0.9;
            if is_second && !prev_flipped {
                let dx = if stem_up { cur.width } else { -cur.width };
                ctx.tree.shift_shape(heads[i].1, Size::new(dx, 0.0));
                prev_flipped = true;
            } else {
                prev_flipped = false;
            }
        }
    }

    /// Stack all accidentals of the chord to the left of the leftmost
    /// notehead, top to bottom, without overlaps.
    fn stack_accidentals(
        &self,
        ctx: &mut EngraveContext,
        heads: &[(ShapeId, ShapeId)],
        start: &AnchorInfo,
    ) {
        let mut accidentals: Vec<ShapeId> = Vec::new();
        for &(note, _) in heads {
            if let Some(acc) = ctx.tree.component_of_kind(note, ShapeKind::AccidentalGlyph) {
                accidentals.push(acc);
            }
        }
        if accidentals.is_empty() {
            return;
        }

        let chord_left = heads
            .iter()
            .map(|&(_, head)| ctx.tree.bounds(head).x)
            .fold(f64::INFINITY, f64::min);
        let gap = ctx.tenths(ACCIDENTAL_SPACE, start);

        let mut aligner = RightAligner::new();
        let mut placed: Vec<(ShapeId, usize)> = Vec::new();
        for &acc in &accidentals {
            let b = ctx.tree.bounds(acc);
            let idx = aligner.add_box(Rect::new(0.0, b.y, b.width + gap, b.height));
            placed.push((acc, idx));
        }

        let total = aligner.get_total_width();
        for (acc, idx) in placed {
            if let Some(slot) = aligner.get_box(idx) {
                let b = ctx.tree.bounds(acc);
                let target_x = chord_left - total + slot.x;
                ctx.tree.shift_shape(acc, Size::new(target_x - b.x, 0.0));
            }
        }
    }
}

fn center_y(ctx: &EngraveContext, shape: ShapeId) -> f64 {
    let b = ctx.tree.bounds(shape);
    b.y + b.height / 2.0
}
