//! Tuplet engraver.
//!
//! Engraves a bracket over (or under) the member notes with the ratio
//! label at its center. Tuplets never cross a system break, so only the
//! single-system path exists.

use crate::engravers::{
    note_stem_up, store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{
    TUPLET_BRACKET_DISTANCE, TUPLET_BRACKET_HOOK, TUPLET_NUMBER_HEIGHT,
};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct TupletEngraver {
    anchors: RelAnchors,
    label: String,
}

impl TupletEngraver {
    pub fn new(relation: RelationId, label: impl Into<String>) -> Self {
        Self {
            anchors: RelAnchors::new(relation),
            label: label.into(),
        }
    }
}

impl RelObjEngraver for TupletEngraver {
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
        let (start, end) = self.anchors.require_complete()?;
        let x0 = ctx.tree.bounds(start.shape).x;
        let x1 = ctx.tree.bounds(end.shape).right();

        // bracket on the stem side of the first note
        let above = note_stem_up(ctx.tree, start.shape).unwrap_or(true);
        let distance = ctx.tenths(TUPLET_BRACKET_DISTANCE, &start);
        let hook = ctx.tenths(TUPLET_BRACKET_HOOK, &start);
        let number_h = ctx.tenths(TUPLET_NUMBER_HEIGHT, &start);

        let bracket_y = if above {
            ctx.profile
                .min_for_or(x0, x1, start.abs_staff, ctx.profile.staff_top(start.abs_staff))
                - distance
        } else {
            ctx.profile
                .max_for_or(x0, x1, start.abs_staff, ctx.profile.staff_bottom(start.abs_staff))
                + distance
        };

        let tuplet = ctx
            .tree
            .add_composite(ShapeKind::TupletBracket, Some(start.staffobj), ShapeLayer::AuxObjs);
        let bracket_rect = if above {
            Rect::new(x0, bracket_y - hook, x1 - x0, hook)
        } else {
            Rect::new(x0, bracket_y, x1 - x0, hook)
        };
        let bracket = ctx.tree.add_simple(
            ShapeKind::TupletBracket,
            Some(start.staffobj),
            bracket_rect,
            ShapeLayer::AuxObjs,
        );
        ctx.tree.add_component(tuplet, bracket);

        let number_w = number_h * 0.6 * self.label.len().max(1) as f64;
        let center = (x0 + x1) / 2.0;
        let number_rect = if above {
            Rect::new(center - number_w / 2.0, bracket_rect.top() - number_h, number_w, number_h)
        } else {
            Rect::new(center - number_w / 2.0, bracket_rect.bottom(), number_w, number_h)
        };
        let number = ctx.tree.add_simple(
            ShapeKind::Text,
            Some(start.staffobj),
            number_rect,
            ShapeLayer::AuxObjs,
        );
        ctx.tree.add_component(tuplet, number);

        ctx.profile.update_shape(ctx.tree, tuplet, start.abs_staff);
        store_system_shape(ctx, tuplet, start.system, start.instr);
        Ok(vec![tuplet])
    }
}
