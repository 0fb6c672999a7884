//! Volta bracket engraver.
//!
//! A first/second ending bracket above the staff: a horizontal line
//! with downward jogs at its ends and the ending text ("1.", "2.")
//! near the left jog. Crossing a system break produces one bracket per
//! system; only the first segment carries the text and the left jog.

use crate::engravers::{
    store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver, SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{
    VOLTA_BRACKET_DISTANCE, VOLTA_JOG_LENGTH, VOLTA_TEXT_SPACE,
};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct VoltaEngraver {
    anchors: RelAnchors,
    text: String,
    /// Segments engraved so far; the text goes on the first only.
    segments: usize,
}

impl VoltaEngraver {
    pub fn new(relation: RelationId, text: impl Into<String>) -> Self {
        Self {
            anchors: RelAnchors::new(relation),
            text: text.into(),
            segments: 0,
        }
    }

    fn engrave_segment(
        &mut self,
        ctx: &mut EngraveContext,
        x0: f64,
        x1: f64,
        anchor: &AnchorInfo,
        system: usize,
    ) -> ShapeId {
        let distance = ctx.tenths(VOLTA_BRACKET_DISTANCE, anchor);
        let jog = ctx.tenths(VOLTA_JOG_LENGTH, anchor);
        let ceiling = ctx.profile.min_for_or(
            x0,
            x1,
            anchor.abs_staff,
            ctx.profile.staff_top(anchor.abs_staff),
        );
        let top = ceiling - distance - jog;

        let volta = ctx
            .tree
            .add_composite(ShapeKind::VoltaBracket, Some(anchor.staffobj), ShapeLayer::AuxObjs);
        let line = ctx.tree.add_simple(
            ShapeKind::VoltaBracket,
            Some(anchor.staffobj),
            Rect::new(x0, top, (x1 - x0).max(1.0), jog),
            ShapeLayer::AuxObjs,
        );
        ctx.tree.add_component(volta, line);

        if self.segments == 0 && !self.text.is_empty() {
            let gap = ctx.tenths(VOLTA_TEXT_SPACE, anchor);
            let h = jog * 0.9;
            let w = h * 0.6 * self.text.len() as f64;
            let text = ctx.tree.add_simple(
                ShapeKind::Text,
                Some(anchor.staffobj),
                Rect::new(x0 + gap, top + gap, w, h),
                ShapeLayer::AuxObjs,
            );
            ctx.tree.add_component(volta, text);
        }
        self.segments += 1;

        ctx.profile.update_shape(ctx.tree, volta, anchor.abs_staff);
        store_system_shape(ctx, volta, system, anchor.instr);
        volta
    }
}

impl RelObjEngraver for VoltaEngraver {
    fn relation(&self) -> RelationId {
        self.anchors.relation()
    }

    fn set_start_staffobj(&mut self, anchor: AnchorInfo) {
        self.anchors.on_start(anchor);
    }

    fn set_end_staffobj(&mut self, anchor: AnchorInfo) {
        self.anchors.on_end(anchor);
    }

    fn create_shapes(&mut self, ctx: &mut EngraveContext) -> Result<Vec<ShapeId>, EngraveError> {
        let (start, end) = self.anchors.require_complete()?;
        let x0 = ctx.tree.bounds(start.shape).x;
        let x1 = ctx.tree.bounds(end.shape).right();
        let shape = self.engrave_segment(ctx, x0, x1, &start, start.system);
        Ok(vec![shape])
    }

    fn create_first_or_intermediate_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (start, _end) = self.anchors.require_complete()?;
        let x0 = if span.system == start.system {
            ctx.tree.bounds(start.shape).x
        } else {
            span.x_left
        };
        Ok(Some(self.engrave_segment(ctx, x0, span.x_right, &start, span.system)))
    }

    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (_start, end) = self.anchors.require_complete()?;
        let x1 = ctx.tree.bounds(end.shape).right();
        Ok(Some(self.engrave_segment(ctx, span.x_left, x1, &end, span.system)))
    }
}
