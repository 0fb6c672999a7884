//! Pedal line engraver.
//!
//! A sustain-pedal line below the staff, from the press to the release
//! anchor. Crossing systems produces one line segment per system.

use crate::engravers::{
    store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver, SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{PEDAL_LINE_HEIGHT, PEDAL_SPACE_TO_STAFF};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct PedalEngraver {
    anchors: RelAnchors,
}

impl PedalEngraver {
    pub fn new(relation: RelationId) -> Self {
        Self { anchors: RelAnchors::new(relation) }
    }

    fn engrave_segment(
        &self,
        ctx: &mut EngraveContext,
        x0: f64,
        x1: f64,
        anchor: &AnchorInfo,
        system: usize,
    ) -> ShapeId {
        let gap = ctx.tenths(PEDAL_SPACE_TO_STAFF, anchor);
        let height = ctx.tenths(PEDAL_LINE_HEIGHT, anchor);
        let floor = ctx.profile.max_for_or(
            x0,
            x1,
            anchor.abs_staff,
            ctx.profile.staff_bottom(anchor.abs_staff),
        );
        let rect = Rect::new(x0, floor + gap, (x1 - x0).max(1.0), height);
        let pedal = ctx
            .tree
            .add_simple(ShapeKind::PedalLine, Some(anchor.staffobj), rect, ShapeLayer::AuxObjs);
        ctx.profile.update_shape(ctx.tree, pedal, anchor.abs_staff);
        store_system_shape(ctx, pedal, system, anchor.instr);
        pedal
    }
}

impl RelObjEngraver for PedalEngraver {
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
        Ok(vec![self.engrave_segment(ctx, x0, x1, &start, start.system)])
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
