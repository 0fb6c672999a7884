//! Tie engraver.
//!
//! Unlike a slur, a tie hugs its two noteheads: it starts right after
//! the first head and ends right before the second, arched on the side
//! away from the stem. A tie interrupted by a system break produces one
//! arch per system, each running to the system edge.

use crate::engravers::{
    note_stem_up, store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver,
    SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{TIE_HEIGHT_FACTOR, TIE_MAX_HEIGHT, TIE_MIN_HEIGHT};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct TieEngraver {
    anchors: RelAnchors,
}

impl TieEngraver {
    pub fn new(relation: RelationId) -> Self {
        Self { anchors: RelAnchors::new(relation) }
    }

    fn engrave_arch(
        &self,
        ctx: &mut EngraveContext,
        x0: f64,
        x1: f64,
        anchor: &AnchorInfo,
        system: usize,
    ) -> ShapeId {
        let above = !note_stem_up(ctx.tree, anchor.shape).unwrap_or(false);
        let span = (x1 - x0).max(1.0);
        let height = (span * TIE_HEIGHT_FACTOR).clamp(
            ctx.tenths(TIE_MIN_HEIGHT, anchor),
            ctx.tenths(TIE_MAX_HEIGHT, anchor),
        );

        let head_rect = ctx
            .tree
            .component_of_kind(anchor.shape, ShapeKind::Notehead)
            .map(|h| ctx.tree.bounds(h))
            .unwrap_or_else(|| ctx.tree.bounds(anchor.shape));
        let rect = if above {
            Rect::new(x0, head_rect.top() - height, span, height)
        } else {
            Rect::new(x0, head_rect.bottom(), span, height)
        };

        let arch = ctx
            .tree
            .add_simple(ShapeKind::TieArch, Some(anchor.staffobj), rect, ShapeLayer::AuxObjs);
        ctx.profile.update_shape(ctx.tree, arch, anchor.abs_staff);
        store_system_shape(ctx, arch, system, anchor.instr);
        arch
    }
}

impl RelObjEngraver for TieEngraver {
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
        let x0 = ctx.tree.bounds(start.shape).right();
        let x1 = ctx.tree.bounds(end.shape).x;
        let arch = self.engrave_arch(ctx, x0, x1.max(x0 + 1.0), &start, start.system);
        Ok(vec![arch])
    }

    fn create_first_or_intermediate_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (start, _end) = self.anchors.require_complete()?;
        let x0 = if span.system == start.system {
            ctx.tree.bounds(start.shape).right()
        } else {
            span.x_left
        };
        Ok(Some(self.engrave_arch(ctx, x0, span.x_right, &start, span.system)))
    }

    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (_start, end) = self.anchors.require_complete()?;
        let x1 = ctx.tree.bounds(end.shape).x;
        Ok(Some(self.engrave_arch(ctx, span.x_left, x1.max(span.x_left + 1.0), &end, span.system)))
    }
}
