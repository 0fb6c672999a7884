//! Wedge (hairpin) engraver.
//!
//! A crescendo or diminuendo hairpin runs below the staff from the
//! start anchor to the end anchor, pushed down until it clears whatever
//! the vertical profile already holds. The shape kind records the
//! direction and the niente flag, so the drawing backend knows which
//! way the mouth opens without going back to the source relation.
//! Crossing a system break yields one wedge segment per system; the
//! segment holding the closed end reserves room for the niente circle.

use crate::engravers::{
    store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver, SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{WEDGE_HEIGHT, WEDGE_NIENTE_RADIUS, WEDGE_SPACE_TO_STAFF};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct WedgeEngraver {
    anchors: RelAnchors,
    /// true for crescendo, false for diminuendo.
    pub crescendo: bool,
    /// Niente circle at the closed end.
    pub niente: bool,
}

impl WedgeEngraver {
    pub fn new(relation: RelationId, crescendo: bool, niente: bool) -> Self {
        Self {
            anchors: RelAnchors::new(relation),
            crescendo,
            niente,
        }
    }

    fn engrave_segment(
        &self,
        ctx: &mut EngraveContext,
        mut x0: f64,
        mut x1: f64,
        anchor: &AnchorInfo,
        system: usize,
        closed_end: bool,
    ) -> ShapeId {
        let gap = ctx.tenths(WEDGE_SPACE_TO_STAFF, anchor);
        let height = ctx.tenths(WEDGE_HEIGHT, anchor);
        // room for the niente circle at the closed end
        if closed_end && self.niente {
            let d = 2.0 * ctx.tenths(WEDGE_NIENTE_RADIUS, anchor);
            if self.crescendo {
                x0 -= d;
            } else {
                x1 += d;
            }
        }
        let floor = ctx.profile.max_for_or(
            x0,
            x1,
            anchor.abs_staff,
            ctx.profile.staff_bottom(anchor.abs_staff),
        );
        let rect = Rect::new(x0, floor + gap, (x1 - x0).max(1.0), height);
        let wedge = ctx.tree.add_simple(
            ShapeKind::Wedge {
                crescendo: self.crescendo,
                niente: self.niente,
            },
            Some(anchor.staffobj),
            rect,
            ShapeLayer::AuxObjs,
        );
        ctx.profile.update_shape(ctx.tree, wedge, anchor.abs_staff);
        store_system_shape(ctx, wedge, system, anchor.instr);
        wedge
    }
}

impl RelObjEngraver for WedgeEngraver {
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
        Ok(vec![self.engrave_segment(ctx, x0, x1, &start, start.system, true)])
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
        // a crescendo's closed end sits on its first segment
        let closed = self.crescendo && span.system == start.system;
        Ok(Some(self.engrave_segment(ctx, x0, span.x_right, &start, span.system, closed)))
    }

    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (_start, end) = self.anchors.require_complete()?;
        let x1 = ctx.tree.bounds(end.shape).right();
        Ok(Some(self.engrave_segment(ctx, span.x_left, x1, &end, span.system, !self.crescendo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engravers::notes::{engrave_staffobj, StaffObjPos};
    use crate::layout::VerticalProfile;
    use crate::model::{NoteType, ObjId, StaffObjKind, StaffObject, StemDir};
    use crate::registry::ShapesStorage;
    use crate::shapes::ShapeTree;
    use crate::units::UnitConverter;

    #[test]
    fn wedge_clears_low_notes_below_the_staff() {
        let mut tree = ShapeTree::new();
        let mut profile = VerticalProfile::new(0.0, 10000.0, 1);
        profile.initialize(0, 1000.0, 1720.0);
        let converter = UnitConverter::new(&[1]);
        let mut storage = ShapesStorage::new();
        let mut ctx = EngraveContext {
            tree: &mut tree,
            profile: &mut profile,
            converter: &converter,
            storage: &mut storage,
        };

        // a note well below the staff, with ledger lines
        let low = StaffObject {
            id: ObjId(1),
            time: 0.0,
            duration: 1.0,
            voice: 1,
            instr: 0,
            staff: 0,
            kind: StaffObjKind::Note {
                step: 14,
                note_type: NoteType::Quarter,
                dots: 0,
                accidental: None,
                stem: StemDir::Up,
            },
        };
        let pos = StaffObjPos { x: 200.0, staff_top: 1000.0, instr: 0, staff: 0 };
        let n1 = engrave_staffobj(&low, &pos, &mut ctx).unwrap().0;
        ctx.profile.update_shape(ctx.tree, n1, 0);
        let n2 = engrave_staffobj(
            &StaffObject { id: ObjId(2), ..low.clone() },
            &StaffObjPos { x: 800.0, ..pos },
            &mut ctx,
        )
        .unwrap()
        .0;
        ctx.profile.update_shape(ctx.tree, n2, 0);

        let mut eng = WedgeEngraver::new(RelationId(20), true, false);
        let anchor = |shape, column| AnchorInfo {
            staffobj: ObjId(1),
            shape,
            instr: 0,
            staff: 0,
            abs_staff: 0,
            system: 0,
            column,
        };
        eng.set_start_staffobj(anchor(n1, 0));
        eng.set_end_staffobj(anchor(n2, 1));
        let shapes = eng.create_shapes(&mut ctx).unwrap();
        assert_eq!(shapes.len(), 1);

        let wedge = ctx.tree.bounds(shapes[0]);
        // below both low noteheads and below the staff
        assert!(wedge.top() >= ctx.tree.bounds(n1).bottom());
        assert!(wedge.top() >= 1720.0);

        assert_eq!(
            ctx.tree.get(shapes[0]).kind,
            ShapeKind::Wedge { crescendo: true, niente: false }
        );
    }

    #[test]
    fn niente_crescendo_reserves_room_at_the_closed_end() {
        let mut tree = ShapeTree::new();
        let mut profile = VerticalProfile::new(0.0, 10000.0, 1);
        profile.initialize(0, 1000.0, 1720.0);
        let converter = UnitConverter::new(&[1]);
        let mut storage = ShapesStorage::new();
        let mut ctx = EngraveContext {
            tree: &mut tree,
            profile: &mut profile,
            converter: &converter,
            storage: &mut storage,
        };

        let n1 = ctx.tree.add_simple(
            ShapeKind::Note,
            None,
            Rect::new(200.0, 1300.0, 200.0, 400.0),
            ShapeLayer::Notes,
        );
        let n2 = ctx.tree.add_simple(
            ShapeKind::Note,
            None,
            Rect::new(800.0, 1300.0, 200.0, 400.0),
            ShapeLayer::Notes,
        );
        let anchor = |shape, column| AnchorInfo {
            staffobj: ObjId(1),
            shape,
            instr: 0,
            staff: 0,
            abs_staff: 0,
            system: 0,
            column,
        };

        let mut plain = WedgeEngraver::new(RelationId(21), true, false);
        plain.set_start_staffobj(anchor(n1, 0));
        plain.set_end_staffobj(anchor(n2, 1));
        let plain_shape = plain.create_shapes(&mut ctx).unwrap()[0];
        let plain_box = ctx.tree.bounds(plain_shape);

        let mut niente = WedgeEngraver::new(RelationId(22), true, true);
        niente.set_start_staffobj(anchor(n1, 0));
        niente.set_end_staffobj(anchor(n2, 1));
        let niente_shape = niente.create_shapes(&mut ctx).unwrap()[0];
        let niente_box = ctx.tree.bounds(niente_shape);

        // circle diameter added at the closed (left) end only
        let diameter = 2.0 * ctx.converter.tenths_to_logical(WEDGE_NIENTE_RADIUS, 0, 0);
        assert!((plain_box.x - niente_box.x - diameter).abs() < 1e-9);
        assert!((plain_box.right() - niente_box.right()).abs() < 1e-9);
        assert_eq!(
            ctx.tree.get(niente_shape).kind,
            ShapeKind::Wedge { crescendo: true, niente: true }
        );
    }
}
