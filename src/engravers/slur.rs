//! Slur engraver.
//!
//! A slur confined to one system becomes a single arch between its two
//! anchor notes, pushed away from already-placed content through the
//! vertical profile. A slur crossing systems produces exactly one arch
//! per system: the first runs from the start note to the system's right
//! edge, intermediates span the whole system, and the last runs from
//! the system's left edge to the end note. Splitting one crossing into
//! two half-arches meeting at the break is not attempted.

use crate::engravers::{
    note_stem_up, store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver,
    SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{
    SLUR_HEIGHT_FACTOR, SLUR_MAX_HEIGHT, SLUR_MIN_HEIGHT, SLUR_SPACE_TO_NOTE,
};
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchPlacement {
    Above,
    Below,
}

pub struct SlurEngraver {
    anchors: RelAnchors,
}

impl SlurEngraver {
    pub fn new(relation: RelationId) -> Self {
        Self { anchors: RelAnchors::new(relation) }
    }

    /// Slurs go on the side away from the stems: above when the start
    /// note's stem points down.
    fn decide_placement(&self, ctx: &EngraveContext, start: &AnchorInfo) -> ArchPlacement {
        match note_stem_up(ctx.tree, start.shape) {
            Some(true) => ArchPlacement::Below,
            _ => ArchPlacement::Above,
        }
    }

    fn engrave_arch(
        &self,
        ctx: &mut EngraveContext,
        x0: f64,
        x1: f64,
        anchor: &AnchorInfo,
        placement: ArchPlacement,
        system: usize,
    ) -> ShapeId {
        let span = (x1 - x0).max(1.0);
        let height = (span * SLUR_HEIGHT_FACTOR).clamp(
            ctx.tenths(SLUR_MIN_HEIGHT, anchor),
            ctx.tenths(SLUR_MAX_HEIGHT, anchor),
        );
        let gap = ctx.tenths(SLUR_SPACE_TO_NOTE, anchor);

        let rect = match placement {
            ArchPlacement::Above => {
                let top = ctx
                    .profile
                    .min_for_or(x0, x1, anchor.abs_staff, ctx.profile.staff_top(anchor.abs_staff));
                Rect::new(x0, top - gap - height, span, height)
            }
            ArchPlacement::Below => {
                let bottom = ctx
                    .profile
                    .max_for_or(x0, x1, anchor.abs_staff, ctx.profile.staff_bottom(anchor.abs_staff));
                Rect::new(x0, bottom + gap, span, height)
            }
        };

        let arch = ctx
            .tree
            .add_simple(ShapeKind::SlurArch, Some(anchor.staffobj), rect, ShapeLayer::AuxObjs);
        ctx.profile.update_shape(ctx.tree, arch, anchor.abs_staff);
        store_system_shape(ctx, arch, system, anchor.instr);
        arch
    }
}

impl RelObjEngraver for SlurEngraver {
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
        let placement = self.decide_placement(ctx, &start);
        let x0 = ctx.tree.bounds(start.shape).x;
        let x1 = ctx.tree.bounds(end.shape).right();
        let arch = self.engrave_arch(ctx, x0, x1, &start, placement, start.system);
        Ok(vec![arch])
    }

    fn create_first_or_intermediate_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (start, _end) = self.anchors.require_complete()?;
        let placement = self.decide_placement(ctx, &start);
        let x0 = if span.system == start.system {
            ctx.tree.bounds(start.shape).x
        } else {
            span.x_left
        };
        let arch = self.engrave_arch(ctx, x0, span.x_right, &start, placement, span.system);
        Ok(Some(arch))
    }

    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let (start, end) = self.anchors.require_complete()?;
        let placement = self.decide_placement(ctx, &start);
        let x1 = ctx.tree.bounds(end.shape).right();
        let arch = self.engrave_arch(ctx, span.x_left, x1, &end, placement, span.system);
        Ok(Some(arch))
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

    fn note(id: u64, step: i32, stem: StemDir) -> StaffObject {
        StaffObject {
            id: ObjId(id),
            time: 0.0,
            duration: 1.0,
            voice: 1,
            instr: 0,
            staff: 0,
            kind: StaffObjKind::Note {
                step,
                note_type: NoteType::Quarter,
                dots: 0,
                accidental: None,
                stem,
            },
        }
    }

    struct Fixture {
        tree: ShapeTree,
        profile: VerticalProfile,
        converter: UnitConverter,
        storage: ShapesStorage,
    }

    impl Fixture {
        fn new() -> Self {
            let mut profile = VerticalProfile::new(0.0, 20000.0, 1);
            profile.initialize(0, 1000.0, 1720.0);
            Self {
                tree: ShapeTree::new(),
                profile,
                converter: UnitConverter::new(&[1]),
                storage: ShapesStorage::new(),
            }
        }

        fn ctx(&mut self) -> EngraveContext<'_> {
            EngraveContext {
                tree: &mut self.tree,
                profile: &mut self.profile,
                converter: &self.converter,
                storage: &mut self.storage,
            }
        }
    }

    fn anchor(shape: crate::shapes::ShapeId, system: usize, column: usize) -> AnchorInfo {
        AnchorInfo { staffobj: ObjId(1), shape, instr: 0, staff: 0, abs_staff: 0, system, column }
    }

    #[test]
    fn single_system_slur_is_one_arch_above_down_stems() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx();
        let pos = |x| StaffObjPos { x, staff_top: 1000.0, instr: 0, staff: 0 };
        let n1 = engrave_staffobj(&note(1, 2, StemDir::Down), &pos(100.0), &mut ctx)
            .unwrap()
            .0;
        let n2 = engrave_staffobj(&note(2, 2, StemDir::Down), &pos(900.0), &mut ctx)
            .unwrap()
            .0;
        ctx.profile.update_shape(ctx.tree, n1, 0);
        ctx.profile.update_shape(ctx.tree, n2, 0);

        let mut eng = SlurEngraver::new(RelationId(3));
        eng.set_start_staffobj(anchor(n1, 0, 0));
        eng.set_end_staffobj(anchor(n2, 0, 4));
        let shapes = eng.create_shapes(&mut ctx).unwrap();
        assert_eq!(shapes.len(), 1);

        let arch = ctx.tree.bounds(shapes[0]);
        // above everything already engraved over its x-range
        let n1_top = ctx.tree.bounds(n1).top();
        let n2_top = ctx.tree.bounds(n2).top();
        assert!(arch.bottom() <= n1_top.min(n2_top) + 1e-9);
        assert_eq!(ctx.tree.get(shapes[0]).kind, ShapeKind::SlurArch);
    }

    #[test]
    fn crossing_slur_yields_one_arch_per_system() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx();
        let pos = |x| StaffObjPos { x, staff_top: 1000.0, instr: 0, staff: 0 };
        let n1 = engrave_staffobj(&note(1, 6, StemDir::Up), &pos(5000.0), &mut ctx)
            .unwrap()
            .0;
        let n2 = engrave_staffobj(&note(2, 6, StemDir::Up), &pos(1500.0), &mut ctx)
            .unwrap()
            .0;

        let mut eng = SlurEngraver::new(RelationId(4));
        eng.set_start_staffobj(anchor(n1, 0, 8));
        eng.set_end_staffobj(anchor(n2, 2, 21));

        let spans = [
            SystemSpan { system: 0, x_left: 0.0, x_right: 6000.0, staff_top: 1000.0 },
            SystemSpan { system: 1, x_left: 0.0, x_right: 6000.0, staff_top: 1000.0 },
            SystemSpan { system: 2, x_left: 0.0, x_right: 6000.0, staff_top: 1000.0 },
        ];
        let mut shapes = Vec::new();
        for span in &spans[..2] {
            shapes.push(eng.create_first_or_intermediate_shape(&mut ctx, *span).unwrap());
        }
        shapes.push(eng.create_last_shape(&mut ctx, spans[2]).unwrap());

        // one shape per system crossed
        assert!(shapes.iter().all(|s| s.is_some()));
        assert_eq!(shapes.len(), 3);

        let first = ctx.tree.bounds(shapes[0].unwrap());
        assert!((first.right() - 6000.0).abs() < 1e-9);
        let mid = ctx.tree.bounds(shapes[1].unwrap());
        assert!((mid.x - 0.0).abs() < 1e-9 && (mid.right() - 6000.0).abs() < 1e-9);
    }

    #[test]
    fn finalizing_without_end_is_an_error() {
        let mut fx = Fixture::new();
        let mut ctx = fx.ctx();
        let pos = StaffObjPos { x: 100.0, staff_top: 1000.0, instr: 0, staff: 0 };
        let n1 = engrave_staffobj(&note(1, 6, StemDir::Up), &pos, &mut ctx).unwrap().0;

        let mut eng = SlurEngraver::new(RelationId(5));
        eng.set_start_staffobj(anchor(n1, 0, 0));
        let err = eng.create_shapes(&mut ctx).unwrap_err();
        assert!(matches!(err, EngraveError::IncompleteRelation { .. }));
    }
}
