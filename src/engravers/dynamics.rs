//! Dynamics mark engraver.
//!
//! A dynamics mark (p, f, sfz...) is a single staff object, engraved
//! after its column is positioned so the vertical profile already
//! knows the notes around it. The mark is pushed away from the staff
//! until it clears everything recorded over its x-range.

use crate::engravers::EngraveContext;
use crate::engravers::notes::StaffObjPos;
use crate::geometry::Rect;
use crate::layout::constants::{
    DYNAMICS_GLYPH_HEIGHT, DYNAMICS_GLYPH_WIDTH, DYNAMICS_SPACE_TO_NOTE,
};
use crate::model::{ObjId, Placement};
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

/// Engrave one dynamics mark and record it in the vertical profile.
pub fn engrave_dynamics(
    owner: ObjId,
    marking: &str,
    placement: Placement,
    pos: &StaffObjPos,
    abs_staff: usize,
    ctx: &mut EngraveContext,
) -> ShapeId {
    let t = |v: f64| ctx.converter.tenths_to_logical(v, pos.instr, pos.staff);
    let width = t(DYNAMICS_GLYPH_WIDTH) * marking.chars().count().max(1) as f64;
    let height = t(DYNAMICS_GLYPH_HEIGHT);
    let gap = t(DYNAMICS_SPACE_TO_NOTE);
    let x0 = pos.x;
    let x1 = pos.x + width;

    let y = match placement {
        Placement::Above => {
            let ceiling = ctx
                .profile
                .min_for_or(x0, x1, abs_staff, ctx.profile.staff_top(abs_staff));
            ceiling - gap - height
        }
        Placement::Below => {
            let floor = ctx
                .profile
                .max_for_or(x0, x1, abs_staff, ctx.profile.staff_bottom(abs_staff));
            floor + gap
        }
    };

    let mark = ctx.tree.add_simple(
        ShapeKind::DynamicsMark,
        Some(owner),
        Rect::new(x0, y, width, height),
        ShapeLayer::AuxObjs,
    );
    ctx.profile.update_shape(ctx.tree, mark, abs_staff);
    mark
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VerticalProfile;
    use crate::registry::ShapesStorage;
    use crate::shapes::ShapeTree;
    use crate::units::UnitConverter;

    #[test]
    fn marks_below_stack_without_overlap() {
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

        let pos = StaffObjPos { x: 300.0, staff_top: 1000.0, instr: 0, staff: 0 };
        let first = engrave_dynamics(ObjId(1), "p", Placement::Below, &pos, 0, &mut ctx);
        let second = engrave_dynamics(ObjId(2), "f", Placement::Below, &pos, 0, &mut ctx);

        let a = ctx.tree.bounds(first);
        let b = ctx.tree.bounds(second);
        assert!(a.top() >= 1720.0);
        assert!(b.top() >= a.bottom(), "second mark must clear the first");
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn marks_above_clear_the_ceiling() {
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

        let pos = StaffObjPos { x: 300.0, staff_top: 1000.0, instr: 0, staff: 0 };
        let mark = engrave_dynamics(ObjId(1), "sfz", Placement::Above, &pos, 0, &mut ctx);
        assert!(ctx.tree.bounds(mark).bottom() <= 1000.0);
    }
}
