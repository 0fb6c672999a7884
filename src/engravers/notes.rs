//! One-shot engraving of simple staff objects: notes, rests, clefs and
//! barlines.
//!
//! A note becomes a composite shape owning its notehead, stem, flag,
//! dots, accidental and ledger lines, so that relation engravers can
//! later find and adjust individual components (a beam replaces flags
//! and stretches stems) while shifting the composite moves everything.

use crate::engravers::EngraveContext;
use crate::geometry::Rect;
use crate::layout::constants::*;
use crate::model::{BarlineStyle, ClefType, NoteType, ObjId, StaffObjKind, StaffObject, StemDir};
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

/// Placement input for one staff object.
#[derive(Debug, Clone, Copy)]
pub struct StaffObjPos {
    /// Left edge assigned to the object within the system.
    pub x: f64,
    /// Top staff line of the object's staff, in logical units.
    pub staff_top: f64,
    pub instr: usize,
    pub staff: usize,
}

/// Engrave one staff object and return its shape with the z-layer it
/// draws on. Dynamics marks are not handled here; they need the
/// vertical profile and are engraved after their column is in place.
pub fn engrave_staffobj(
    so: &StaffObject,
    pos: &StaffObjPos,
    ctx: &mut EngraveContext,
) -> Option<(ShapeId, ShapeLayer)> {
    match &so.kind {
        StaffObjKind::Note {
            step,
            note_type,
            dots,
            accidental,
            stem,
        } => Some((
            engrave_note(so, pos, ctx, *step, *note_type, *dots, accidental.is_some(), *stem),
            ShapeLayer::Notes,
        )),
        StaffObjKind::Rest { note_type, dots } => {
            Some((engrave_rest(so, pos, ctx, *note_type, *dots), ShapeLayer::Notes))
        }
        StaffObjKind::Clef { clef } => {
            Some((clef_glyph(Some(so.id), *clef, pos, ctx), ShapeLayer::Notes))
        }
        StaffObjKind::Barline { style } => {
            Some((engrave_barline(so, pos, ctx, *style), ShapeLayer::Barlines))
        }
        StaffObjKind::Dynamics { .. } => None,
    }
}

/// Vertical center for a staff step (0 = top line, half an interline
/// per step, growing downwards).
pub(crate) fn step_to_y(step: i32, pos: &StaffObjPos, ctx: &EngraveContext) -> f64 {
    pos.staff_top + ctx.converter.tenths_to_logical(step as f64 * 5.0, pos.instr, pos.staff)
}

/// Resolved stem direction: explicit wins, otherwise notes on or above
/// the middle line take a down stem.
pub(crate) fn stem_direction(step: i32, stem: StemDir) -> StemDir {
    match stem {
        StemDir::Auto => {
            if step <= 4 {
                StemDir::Down
            } else {
                StemDir::Up
            }
        }
        explicit => explicit,
    }
}

#[allow(clippy::too_many_arguments)]
fn engrave_note(
    so: &StaffObject,
    pos: &StaffObjPos,
    ctx: &mut EngraveContext,
    step: i32,
    note_type: NoteType,
    dots: u8,
    has_accidental: bool,
    stem: StemDir,
) -> ShapeId {
    let t = |v: f64| ctx.converter.tenths_to_logical(v, pos.instr, pos.staff);
    let note = ctx.tree.add_composite(ShapeKind::Note, Some(so.id), ShapeLayer::Notes);

    let mut x = pos.x;
    if has_accidental {
        let acc = ctx.tree.add_simple(
            ShapeKind::AccidentalGlyph,
            Some(so.id),
            Rect::new(
                x,
                step_to_y(step, pos, ctx) - t(ACCIDENTAL_HEIGHT) / 2.0,
                t(ACCIDENTAL_WIDTH),
                t(ACCIDENTAL_HEIGHT),
            ),
            ShapeLayer::Notes,
        );
        ctx.tree.add_component(note, acc);
        x += t(ACCIDENTAL_WIDTH + ACCIDENTAL_SPACE);
    }

    let y_center = step_to_y(step, pos, ctx);
    let head = ctx.tree.add_simple(
        ShapeKind::Notehead,
        Some(so.id),
        Rect::new(
            x,
            y_center - t(NOTEHEAD_HEIGHT) / 2.0,
            t(NOTEHEAD_WIDTH),
            t(NOTEHEAD_HEIGHT),
        ),
        ShapeLayer::Notes,
    );
    ctx.tree.add_component(note, head);

    for ledger_step in ledger_steps(step) {
        let y = step_to_y(ledger_step, pos, ctx);
        let extend = t(5.0);
        let line = ctx.tree.add_simple(
            ShapeKind::LedgerLine,
            Some(so.id),
            Rect::new(x - extend, y - t(0.75), t(NOTEHEAD_WIDTH) + 2.0 * extend, t(1.5)),
            ShapeLayer::Notes,
        );
        ctx.tree.add_component(note, line);
    }

    if note_type.has_stem() {
        let dir = stem_direction(step, stem);
        let stem_rect = match dir {
            StemDir::Up | StemDir::Auto => Rect::new(
                x + t(NOTEHEAD_WIDTH) - t(STEM_WIDTH),
                y_center - t(STEM_LENGTH),
                t(STEM_WIDTH),
                t(STEM_LENGTH),
            ),
            StemDir::Down => Rect::new(x, y_center, t(STEM_WIDTH), t(STEM_LENGTH)),
        };
        let stem_shape =
            ctx.tree
                .add_simple(ShapeKind::Stem, Some(so.id), stem_rect, ShapeLayer::Notes);
        ctx.tree.add_component(note, stem_shape);

        if note_type.flag_count() > 0 {
            let flag_rect = match dir {
                StemDir::Up | StemDir::Auto => Rect::new(
                    stem_rect.right(),
                    stem_rect.top(),
                    t(FLAG_WIDTH),
                    t(7.0 * note_type.flag_count() as f64),
                ),
                StemDir::Down => Rect::new(
                    stem_rect.right(),
                    stem_rect.bottom() - t(7.0 * note_type.flag_count() as f64),
                    t(FLAG_WIDTH),
                    t(7.0 * note_type.flag_count() as f64),
                ),
            };
            let flag =
                ctx.tree
                    .add_simple(ShapeKind::Flag, Some(so.id), flag_rect, ShapeLayer::Notes);
            ctx.tree.add_component(note, flag);
        }
    }

    let mut dot_x = x + t(NOTEHEAD_WIDTH + DOT_SPACE);
    for _ in 0..dots {
        let dot = ctx.tree.add_simple(
            ShapeKind::Dot,
            Some(so.id),
            Rect::new(dot_x, y_center - t(1.5), t(3.0), t(3.0)),
            ShapeLayer::Notes,
        );
        ctx.tree.add_component(note, dot);
        dot_x += t(5.0);
    }

    note
}

/// Ledger line steps a notehead at `step` requires: even steps above
/// the staff (≤ -2) or below it (≥ 10), toward the staff.
fn ledger_steps(step: i32) -> Vec<i32> {
    if step <= -2 {
        (step..=-2).filter(|s| s % 2 == 0).collect()
    } else if step >= 10 {
        (10..=step).filter(|s| s % 2 == 0).collect()
    } else {
        Vec::new()
    }
}

fn engrave_rest(
    so: &StaffObject,
    pos: &StaffObjPos,
    ctx: &mut EngraveContext,
    note_type: NoteType,
    dots: u8,
) -> ShapeId {
    let t = |v: f64| ctx.converter.tenths_to_logical(v, pos.instr, pos.staff);
    // whole rests hang from the second line, others sit around the
    // middle line
    let (y, h) = match note_type {
        NoteType::Whole => (step_to_y(2, pos, ctx), t(5.0)),
        NoteType::Half => (step_to_y(4, pos, ctx) - t(5.0), t(5.0)),
        _ => (step_to_y(2, pos, ctx), t(20.0)),
    };
    let rest = ctx.tree.add_simple(
        ShapeKind::Rest,
        Some(so.id),
        Rect::new(pos.x, y, t(REST_WIDTH), h),
        ShapeLayer::Notes,
    );
    if dots == 0 {
        return rest;
    }
    let comp = ctx.tree.add_composite(ShapeKind::Rest, Some(so.id), ShapeLayer::Notes);
    ctx.tree.add_component(comp, rest);
    let mut dot_x = pos.x + t(REST_WIDTH + DOT_SPACE);
    for _ in 0..dots {
        let dot = ctx.tree.add_simple(
            ShapeKind::Dot,
            Some(so.id),
            Rect::new(dot_x, step_to_y(3, pos, ctx), t(3.0), t(3.0)),
            ShapeLayer::Notes,
        );
        ctx.tree.add_component(comp, dot);
        dot_x += t(5.0);
    }
    comp
}

/// Clef glyph shape. Prolog clefs at the start of a system carry no
/// owning staff object, so the owner is optional here.
pub(crate) fn clef_glyph(
    owner: Option<ObjId>,
    clef: ClefType,
    pos: &StaffObjPos,
    ctx: &mut EngraveContext,
) -> ShapeId {
    let t = |v: f64| ctx.converter.tenths_to_logical(v, pos.instr, pos.staff);
    // reference line the clef curls around
    let center_step = match clef {
        ClefType::Treble => 6,
        ClefType::Bass => 2,
        ClefType::Alto => 4,
        ClefType::Tenor => 2,
    };
    let y_center = step_to_y(center_step, pos, ctx);
    ctx.tree.add_simple(
        ShapeKind::Clef,
        owner,
        Rect::new(pos.x, y_center - t(CLEF_HEIGHT) / 2.0, t(CLEF_WIDTH), t(CLEF_HEIGHT)),
        ShapeLayer::Notes,
    )
}

fn engrave_barline(
    so: &StaffObject,
    pos: &StaffObjPos,
    ctx: &mut EngraveContext,
    style: BarlineStyle,
) -> ShapeId {
    let t = |v: f64| ctx.converter.tenths_to_logical(v, pos.instr, pos.staff);
    let height = ctx.converter.staff_height(pos.instr, pos.staff);
    let top = pos.staff_top;
    match style {
        BarlineStyle::Regular => ctx.tree.add_simple(
            ShapeKind::Barline,
            Some(so.id),
            Rect::new(pos.x, top, t(BARLINE_THIN_WIDTH), height),
            ShapeLayer::Barlines,
        ),
        BarlineStyle::Double => {
            let comp =
                ctx.tree
                    .add_composite(ShapeKind::Barline, Some(so.id), ShapeLayer::Barlines);
            for i in 0..2 {
                let x = pos.x + i as f64 * t(BARLINE_THIN_WIDTH + BARLINE_GAP);
                let line = ctx.tree.add_simple(
                    ShapeKind::Barline,
                    Some(so.id),
                    Rect::new(x, top, t(BARLINE_THIN_WIDTH), height),
                    ShapeLayer::Barlines,
                );
                ctx.tree.add_component(comp, line);
            }
            comp
        }
        BarlineStyle::Final => {
            let comp =
                ctx.tree
                    .add_composite(ShapeKind::Barline, Some(so.id), ShapeLayer::Barlines);
            let thin = ctx.tree.add_simple(
                ShapeKind::Barline,
                Some(so.id),
                Rect::new(pos.x, top, t(BARLINE_THIN_WIDTH), height),
                ShapeLayer::Barlines,
            );
            let thick = ctx.tree.add_simple(
                ShapeKind::Barline,
                Some(so.id),
                Rect::new(
                    pos.x + t(BARLINE_THIN_WIDTH + BARLINE_GAP),
                    top,
                    t(BARLINE_THICK_WIDTH),
                    height,
                ),
                ShapeLayer::Barlines,
            );
            ctx.tree.add_component(comp, thin);
            ctx.tree.add_component(comp, thick);
            comp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::VerticalProfile;
    use crate::model::StaffObjKind;
    use crate::registry::ShapesStorage;
    use crate::shapes::ShapeTree;
    use crate::units::UnitConverter;

    fn note(step: i32, note_type: NoteType, stem: StemDir) -> StaffObject {
        StaffObject {
            id: ObjId(1),
            time: 0.0,
            duration: 1.0,
            voice: 1,
            instr: 0,
            staff: 0,
            kind: StaffObjKind::Note {
                step,
                note_type,
                dots: 0,
                accidental: None,
                stem,
            },
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&mut EngraveContext) -> R) -> R {
        let mut tree = ShapeTree::new();
        let mut profile = VerticalProfile::new(0.0, 10000.0, 1);
        let converter = UnitConverter::new(&[1]);
        let mut storage = ShapesStorage::new();
        let mut ctx = EngraveContext {
            tree: &mut tree,
            profile: &mut profile,
            converter: &converter,
            storage: &mut storage,
        };
        f(&mut ctx)
    }

    #[test]
    fn quarter_note_gets_head_and_stem() {
        with_ctx(|ctx| {
            let so = note(6, NoteType::Quarter, StemDir::Auto);
            let pos = StaffObjPos { x: 100.0, staff_top: 1000.0, instr: 0, staff: 0 };
            let (id, _) = engrave_staffobj(&so, &pos, ctx).unwrap();

            assert!(ctx.tree.component_of_kind(id, ShapeKind::Notehead).is_some());
            assert!(ctx.tree.component_of_kind(id, ShapeKind::Stem).is_some());
            assert!(ctx.tree.component_of_kind(id, ShapeKind::Flag).is_none());
        });
    }

    #[test]
    fn eighth_note_gets_flag_whole_gets_no_stem() {
        with_ctx(|ctx| {
            let pos = StaffObjPos { x: 0.0, staff_top: 0.0, instr: 0, staff: 0 };
            let (eighth, _) =
                engrave_staffobj(&note(6, NoteType::Eighth, StemDir::Auto), &pos, ctx).unwrap();
            let (whole, _) =
                engrave_staffobj(&note(6, NoteType::Whole, StemDir::Auto), &pos, ctx).unwrap();

            assert!(ctx.tree.component_of_kind(eighth, ShapeKind::Flag).is_some());
            assert!(ctx.tree.component_of_kind(whole, ShapeKind::Stem).is_none());
        });
    }

    #[test]
    fn auto_stem_follows_middle_line_rule() {
        assert_eq!(stem_direction(2, StemDir::Auto), StemDir::Down);
        assert_eq!(stem_direction(4, StemDir::Auto), StemDir::Down);
        assert_eq!(stem_direction(6, StemDir::Auto), StemDir::Up);
        assert_eq!(stem_direction(2, StemDir::Up), StemDir::Up);
    }

    #[test]
    fn ledger_lines_appear_outside_the_staff() {
        assert_eq!(ledger_steps(-4), vec![-4, -2]);
        assert_eq!(ledger_steps(12), vec![10, 12]);
        assert!(ledger_steps(0).is_empty());
        assert!(ledger_steps(8).is_empty());
    }

    #[test]
    fn note_composite_bounds_cover_components() {
        with_ctx(|ctx| {
            let so = note(-4, NoteType::Quarter, StemDir::Down);
            let pos = StaffObjPos { x: 100.0, staff_top: 1000.0, instr: 0, staff: 0 };
            let (id, _) = engrave_staffobj(&so, &pos, ctx).unwrap();

            let bounds = ctx.tree.bounds(id);
            for &c in ctx.tree.get(id).components() {
                let cb = ctx.tree.bounds(c);
                assert!(bounds.contains_rect(&cb), "{cb:?} outside {bounds:?}");
            }
        });
    }
}
