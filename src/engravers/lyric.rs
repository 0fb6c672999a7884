//! Lyric line engraver.
//!
//! One engraver per verse per instrument, keyed in the registry by a
//! string tag so parallel verses stay apart. Each member note gets its
//! syllable centered under the notehead on the verse's baseline, with
//! hyphens between syllables that ask for them. A verse crossing a
//! system break produces one composite per system holding that
//! system's syllables.

use crate::engravers::{
    store_system_shape, AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver, SystemSpan,
};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::{
    LYRIC_FONT_HEIGHT, LYRIC_HYPHEN_WIDTH, LYRIC_SPACE_TO_STAFF, LYRIC_VERSE_DISTANCE,
};
use crate::model::{LyricSyllable, RelationId};
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct LyricEngraver {
    anchors: RelAnchors,
    verse: u32,
    syllables: Vec<LyricSyllable>,
}

impl LyricEngraver {
    pub fn new(relation: RelationId, verse: u32, syllables: Vec<LyricSyllable>) -> Self {
        Self {
            anchors: RelAnchors::new(relation),
            verse,
            syllables,
        }
    }

    /// Baseline y of this verse under the staff of `anchor`.
    fn baseline(&self, ctx: &EngraveContext, anchor: &AnchorInfo) -> f64 {
        ctx.profile.staff_bottom(anchor.abs_staff)
            + ctx.tenths(LYRIC_SPACE_TO_STAFF, anchor)
            + (self.verse.saturating_sub(1)) as f64 * ctx.tenths(LYRIC_VERSE_DISTANCE, anchor)
    }

    /// Composite of the syllables (and trailing hyphens) whose anchor
    /// notes lie in `system`.
    fn engrave_system(
        &self,
        ctx: &mut EngraveContext,
        system: usize,
        x_right: f64,
    ) -> Result<ShapeId, EngraveError> {
        let all = self.anchors.all();
        let in_system: Vec<(usize, AnchorInfo)> = all
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, a)| a.system == system)
            .collect();
        let first = in_system.first().map(|(_, a)| *a).ok_or_else(|| {
            EngraveError::IncompleteRelation {
                relation: self.anchors.relation(),
                detail: format!("no lyric anchors in system {system}"),
            }
        })?;

        let font_h = ctx.tenths(LYRIC_FONT_HEIGHT, &first);
        let y = self.baseline(ctx, &first);
        let line = ctx
            .tree
            .add_composite(ShapeKind::LyricText, Some(first.staffobj), ShapeLayer::AuxObjs);

        let mut prev_right: Option<f64> = None;
        let mut prev_hyphenated = false;
        for (idx, anchor) in &in_system {
            let text = self
                .syllables
                .get(*idx)
                .map(|s| s.text.as_str())
                .unwrap_or("");
            let w = font_h * 0.5 * text.chars().count().max(1) as f64;
            let note_b = ctx.tree.bounds(anchor.shape);
            let center = note_b.x + note_b.width / 2.0;
            let rect = Rect::new(center - w / 2.0, y, w, font_h);
            let syl = ctx.tree.add_simple(
                ShapeKind::LyricText,
                Some(anchor.staffobj),
                rect,
                ShapeLayer::AuxObjs,
            );
            ctx.tree.add_component(line, syl);

            if prev_hyphenated {
                if let Some(right) = prev_right {
                    let gap = rect.x - right;
                    if gap > 1.0 {
                        let hw = ctx.tenths(LYRIC_HYPHEN_WIDTH, anchor).min(gap * 0.5);
                        let hx = right + (gap - hw) / 2.0;
                        let hyphen = ctx.tree.add_simple(
                            ShapeKind::LyricHyphen,
                            Some(anchor.staffobj),
                            Rect::new(hx, y + font_h * 0.55, hw, font_h * 0.08),
                            ShapeLayer::AuxObjs,
                        );
                        ctx.tree.add_component(line, hyphen);
                    }
                }
            }
            prev_right = Some(rect.right());
            prev_hyphenated = self
                .syllables
                .get(*idx)
                .map(|s| s.hyphenated)
                .unwrap_or(false);
        }

        // hyphen running to the break when the word continues on the
        // next system
        if prev_hyphenated {
            if let Some(right) = prev_right {
                let last = in_system[in_system.len() - 1].1;
                if in_system.len() < all.len() && right + 1.0 < x_right {
                    let hw = ctx.tenths(LYRIC_HYPHEN_WIDTH, &last);
                    let hx = (right + x_right) / 2.0 - hw / 2.0;
                    let hyphen = ctx.tree.add_simple(
                        ShapeKind::LyricHyphen,
                        Some(last.staffobj),
                        Rect::new(hx, y + font_h * 0.55, hw, font_h * 0.08),
                        ShapeLayer::AuxObjs,
                    );
                    ctx.tree.add_component(line, hyphen);
                }
            }
        }

        ctx.profile.update_shape(ctx.tree, line, first.abs_staff);
        store_system_shape(ctx, line, system, first.instr);
        Ok(line)
    }
}

impl RelObjEngraver for LyricEngraver {
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
        let line = self.engrave_system(ctx, start.system, f64::INFINITY)?;
        Ok(vec![line])
    }

    fn create_first_or_intermediate_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        self.anchors.require_complete()?;
        Ok(Some(self.engrave_system(ctx, span.system, span.x_right)?))
    }

    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        self.anchors.require_complete()?;
        Ok(Some(self.engrave_system(ctx, span.system, span.x_right)?))
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

    fn syllable(text: &str, hyphenated: bool) -> LyricSyllable {
        LyricSyllable { text: text.into(), hyphenated }
    }

    #[test]
    fn syllables_sit_under_their_notes_with_hyphen_between() {
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

        let note = |id: u64| StaffObject {
            id: ObjId(id),
            time: 0.0,
            duration: 1.0,
            voice: 1,
            instr: 0,
            staff: 0,
            kind: StaffObjKind::Note {
                step: 6,
                note_type: NoteType::Quarter,
                dots: 0,
                accidental: None,
                stem: StemDir::Up,
            },
        };
        let n1 = engrave_staffobj(
            &note(1),
            &StaffObjPos { x: 100.0, staff_top: 1000.0, instr: 0, staff: 0 },
            &mut ctx,
        )
        .unwrap()
        .0;
        let n2 = engrave_staffobj(
            &note(2),
            &StaffObjPos { x: 900.0, staff_top: 1000.0, instr: 0, staff: 0 },
            &mut ctx,
        )
        .unwrap()
        .0;

        let mut eng = LyricEngraver::new(
            RelationId(30),
            1,
            vec![syllable("glo", true), syllable("ry", false)],
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
        eng.set_start_staffobj(anchor(n1, 0));
        eng.set_end_staffobj(anchor(n2, 1));

        let shapes = eng.create_shapes(&mut ctx).unwrap();
        assert_eq!(shapes.len(), 1);
        let parts = ctx.tree.get(shapes[0]).components().to_vec();
        let texts: Vec<_> = parts
            .iter()
            .filter(|&&p| ctx.tree.get(p).kind == ShapeKind::LyricText)
            .collect();
        let hyphens: Vec<_> = parts
            .iter()
            .filter(|&&p| ctx.tree.get(p).kind == ShapeKind::LyricHyphen)
            .collect();
        assert_eq!(texts.len(), 2);
        assert_eq!(hyphens.len(), 1);

        // everything below the staff
        for &&p in texts.iter().chain(hyphens.iter()) {
            assert!(ctx.tree.bounds(p).top() >= 1720.0);
        }
    }

    #[test]
    fn second_verse_sits_below_the_first() {
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
        let anchor = AnchorInfo {
            staffobj: ObjId(1),
            shape: ctx.tree.add_simple(
                ShapeKind::Note,
                None,
                Rect::new(100.0, 1300.0, 200.0, 400.0),
                ShapeLayer::Notes,
            ),
            instr: 0,
            staff: 0,
            abs_staff: 0,
            system: 0,
            column: 0,
        };

        let v1 = LyricEngraver::new(RelationId(1), 1, vec![]).baseline(&ctx, &anchor);
        let v2 = LyricEngraver::new(RelationId(2), 2, vec![]).baseline(&ctx, &anchor);
        assert!(v2 > v1);
    }
}
