//! Beam engraver.
//!
//! A beam joins the stems of its member notes: flags disappear, every
//! stem is stretched (or trimmed) so its tip lands on the beam line,
//! and the beam shape registers as observer of each stem so it follows
//! later adjustments.

use crate::engravers::{AnchorInfo, EngraveContext, RelAnchors, RelObjEngraver, store_system_shape};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::layout::constants::BEAM_THICKNESS;
use crate::model::RelationId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer};

pub struct BeamEngraver {
    anchors: RelAnchors,
}

impl BeamEngraver {
    pub fn new(relation: RelationId) -> Self {
        Self { anchors: RelAnchors::new(relation) }
    }
}

impl RelObjEngraver for BeamEngraver {
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
        let anchors = self.anchors.all();

        // stems of the member notes, with whether each points up
        let mut stems: Vec<(ShapeId, bool)> = Vec::with_capacity(anchors.len());
        for a in &anchors {
            if let Some(stem) = ctx.tree.component_of_kind(a.shape, ShapeKind::Stem) {
                let stem_up = stem_points_up(ctx, a.shape, stem);
                stems.push((stem, stem_up));
            }
            if let Some(flag) = ctx.tree.component_of_kind(a.shape, ShapeKind::Flag) {
                ctx.tree.remove_shape(flag);
            }
        }
        if stems.len() < 2 {
            return Err(EngraveError::IncompleteRelation {
                relation: self.anchors.relation(),
                detail: "beam needs at least two stemmed notes".into(),
            });
        }

        // beam direction: majority of member stems
        let ups = stems.iter().filter(|(_, up)| *up).count();
        let beam_up = ups * 2 >= stems.len();

        // beam line: the extreme tip among members, so no stem gets
        // shorter than its natural length
        let tip_y = stems
            .iter()
            .map(|&(stem, _)| {
                let b = ctx.tree.bounds(stem);
                if beam_up { b.top() } else { b.bottom() }
            })
            .fold(if beam_up { f64::INFINITY } else { f64::NEG_INFINITY }, |acc, y| {
                if beam_up { acc.min(y) } else { acc.max(y) }
            });

        // stretch every stem to reach the line
        for &(stem, _) in &stems {
            let b = ctx.tree.bounds(stem);
            if beam_up {
                ctx.tree.set_bounds(stem, Rect::new(b.x, tip_y, b.width, b.bottom() - tip_y));
            } else {
                ctx.tree.set_bounds(stem, Rect::new(b.x, b.y, b.width, tip_y - b.y));
            }
        }

        let first = ctx.tree.bounds(stems[0].0);
        let last = ctx.tree.bounds(stems[stems.len() - 1].0);
        let thickness = ctx.tenths(BEAM_THICKNESS, &start);
        let beam_rect = if beam_up {
            Rect::new(first.x, tip_y, last.right() - first.x, thickness)
        } else {
            Rect::new(first.x, tip_y - thickness, last.right() - first.x, thickness)
        };
        let beam = ctx.tree.add_simple(
            ShapeKind::Beam,
            None,
            beam_rect,
            ShapeLayer::Notes,
        );

        for &(stem, _) in &stems {
            ctx.tree.link_observer(stem, beam);
        }

        ctx.profile.update_shape(ctx.tree, beam, start.abs_staff);
        store_system_shape(ctx, beam, start.system, start.instr);
        Ok(vec![beam])
    }
}

/// A stem points up when its body lies mostly above the notehead.
fn stem_points_up(ctx: &EngraveContext, note: ShapeId, stem: ShapeId) -> bool {
    let stem_b = ctx.tree.bounds(stem);
    match ctx.tree.component_of_kind(note, ShapeKind::Notehead) {
        Some(head) => {
            let head_center = ctx.tree.bounds(head).y + ctx.tree.bounds(head).height / 2.0;
            stem_b.y + stem_b.height / 2.0 < head_center
        }
        None => true,
    }
}
