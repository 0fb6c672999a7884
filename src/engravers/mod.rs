//! Engravers: stateful objects converting musical objects into shapes.
//!
//! Simple staff objects (notes, rests, clefs, barlines) are engraved in
//! one shot. Relation objects spanning several staff objects follow a
//! three-phase protocol instead: the layouter feeds the engraver one
//! anchor at a time (`set_start_staffobj`, zero or more
//! `set_middle_staffobj`, `set_end_staffobj`), and only then asks it to
//! finalize. Relations confined to one system finalize through
//! [`RelObjEngraver::create_shapes`]; relations crossing systems get
//! one shape per system through
//! [`RelObjEngraver::create_first_or_intermediate_shape`] and
//! [`RelObjEngraver::create_last_shape`].

use crate::error::EngraveError;
use crate::graphic_model::ShapeBoxInfo;
use crate::layout::VerticalProfile;
use crate::model::{ObjId, RelationId};
use crate::registry::ShapesStorage;
use crate::shapes::{ShapeId, ShapeTree};
use crate::units::UnitConverter;

pub mod beam;
pub mod chord;
pub mod dynamics;
pub mod lyric;
pub mod notes;
pub mod pedal;
pub mod slur;
pub mod tie;
pub mod tuplet;
pub mod volta;
pub mod wedge;

// ═══════════════════════════════════════════════════════════════════
// Anchor and context data fed to engravers
// ═══════════════════════════════════════════════════════════════════

/// Everything an engraver needs to know about one member staff object:
/// which shape anchors it and where that shape lives in the layout.
#[derive(Debug, Clone, Copy)]
pub struct AnchorInfo {
    pub staffobj: ObjId,
    /// Shape already engraved for the staff object.
    pub shape: ShapeId,
    pub instr: usize,
    /// Staff within the instrument, for unit conversion.
    pub staff: usize,
    /// Absolute staff index across all instruments, for the vertical
    /// profile.
    pub abs_staff: usize,
    pub system: usize,
    pub column: usize,
}

/// Horizontal extent of one system, for shapes clipped to it.
#[derive(Debug, Clone, Copy)]
pub struct SystemSpan {
    pub system: usize,
    pub x_left: f64,
    pub x_right: f64,
    /// Top of the relevant staff within this system.
    pub staff_top: f64,
}

/// Mutable layout state an engraver works against while finalizing.
pub struct EngraveContext<'a> {
    pub tree: &'a mut ShapeTree,
    pub profile: &'a mut VerticalProfile,
    pub converter: &'a UnitConverter,
    pub storage: &'a mut ShapesStorage,
}

impl EngraveContext<'_> {
    /// Tenths to logical units for the staff of `anchor`.
    pub fn tenths(&self, value: f64, anchor: &AnchorInfo) -> f64 {
        self.converter.tenths_to_logical(value, anchor.instr, anchor.staff)
    }
}

// ═══════════════════════════════════════════════════════════════════
// Protocol state shared by all relation engravers
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unstarted,
    Started,
    Ended,
}

/// Anchor accumulator embedded in every relation engraver; enforces the
/// start → middle* → end protocol.
#[derive(Debug)]
pub struct RelAnchors {
    relation: RelationId,
    phase: Phase,
    start: Option<AnchorInfo>,
    middle: Vec<AnchorInfo>,
    end: Option<AnchorInfo>,
}

impl RelAnchors {
    pub fn new(relation: RelationId) -> Self {
        Self {
            relation,
            phase: Phase::Unstarted,
            start: None,
            middle: Vec::new(),
            end: None,
        }
    }

    pub fn relation(&self) -> RelationId {
        self.relation
    }

    /// Record the start anchor. Calling this twice is a caller bug.
    pub fn on_start(&mut self, anchor: AnchorInfo) {
        debug_assert_eq!(self.phase, Phase::Unstarted, "relation started twice");
        self.start = Some(anchor);
        self.phase = Phase::Started;
    }

    pub fn on_middle(&mut self, anchor: AnchorInfo) {
        debug_assert_eq!(self.phase, Phase::Started, "middle anchor out of order");
        self.middle.push(anchor);
    }

    pub fn on_end(&mut self, anchor: AnchorInfo) {
        debug_assert_eq!(self.phase, Phase::Started, "end anchor out of order");
        self.end = Some(anchor);
        self.phase = Phase::Ended;
    }

    /// Both outer anchors, or the error that forbids finalization.
    pub fn require_complete(&self) -> Result<(AnchorInfo, AnchorInfo), EngraveError> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Ok((s, e)),
            (Some(_), None) => Err(EngraveError::IncompleteRelation {
                relation: self.relation,
                detail: "start anchor without matching end".into(),
            }),
            (None, Some(_)) => Err(EngraveError::IncompleteRelation {
                relation: self.relation,
                detail: "end anchor without matching start".into(),
            }),
            (None, None) => Err(EngraveError::IncompleteRelation {
                relation: self.relation,
                detail: "no anchors recorded".into(),
            }),
        }
    }

    pub fn start(&self) -> Option<&AnchorInfo> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Option<&AnchorInfo> {
        self.end.as_ref()
    }

    pub fn middles(&self) -> &[AnchorInfo] {
        &self.middle
    }

    /// All anchors in document order.
    pub fn all(&self) -> Vec<AnchorInfo> {
        let mut v = Vec::with_capacity(self.middle.len() + 2);
        v.extend(self.start);
        v.extend_from_slice(&self.middle);
        v.extend(self.end);
        v
    }

    /// Anchors lying in `system`, in document order.
    pub fn in_system(&self, system: usize) -> Vec<AnchorInfo> {
        self.all().into_iter().filter(|a| a.system == system).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════
// The relation engraver interface
// ═══════════════════════════════════════════════════════════════════

/// One in-progress relation object being turned into shapes.
///
/// The per-system methods return `None` by default: relation kinds that
/// cannot be split (beams, chords, tuplets) only implement
/// `create_shapes`, and the layouter falls back to it on the relation's
/// last system.
pub trait RelObjEngraver {
    fn relation(&self) -> RelationId;

    fn set_start_staffobj(&mut self, anchor: AnchorInfo);

    fn set_middle_staffobj(&mut self, anchor: AnchorInfo) {
        let _ = anchor;
    }

    fn set_end_staffobj(&mut self, anchor: AnchorInfo);

    /// Finalize a relation confined to one system. May return several
    /// shapes (lyric syllables), one (slur arch) or none at all
    /// (chords only mutate the note shapes).
    fn create_shapes(&mut self, ctx: &mut EngraveContext) -> Result<Vec<ShapeId>, EngraveError>;

    /// Shape for one system before the last, for relations crossing
    /// systems.
    fn create_first_or_intermediate_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let _ = (ctx, span);
        Ok(None)
    }

    /// Shape for the relation's last system.
    fn create_last_shape(
        &mut self,
        ctx: &mut EngraveContext,
        span: SystemSpan,
    ) -> Result<Option<ShapeId>, EngraveError> {
        let _ = (ctx, span);
        Ok(None)
    }
}

/// Whether a note shape's stem points up, judged from the engraved
/// geometry. `None` when the note has no stem or no notehead.
pub(crate) fn note_stem_up(tree: &ShapeTree, note: ShapeId) -> Option<bool> {
    let stem = tree.component_of_kind(note, crate::shapes::ShapeKind::Stem)?;
    let head = tree.component_of_kind(note, crate::shapes::ShapeKind::Notehead)?;
    let sb = tree.bounds(stem);
    let hb = tree.bounds(head);
    Some(sb.y + sb.height / 2.0 < hb.y + hb.height / 2.0)
}

/// Record a finished relation shape for later insertion into its box.
pub(crate) fn store_system_shape(
    ctx: &mut EngraveContext,
    shape: ShapeId,
    system: usize,
    instr: usize,
) {
    let layer = ctx.tree.get(shape).layer;
    ctx.storage.add_ready_shape(
        shape,
        layer,
        ShapeBoxInfo {
            system,
            column: None,
            instr,
        },
    );
}
