//! Data model for the resolved score document handed to the engine.
//!
//! The engine receives an already-parsed, time-ordered document: staff
//! objects grouped into columns (vertical time slices) plus the relation
//! objects that tie several staff objects together (beams, slurs, ties,
//! tuplets, wedges, volta brackets, pedal lines, lyric lines). The model
//! is immutable from the engraving engine's point of view.

use serde::{Deserialize, Serialize};

/// Identity of a staff object, stable for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u64);

/// Identity of a relation object, usable as a registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub u64);

/// A complete resolved score document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDocument {
    /// Instruments, in top-to-bottom score order.
    pub instruments: Vec<Instrument>,
    /// Ordered columns (time slices). Column order is document order.
    pub columns: Vec<Column>,
    /// Relation objects spanning two or more staff objects.
    pub relations: Vec<RelationObject>,
}

impl ScoreDocument {
    /// Staff count per instrument, in score order.
    pub fn staves_per_instr(&self) -> Vec<usize> {
        self.instruments.iter().map(|i| i.num_staves.max(1)).collect()
    }

    /// Total number of staves across all instruments.
    pub fn total_staves(&self) -> usize {
        self.staves_per_instr().iter().sum()
    }

    /// Flat staff index for an (instrument, staff) pair.
    pub fn staff_index(&self, instr: usize, staff: usize) -> usize {
        self.instruments[..instr]
            .iter()
            .map(|i| i.num_staves.max(1))
            .sum::<usize>()
            + staff
    }

    /// Look up a staff object by id, searching all columns.
    pub fn find_staffobj(&self, id: ObjId) -> Option<&StaffObject> {
        self.columns
            .iter()
            .flat_map(|c| c.objects.iter())
            .find(|so| so.id == id)
    }
}

/// One instrument (part) of the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Display name (e.g., "Classical Guitar")
    pub name: Option<String>,
    /// Number of staves (2 for a piano grand staff)
    pub num_staves: usize,
}

/// A vertical time slice holding every staff object that shares a time
/// position, across all instruments and staves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Time position of the slice, in note-duration units.
    pub time: f64,
    /// Natural (spacing-algorithm) width in logical units, gross.
    pub main_width: f64,
    /// Width with trailing variable space trimmed, used by the breakers.
    pub trimmed_width: f64,
    /// When set, a system break is forced right after this column.
    pub system_break: bool,
    /// Penalty factor applied when a system ends at this column.
    /// 1.0 for columns ended in a barline; larger values discourage
    /// breaking after mid-measure columns.
    pub penalty_factor: f64,
    /// The staff objects at this time position.
    pub objects: Vec<StaffObject>,
}

impl Column {
    pub fn new(time: f64, width: f64) -> Self {
        Self {
            time,
            main_width: width,
            trimmed_width: width,
            system_break: false,
            penalty_factor: 1.0,
            objects: Vec::new(),
        }
    }
}

/// One staff object: a single musical meaning placed at a time position
/// on one staff of one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffObject {
    pub id: ObjId,
    /// Time position in note-duration units.
    pub time: f64,
    /// Duration in note-duration units (0 for clefs, barlines, marks).
    pub duration: f64,
    /// Voice number within the staff (1-based).
    pub voice: usize,
    /// Instrument index into `ScoreDocument::instruments`.
    pub instr: usize,
    /// Staff index within the instrument (0-based).
    pub staff: usize,
    pub kind: StaffObjKind,
}

/// The musical meaning of a staff object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StaffObjKind {
    Note {
        /// Vertical staff step: 0 = top staff line, each step is half an
        /// interline, growing downwards (step 8 = bottom line).
        step: i32,
        note_type: NoteType,
        dots: u8,
        accidental: Option<Accidental>,
        stem: StemDir,
    },
    Rest {
        note_type: NoteType,
        dots: u8,
    },
    Clef {
        clef: ClefType,
    },
    Barline {
        style: BarlineStyle,
    },
    /// A dynamics mark attached at this time position (p, f, sfz...).
    Dynamics {
        marking: String,
        placement: Placement,
    },
}

impl StaffObject {
    pub fn is_note(&self) -> bool {
        matches!(self.kind, StaffObjKind::Note { .. })
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, StaffObjKind::Rest { .. })
    }

    pub fn is_barline(&self) -> bool {
        matches!(self.kind, StaffObjKind::Barline { .. })
    }
}

/// Rhythmic value of a note or rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteType {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

impl NoteType {
    /// Number of flags (or beam levels) for this value.
    pub fn flag_count(&self) -> u8 {
        match self {
            NoteType::Whole | NoteType::Half | NoteType::Quarter => 0,
            NoteType::Eighth => 1,
            NoteType::Sixteenth => 2,
            NoteType::ThirtySecond => 3,
            NoteType::SixtyFourth => 4,
        }
    }

    /// Whether the notehead is filled.
    pub fn is_filled(&self) -> bool {
        !matches!(self, NoteType::Whole | NoteType::Half)
    }

    /// Whether the note carries a stem at all.
    pub fn has_stem(&self) -> bool {
        !matches!(self, NoteType::Whole)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
}

/// Explicit stem direction, or Auto to let the engraver decide from the
/// staff position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemDir {
    Up,
    Down,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClefType {
    Treble,
    Bass,
    Alto,
    Tenor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarlineStyle {
    Regular,
    Double,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Above,
    Below,
}

/// An ordered collection of two or more staff objects that must be
/// engraved jointly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationObject {
    pub id: RelationId,
    pub kind: RelationKind,
    /// Member staff objects in document order. First is the start
    /// anchor, last is the end anchor; any others are middle anchors.
    pub members: Vec<ObjId>,
    pub data: RelationData,
}

impl RelationObject {
    /// The role a member staff object plays in this relation.
    /// Precondition: `id` is a member.
    pub fn role_of(&self, id: ObjId) -> RelationRole {
        if self.members.first() == Some(&id) {
            RelationRole::Start
        } else if self.members.last() == Some(&id) {
            RelationRole::End
        } else {
            RelationRole::Middle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationRole {
    Start,
    Middle,
    End,
}

/// Kind of joint construct a relation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Beam,
    Chord,
    Slur,
    Tie,
    Tuplet,
    Wedge,
    VoltaBracket,
    PedalLine,
    LyricLine,
}

/// Kind-specific relation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelationData {
    None,
    Lyric {
        /// Verse number, 1-based. Distinguishes parallel lyric lines.
        verse: u32,
        /// One syllable per member note, in member order.
        syllables: Vec<LyricSyllable>,
    },
    Wedge {
        /// true for crescendo, false for diminuendo.
        crescendo: bool,
        /// Niente circle at the closed end.
        niente: bool,
    },
    Volta {
        /// Displayed text, e.g. "1." or "2."
        text: String,
    },
    Tuplet {
        /// Displayed ratio label, e.g. "3".
        label: String,
    },
}

/// One lyric syllable attached to a member note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricSyllable {
    pub text: String,
    /// Followed by a hyphen to the next syllable.
    pub hyphenated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_roles() {
        let rel = RelationObject {
            id: RelationId(1),
            kind: RelationKind::Slur,
            members: vec![ObjId(10), ObjId(11), ObjId(12)],
            data: RelationData::None,
        };
        assert_eq!(rel.role_of(ObjId(10)), RelationRole::Start);
        assert_eq!(rel.role_of(ObjId(11)), RelationRole::Middle);
        assert_eq!(rel.role_of(ObjId(12)), RelationRole::End);
    }

    #[test]
    fn staff_index_is_flat_across_instruments() {
        let doc = ScoreDocument {
            instruments: vec![
                Instrument { id: "P1".into(), name: None, num_staves: 2 },
                Instrument { id: "P2".into(), name: None, num_staves: 1 },
            ],
            columns: vec![],
            relations: vec![],
        };
        assert_eq!(doc.staff_index(0, 0), 0);
        assert_eq!(doc.staff_index(0, 1), 1);
        assert_eq!(doc.staff_index(1, 0), 2);
        assert_eq!(doc.total_staves(), 3);
    }
}
