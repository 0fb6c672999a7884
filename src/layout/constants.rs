//! Shared engraving constants (all in tenths unless noted).

// ── Systems & spacing ───────────────────────────────────────────────
pub(crate) const SYSTEM_DISTANCE: f64 = 100.0; // between successive systems
pub(crate) const STAFF_DISTANCE: f64 = 100.0; // between staves of one instrument
pub(crate) const INSTRUMENT_DISTANCE: f64 = 120.0; // between instruments
pub(crate) const FIRST_SYSTEM_TOP: f64 = 80.0; // above the first system
pub(crate) const PROLOG_GAP: f64 = 7.5; // after the system prolog
pub(crate) const STAFF_LINE_THICKNESS: f64 = 1.5;

// ── Notes ───────────────────────────────────────────────────────────
pub(crate) const NOTEHEAD_WIDTH: f64 = 11.9;
pub(crate) const NOTEHEAD_HEIGHT: f64 = 10.0;
pub(crate) const STEM_LENGTH: f64 = 35.0; // one octave, standard engraving
pub(crate) const STEM_WIDTH: f64 = 1.2;
pub(crate) const FLAG_WIDTH: f64 = 10.5;
pub(crate) const DOT_SPACE: f64 = 5.0; // notehead to first dot
pub(crate) const ACCIDENTAL_SPACE: f64 = 1.5; // accidental to notehead
pub(crate) const ACCIDENTAL_WIDTH: f64 = 9.0;
pub(crate) const ACCIDENTAL_HEIGHT: f64 = 25.0;
pub(crate) const REST_WIDTH: f64 = 15.0;
pub(crate) const CLEF_WIDTH: f64 = 25.0;
pub(crate) const CLEF_HEIGHT: f64 = 70.0;
pub(crate) const BARLINE_THIN_WIDTH: f64 = 1.5;
pub(crate) const BARLINE_THICK_WIDTH: f64 = 6.0;
pub(crate) const BARLINE_GAP: f64 = 4.0; // between the lines of a double barline

// ── Beams ───────────────────────────────────────────────────────────
pub(crate) const BEAM_THICKNESS: f64 = 5.0;

// ── Slurs & ties ────────────────────────────────────────────────────
pub(crate) const SLUR_SPACE_TO_NOTE: f64 = 5.0;
pub(crate) const SLUR_HEIGHT_FACTOR: f64 = 0.18; // arch height as fraction of span
pub(crate) const SLUR_MIN_HEIGHT: f64 = 10.0;
pub(crate) const SLUR_MAX_HEIGHT: f64 = 40.0;
pub(crate) const TIE_HEIGHT_FACTOR: f64 = 0.12;
pub(crate) const TIE_MIN_HEIGHT: f64 = 6.0;
pub(crate) const TIE_MAX_HEIGHT: f64 = 15.0;

// ── Tuplets ─────────────────────────────────────────────────────────
pub(crate) const TUPLET_BRACKET_DISTANCE: f64 = 10.0; // stem tip to bracket
pub(crate) const TUPLET_BRACKET_HOOK: f64 = 7.0;
pub(crate) const TUPLET_NUMBER_HEIGHT: f64 = 14.0;

// ── Wedges, pedal, volta ────────────────────────────────────────────
pub(crate) const WEDGE_HEIGHT: f64 = 12.0; // mouth opening of a hairpin
pub(crate) const WEDGE_NIENTE_RADIUS: f64 = 3.0; // circle at the closed end
pub(crate) const WEDGE_SPACE_TO_STAFF: f64 = 25.0;
pub(crate) const PEDAL_LINE_HEIGHT: f64 = 15.0;
pub(crate) const PEDAL_SPACE_TO_STAFF: f64 = 35.0;
pub(crate) const VOLTA_BRACKET_DISTANCE: f64 = 20.0; // above the staff
pub(crate) const VOLTA_JOG_LENGTH: f64 = 15.0;
pub(crate) const VOLTA_TEXT_SPACE: f64 = 4.0;

// ── Lyrics & dynamics ───────────────────────────────────────────────
pub(crate) const LYRIC_SPACE_TO_STAFF: f64 = 40.0;
pub(crate) const LYRIC_VERSE_DISTANCE: f64 = 20.0; // between stacked verses
pub(crate) const LYRIC_FONT_HEIGHT: f64 = 18.0;
pub(crate) const LYRIC_HYPHEN_WIDTH: f64 = 7.0;
pub(crate) const DYNAMICS_SPACE_TO_NOTE: f64 = 10.0;
pub(crate) const DYNAMICS_GLYPH_WIDTH: f64 = 14.0; // per letter of the marking
pub(crate) const DYNAMICS_GLYPH_HEIGHT: f64 = 18.0;
