//! Layout: turns a score document into a graphic model.
//!
//! The work splits into two passes. Pass one measures the columns and
//! decides which column starts each system, using the greedy or the
//! optimal breaker. Pass two walks systems, columns and staff objects
//! in document order: it stretches column widths to fill each system,
//! builds the box tree, engraves every staff object, drives the
//! relation engravers through their start/middle/end protocol, and
//! finally drains the buffered shapes into their boxes.
//!
//! Layout is single-threaded and deterministic: the same document and
//! options always produce the same shapes.

pub mod breaker;
pub(crate) mod constants;
pub mod right_aligner;
pub mod vertical_profile;

pub use self::breaker::{break_lines_greedy, BreakContext, ColumnMeasure, LinesBreakerOptimal};
pub use self::right_aligner::RightAligner;
pub use self::vertical_profile::VerticalProfile;

use std::collections::HashMap;

use log::debug;

use crate::engravers::beam::BeamEngraver;
use crate::engravers::chord::ChordEngraver;
use crate::engravers::dynamics::engrave_dynamics;
use crate::engravers::lyric::LyricEngraver;
use crate::engravers::notes::{clef_glyph, engrave_staffobj, StaffObjPos};
use crate::engravers::pedal::PedalEngraver;
use crate::engravers::slur::SlurEngraver;
use crate::engravers::tie::TieEngraver;
use crate::engravers::tuplet::TupletEngraver;
use crate::engravers::volta::VoltaEngraver;
use crate::engravers::wedge::WedgeEngraver;
use crate::engravers::{AnchorInfo, EngraveContext, RelObjEngraver, SystemSpan};
use crate::error::EngraveError;
use crate::geometry::Rect;
use crate::graphic_model::{GraphicModel, ShapeBoxInfo, SliceBox, SystemBox};
use crate::model::{
    ClefType, RelationData, RelationKind, RelationObject, RelationRole, ScoreDocument,
    StaffObjKind, StaffObject,
};
use crate::registry::{EngraverKey, EngraversMap, ShapesStorage};
use crate::shapes::{ShapeKind, ShapeLayer};
use crate::units::UnitConverter;

use self::constants::{
    CLEF_WIDTH, FIRST_SYSTEM_TOP, INSTRUMENT_DISTANCE, PROLOG_GAP, STAFF_DISTANCE,
    STAFF_LINE_THICKNESS, SYSTEM_DISTANCE,
};

/// Which breaker decides the column-to-system assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStrategy {
    Greedy,
    Optimal,
}

/// Knobs for one layout pass.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Usable page width in logical units.
    pub page_width: f64,
    /// Extra indent of the first system (part names, tradition).
    pub first_system_indent: f64,
    pub strategy: BreakerStrategy,
    /// Stretch the last system to the full width too.
    pub justify_last_line: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            // 190 mm of usable width
            page_width: 19_000.0,
            first_system_indent: 0.0,
            strategy: BreakerStrategy::Optimal,
            justify_last_line: false,
        }
    }
}

/// Geometry of one system decided before any shape is engraved.
struct SystemFrame {
    first_column: usize,
    last_column: usize,
    rect: Rect,
    target_width: f64,
    x_left: f64,
    /// Width reserved at the start for the prolog clefs.
    prolog_width: f64,
    /// Clefs to engrave in the prolog: (instr, staff, clef).
    prolog_clefs: Vec<(usize, usize, ClefType)>,
    /// Top line y of every staff, indexed by absolute staff.
    staff_tops: Vec<f64>,
}

/// The orchestrator: one instance per layout pass.
pub struct ColumnSystemLayouter<'a> {
    doc: &'a ScoreDocument,
    options: LayoutOptions,
    converter: UnitConverter,
}

impl<'a> ColumnSystemLayouter<'a> {
    pub fn new(doc: &'a ScoreDocument, options: LayoutOptions) -> Self {
        let converter = UnitConverter::new(&doc.staves_per_instr());
        Self {
            doc,
            options,
            converter,
        }
    }

    /// Run the full layout and produce the graphic model.
    pub fn layout(&self) -> Result<GraphicModel, EngraveError> {
        self.validate()?;

        let breaks = self.decide_breaks();
        debug!("break sequence: {breaks:?}");

        let frames = self.build_frames(&breaks);
        let mut model = GraphicModel::new();
        let mut profiles = self.build_boxes_and_profiles(&frames, &mut model);
        let mut storage = ShapesStorage::new();

        self.engrave_pass(&frames, &mut profiles, &mut model, &mut storage)?;

        storage.add_ready_shapes_to_model(&mut model);
        Ok(model)
    }

    fn validate(&self) -> Result<(), EngraveError> {
        if self.doc.instruments.is_empty() {
            return Err(EngraveError::EmptyDocument("no instruments".into()));
        }
        if self.doc.columns.is_empty() {
            return Err(EngraveError::EmptyDocument("no columns".into()));
        }
        for (index, col) in self.doc.columns.iter().enumerate() {
            if !col.main_width.is_finite() || col.main_width <= 0.0 {
                return Err(EngraveError::InvalidColumn {
                    index,
                    detail: format!("non-positive width {}", col.main_width),
                });
            }
            for so in &col.objects {
                if so.instr >= self.doc.instruments.len() {
                    return Err(EngraveError::InvalidColumn {
                        index,
                        detail: format!("object {:?} names instrument {}", so.id, so.instr),
                    });
                }
            }
        }
        for rel in &self.doc.relations {
            if rel.members.len() < 2 {
                return Err(EngraveError::DegenerateRelation {
                    relation: rel.id,
                    count: rel.members.len(),
                });
            }
            for &member in &rel.members {
                if self.doc.find_staffobj(member).is_none() {
                    return Err(EngraveError::UnknownStaffObject {
                        relation: rel.id,
                        object: member,
                    });
                }
            }
        }
        Ok(())
    }

    fn decide_breaks(&self) -> Vec<usize> {
        let measures: Vec<ColumnMeasure> = self
            .doc
            .columns
            .iter()
            .map(|c| ColumnMeasure {
                trimmed_width: c.trimmed_width,
                system_break: c.system_break,
                penalty_factor: c.penalty_factor,
            })
            .collect();
        let ctx = BreakContext {
            columns: &measures,
            first_system_width: self.options.page_width - self.options.first_system_indent,
            other_systems_width: self.options.page_width,
        };
        match self.options.strategy {
            BreakerStrategy::Greedy => break_lines_greedy(&ctx),
            BreakerStrategy::Optimal => {
                LinesBreakerOptimal::new(self.options.justify_last_line).decide_line_breaks(&ctx)
            }
        }
    }

    /// Decide every system's vertical frame and prolog before engraving.
    fn build_frames(&self, breaks: &[usize]) -> Vec<SystemFrame> {
        let staves = self.doc.staves_per_instr();
        let t = |v: f64, instr: usize, staff: usize| {
            self.converter.tenths_to_logical(v, instr, staff)
        };

        // Clef state advances with the columns; each system's prolog
        // repeats the clefs active when the system starts.
        let mut active: HashMap<(usize, usize), ClefType> = HashMap::new();
        let mut frames = Vec::with_capacity(breaks.len());
        let mut y_cursor = t(FIRST_SYSTEM_TOP, 0, 0);

        for (sys, &first) in breaks.iter().enumerate() {
            let last = breaks.get(sys + 1).copied().unwrap_or(self.doc.columns.len());

            let mut prolog_clefs: Vec<(usize, usize, ClefType)> = active
                .iter()
                .map(|(&(instr, staff), &clef)| (instr, staff, clef))
                .collect();
            prolog_clefs.sort_by_key(|&(instr, staff, _)| (instr, staff));
            let prolog_width = if prolog_clefs.is_empty() {
                0.0
            } else {
                t(CLEF_WIDTH + PROLOG_GAP, 0, 0)
            };

            for col in &self.doc.columns[first..last] {
                for so in &col.objects {
                    if let StaffObjKind::Clef { clef } = so.kind {
                        active.insert((so.instr, so.staff), clef);
                    }
                }
            }

            let x_left = if sys == 0 {
                self.options.first_system_indent
            } else {
                0.0
            };
            let target_width = self.options.page_width - x_left;

            let mut staff_tops = Vec::with_capacity(self.doc.total_staves());
            let top = y_cursor;
            let mut y = top;
            for (instr, &num_staves) in staves.iter().enumerate() {
                for staff in 0..num_staves {
                    staff_tops.push(y);
                    y += self.converter.staff_height(instr, staff);
                    if staff + 1 < num_staves {
                        y += t(STAFF_DISTANCE, instr, staff);
                    }
                }
                if instr + 1 < staves.len() {
                    y += t(INSTRUMENT_DISTANCE, instr, 0);
                }
            }
            let height = y - top;
            y_cursor = y + t(SYSTEM_DISTANCE, 0, 0);

            frames.push(SystemFrame {
                first_column: first,
                last_column: last,
                rect: Rect::new(x_left, top, target_width, height),
                target_width,
                x_left,
                prolog_width,
                prolog_clefs,
                staff_tops,
            });
        }
        frames
    }

    /// Create system and slice boxes plus one vertical profile per
    /// system, band-initialized with the staff extents.
    fn build_boxes_and_profiles(
        &self,
        frames: &[SystemFrame],
        model: &mut GraphicModel,
    ) -> Vec<VerticalProfile> {
        let staves = self.doc.staves_per_instr();
        let num_instrs = self.doc.instruments.len();
        let mut profiles = Vec::with_capacity(frames.len());

        for (sys, frame) in frames.iter().enumerate() {
            let mut system = SystemBox::new(
                sys,
                frame.rect,
                frame.target_width,
                frame.first_column,
                frame.last_column,
                num_instrs,
            );

            let natural: f64 = self.doc.columns[frame.first_column..frame.last_column]
                .iter()
                .map(|c| c.main_width)
                .sum();
            let stretch = self.stretch_factor(sys, frames.len(), frame, natural);
            debug!(
                "system {sys}: columns {}..{}, natural width {natural:.1}, stretch {stretch:.3}",
                frame.first_column, frame.last_column
            );

            let mut x = frame.x_left + frame.prolog_width;
            for col in frame.first_column..frame.last_column {
                let width = self.doc.columns[col].main_width * stretch;
                system.slices.push(SliceBox::new(
                    col,
                    Rect::new(x, frame.rect.y, width, frame.rect.height),
                    num_instrs,
                ));
                x += width;
            }
            model.systems.push(system);

            let mut profile =
                VerticalProfile::new(frame.x_left, frame.x_left + frame.target_width, frame.staff_tops.len());
            let mut abs = 0;
            for (instr, &num_staves) in staves.iter().enumerate() {
                for staff in 0..num_staves {
                    let top = frame.staff_tops[abs];
                    profile.initialize(abs, top, top + self.converter.staff_height(instr, staff));
                    abs += 1;
                }
            }
            profiles.push(profile);
        }
        profiles
    }

    fn stretch_factor(
        &self,
        sys: usize,
        num_systems: usize,
        frame: &SystemFrame,
        natural: f64,
    ) -> f64 {
        let is_last = sys + 1 == num_systems;
        if natural <= 0.0 || (is_last && !self.options.justify_last_line) {
            return 1.0;
        }
        let available = frame.target_width - frame.prolog_width;
        (available / natural).max(1.0)
    }

    /// The document-order engraving walk.
    fn engrave_pass(
        &self,
        frames: &[SystemFrame],
        profiles: &mut [VerticalProfile],
        model: &mut GraphicModel,
        storage: &mut ShapesStorage,
    ) -> Result<(), EngraveError> {
        let membership = self.relation_membership();
        let mut engravers = EngraversMap::new();
        let mut start_systems: HashMap<EngraverKey, usize> = HashMap::new();

        for (sys, frame) in frames.iter().enumerate() {
            self.engrave_staff_lines(sys, frame, model, storage);
            self.engrave_prolog(sys, frame, &mut profiles[sys], model, storage);

            for col in frame.first_column..frame.last_column {
                let slice_rect = model.systems[sys]
                    .slices
                    .iter()
                    .find(|s| s.column_index == col)
                    .map(|s| s.rect)
                    .unwrap_or(frame.rect);
                let column = &self.doc.columns[col];
                let mut deferred: Vec<&StaffObject> = Vec::new();

                for so in &column.objects {
                    if matches!(so.kind, StaffObjKind::Dynamics { .. }) {
                        deferred.push(so);
                        continue;
                    }
                    let abs_staff = self.doc.staff_index(so.instr, so.staff);
                    let pos = StaffObjPos {
                        x: slice_rect.x,
                        staff_top: frame.staff_tops[abs_staff],
                        instr: so.instr,
                        staff: so.staff,
                    };
                    let mut ctx = EngraveContext {
                        tree: &mut model.tree,
                        profile: &mut profiles[sys],
                        converter: &self.converter,
                        storage,
                    };
                    if let Some((shape, layer)) = engrave_staffobj(so, &pos, &mut ctx) {
                        ctx.profile.update_shape(ctx.tree, shape, abs_staff);
                        ctx.storage.add_ready_shape(
                            shape,
                            layer,
                            ShapeBoxInfo {
                                system: sys,
                                column: Some(col),
                                instr: so.instr,
                            },
                        );
                        let anchor = AnchorInfo {
                            staffobj: so.id,
                            shape,
                            instr: so.instr,
                            staff: so.staff,
                            abs_staff,
                            system: sys,
                            column: col,
                        };
                        self.dispatch_relations(
                            so,
                            anchor,
                            &membership,
                            &mut engravers,
                            &mut start_systems,
                            frames,
                            profiles,
                            model,
                            storage,
                        )?;
                    }
                }

                // Dynamics go last so the profile already holds the
                // notes they must clear.
                for so in deferred {
                    let abs_staff = self.doc.staff_index(so.instr, so.staff);
                    let pos = StaffObjPos {
                        x: slice_rect.x,
                        staff_top: frame.staff_tops[abs_staff],
                        instr: so.instr,
                        staff: so.staff,
                    };
                    let StaffObjKind::Dynamics { marking, placement } = &so.kind else {
                        continue;
                    };
                    let mut ctx = EngraveContext {
                        tree: &mut model.tree,
                        profile: &mut profiles[sys],
                        converter: &self.converter,
                        storage,
                    };
                    let shape =
                        engrave_dynamics(so.id, marking, *placement, &pos, abs_staff, &mut ctx);
                    ctx.storage.add_ready_shape(
                        shape,
                        ShapeLayer::AuxObjs,
                        ShapeBoxInfo {
                            system: sys,
                            column: Some(col),
                            instr: so.instr,
                        },
                    );
                    let anchor = AnchorInfo {
                        staffobj: so.id,
                        shape,
                        instr: so.instr,
                        staff: so.staff,
                        abs_staff,
                        system: sys,
                        column: col,
                    };
                    self.dispatch_relations(
                        so,
                        anchor,
                        &membership,
                        &mut engravers,
                        &mut start_systems,
                        frames,
                        profiles,
                        model,
                        storage,
                    )?;
                }
            }
        }

        if let Some(key) = engravers.pending_keys().into_iter().next() {
            if let Some(engraver) = engravers.remove_engraver(&key) {
                return Err(EngraveError::IncompleteRelation {
                    relation: engraver.relation(),
                    detail: "relation still open at end of layout".into(),
                });
            }
        }
        Ok(())
    }

    /// Five lines per staff, one composite per instrument and system.
    fn engrave_staff_lines(
        &self,
        sys: usize,
        frame: &SystemFrame,
        model: &mut GraphicModel,
        storage: &mut ShapesStorage,
    ) {
        let staves = self.doc.staves_per_instr();
        let mut abs = 0;
        for (instr, &num_staves) in staves.iter().enumerate() {
            let comp = model
                .tree
                .add_composite(ShapeKind::Staff, None, ShapeLayer::Staff);
            for staff in 0..num_staves {
                let top = frame.staff_tops[abs];
                let interline = self.converter.interline(instr, staff);
                let thickness =
                    self.converter.tenths_to_logical(STAFF_LINE_THICKNESS, instr, staff);
                for line in 0..5 {
                    let y = top + line as f64 * interline;
                    let id = model.tree.add_simple(
                        ShapeKind::Staff,
                        None,
                        Rect::new(
                            frame.x_left,
                            y - thickness / 2.0,
                            frame.target_width,
                            thickness,
                        ),
                        ShapeLayer::Staff,
                    );
                    model.tree.add_component(comp, id);
                }
                abs += 1;
            }
            storage.add_ready_shape(
                comp,
                ShapeLayer::Staff,
                ShapeBoxInfo {
                    system: sys,
                    column: None,
                    instr,
                },
            );
        }
    }

    /// Clefs repeated at the start of a continuation system.
    fn engrave_prolog(
        &self,
        sys: usize,
        frame: &SystemFrame,
        profile: &mut VerticalProfile,
        model: &mut GraphicModel,
        storage: &mut ShapesStorage,
    ) {
        for &(instr, staff, clef) in &frame.prolog_clefs {
            let abs_staff = self.doc.staff_index(instr, staff);
            let pos = StaffObjPos {
                x: frame.x_left,
                staff_top: frame.staff_tops[abs_staff],
                instr,
                staff,
            };
            let mut ctx = EngraveContext {
                tree: &mut model.tree,
                profile,
                converter: &self.converter,
                storage,
            };
            let shape = clef_glyph(None, clef, &pos, &mut ctx);
            ctx.profile.update_shape(ctx.tree, shape, abs_staff);
            ctx.storage.add_ready_shape(
                shape,
                ShapeLayer::Notes,
                ShapeBoxInfo {
                    system: sys,
                    column: None,
                    instr,
                },
            );
        }
    }

    /// Relation indices per member staff object.
    fn relation_membership(&self) -> HashMap<crate::model::ObjId, Vec<usize>> {
        let mut map: HashMap<crate::model::ObjId, Vec<usize>> = HashMap::new();
        for (i, rel) in self.doc.relations.iter().enumerate() {
            for &member in &rel.members {
                map.entry(member).or_default().push(i);
            }
        }
        map
    }

    /// Feed the anchor to every relation this staff object belongs to,
    /// finalizing relations that end here.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_relations(
        &self,
        so: &StaffObject,
        anchor: AnchorInfo,
        membership: &HashMap<crate::model::ObjId, Vec<usize>>,
        engravers: &mut EngraversMap,
        start_systems: &mut HashMap<EngraverKey, usize>,
        frames: &[SystemFrame],
        profiles: &mut [VerticalProfile],
        model: &mut GraphicModel,
        storage: &mut ShapesStorage,
    ) -> Result<(), EngraveError> {
        let Some(rel_indices) = membership.get(&so.id) else {
            return Ok(());
        };
        for &rel_index in rel_indices {
            let rel = &self.doc.relations[rel_index];
            let key = self.engraver_key(rel)?;
            match rel.role_of(so.id) {
                RelationRole::Start => {
                    let mut engraver = make_engraver(rel);
                    engraver.set_start_staffobj(anchor);
                    start_systems.insert(key.clone(), anchor.system);
                    engravers.save_engraver(engraver, key);
                }
                RelationRole::Middle => {
                    let engraver = engravers.get_engraver_mut(&key).ok_or_else(|| {
                        EngraveError::IncompleteRelation {
                            relation: rel.id,
                            detail: "middle anchor before start".into(),
                        }
                    })?;
                    engraver.set_middle_staffobj(anchor);
                }
                RelationRole::End => {
                    let mut engraver = engravers.remove_engraver(&key).ok_or_else(|| {
                        EngraveError::IncompleteRelation {
                            relation: rel.id,
                            detail: "end anchor before start".into(),
                        }
                    })?;
                    engraver.set_end_staffobj(anchor);
                    let first_system = start_systems.remove(&key).unwrap_or(anchor.system);
                    self.finalize(
                        engraver.as_mut(),
                        anchor,
                        first_system,
                        frames,
                        profiles,
                        model,
                        storage,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn engraver_key(&self, rel: &RelationObject) -> Result<EngraverKey, EngraveError> {
        if rel.kind == RelationKind::LyricLine {
            let first = rel.members.first().copied().ok_or(
                EngraveError::DegenerateRelation {
                    relation: rel.id,
                    count: 0,
                },
            )?;
            let instr = self
                .doc
                .find_staffobj(first)
                .map(|so| so.instr)
                .unwrap_or(0);
            let verse = match &rel.data {
                RelationData::Lyric { verse, .. } => *verse,
                _ => 1,
            };
            Ok(EngraverKey::lyric(instr, verse))
        } else {
            Ok(EngraverKey::from(rel.id))
        }
    }

    /// Finalize a relation whose end anchor just arrived. Same-system
    /// relations get their shapes in one call; crossing relations get
    /// one shape per system, falling back to `create_shapes` on the
    /// last system for kinds that cannot be split.
    #[allow(clippy::too_many_arguments)]
    fn finalize(
        &self,
        engraver: &mut dyn RelObjEngraver,
        end: AnchorInfo,
        first_system: usize,
        frames: &[SystemFrame],
        profiles: &mut [VerticalProfile],
        model: &mut GraphicModel,
        storage: &mut ShapesStorage,
    ) -> Result<(), EngraveError> {
        if first_system == end.system {
            let mut ctx = EngraveContext {
                tree: &mut model.tree,
                profile: &mut profiles[end.system],
                converter: &self.converter,
                storage,
            };
            engraver.create_shapes(&mut ctx)?;
            return Ok(());
        }

        for sys in first_system..=end.system {
            let frame = &frames[sys];
            let span = SystemSpan {
                system: sys,
                x_left: frame.x_left + frame.prolog_width,
                x_right: frame.x_left + frame.target_width,
                staff_top: frame.staff_tops[end.abs_staff],
            };
            let mut ctx = EngraveContext {
                tree: &mut model.tree,
                profile: &mut profiles[sys],
                converter: &self.converter,
                storage,
            };
            if sys < end.system {
                engraver.create_first_or_intermediate_shape(&mut ctx, span)?;
            } else if engraver.create_last_shape(&mut ctx, span)?.is_none() {
                // not splittable; engrave whole on the last system
                engraver.create_shapes(&mut ctx)?;
            }
        }
        Ok(())
    }
}

fn make_engraver(rel: &RelationObject) -> Box<dyn RelObjEngraver> {
    match rel.kind {
        RelationKind::Beam => Box::new(BeamEngraver::new(rel.id)),
        RelationKind::Chord => Box::new(ChordEngraver::new(rel.id)),
        RelationKind::Slur => Box::new(SlurEngraver::new(rel.id)),
        RelationKind::Tie => Box::new(TieEngraver::new(rel.id)),
        RelationKind::Tuplet => {
            let label = match &rel.data {
                RelationData::Tuplet { label } => label.clone(),
                _ => "3".to_string(),
            };
            Box::new(TupletEngraver::new(rel.id, label))
        }
        RelationKind::Wedge => {
            let (crescendo, niente) = match rel.data {
                RelationData::Wedge { crescendo, niente } => (crescendo, niente),
                _ => (true, false),
            };
            Box::new(WedgeEngraver::new(rel.id, crescendo, niente))
        }
        RelationKind::VoltaBracket => {
            let text = match &rel.data {
                RelationData::Volta { text } => text.clone(),
                _ => String::new(),
            };
            Box::new(VoltaEngraver::new(rel.id, text))
        }
        RelationKind::PedalLine => Box::new(PedalEngraver::new(rel.id)),
        RelationKind::LyricLine => {
            let (verse, syllables) = match &rel.data {
                RelationData::Lyric { verse, syllables } => (*verse, syllables.clone()),
                _ => (1, Vec::new()),
            };
            Box::new(LyricEngraver::new(rel.id, verse, syllables))
        }
    }
}
