//! Graphic model: the tree of container boxes produced by a layout pass.
//!
//! Boxes give the finished shapes a place to live: a system box per
//! engraved line, a slice box per column inside it, and per-instrument
//! shape lists inside each slice. Shapes themselves stay in the
//! [`ShapeTree`] arena; boxes hold ids. A JSON snapshot of the whole
//! model is available for the host application (cursor placement,
//! hit-testing, debugging).

use serde::Serialize;

use crate::geometry::Rect;
use crate::model::ObjId;
use crate::shapes::{ShapeId, ShapeKind, ShapeLayer, ShapeTree};

/// Where a finished shape must be inserted. A relation's shape may
/// belong to a box other than the one currently open (e.g. the system
/// holding the relation's first note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeBoxInfo {
    pub system: usize,
    /// Column the shape belongs to, or None for system-level shapes
    /// (slur arches, wedges and other spans).
    pub column: Option<usize>,
    pub instr: usize,
}

/// One engraved line of music.
#[derive(Debug)]
pub struct SystemBox {
    pub index: usize,
    pub rect: Rect,
    /// Width this system was justified to.
    pub target_width: f64,
    /// First column index of this system (inclusive) and past-the-end.
    pub first_column: usize,
    pub last_column: usize,
    pub slices: Vec<SliceBox>,
    /// System-level shapes per instrument, with their layer.
    system_shapes: Vec<Vec<(ShapeId, ShapeLayer)>>,
}

impl SystemBox {
    pub fn new(index: usize, rect: Rect, target_width: f64, first_column: usize, last_column: usize, num_instrs: usize) -> Self {
        Self {
            index,
            rect,
            target_width,
            first_column,
            last_column,
            slices: Vec::new(),
            system_shapes: vec![Vec::new(); num_instrs],
        }
    }

    pub fn num_columns(&self) -> usize {
        self.last_column - self.first_column
    }

    pub fn system_shapes(&self, instr: usize) -> &[(ShapeId, ShapeLayer)] {
        &self.system_shapes[instr]
    }
}

/// One column inside a system.
#[derive(Debug)]
pub struct SliceBox {
    pub column_index: usize,
    pub rect: Rect,
    /// Shape lists per instrument, with their layer.
    instr_shapes: Vec<Vec<(ShapeId, ShapeLayer)>>,
}

impl SliceBox {
    pub fn new(column_index: usize, rect: Rect, num_instrs: usize) -> Self {
        Self {
            column_index,
            rect,
            instr_shapes: vec![Vec::new(); num_instrs],
        }
    }

    pub fn instr_shapes(&self, instr: usize) -> &[(ShapeId, ShapeLayer)] {
        &self.instr_shapes[instr]
    }
}

/// The complete produced model: shape arena plus box tree.
#[derive(Debug, Default)]
pub struct GraphicModel {
    pub tree: ShapeTree,
    pub systems: Vec<SystemBox>,
}

impl GraphicModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finished shape into the box named by `info`.
    /// Precondition: the target system box exists (the ShapesStorage
    /// buffers shapes until it does).
    pub fn add_shape_to_box(&mut self, shape: ShapeId, layer: ShapeLayer, info: ShapeBoxInfo) {
        let system = &mut self.systems[info.system];
        match info.column {
            None => system.system_shapes[info.instr].push((shape, layer)),
            Some(col) => {
                let slice = system
                    .slices
                    .iter_mut()
                    .find(|s| s.column_index == col)
                    .unwrap_or_else(|| panic!("column {col} not in system {}", info.system));
                slice.instr_shapes[info.instr].push((shape, layer));
            }
        }
    }

    /// All shapes of a system in draw order: sorted by layer, stable
    /// within a layer (insertion order).
    pub fn shapes_in_draw_order(&self, system: usize) -> Vec<ShapeId> {
        let sys = &self.systems[system];
        let mut entries: Vec<(ShapeLayer, usize, ShapeId)> = Vec::new();
        let mut seq = 0usize;
        for per_instr in &sys.system_shapes {
            for &(id, layer) in per_instr {
                entries.push((layer, seq, id));
                seq += 1;
            }
        }
        for slice in &sys.slices {
            for per_instr in &slice.instr_shapes {
                for &(id, layer) in per_instr {
                    entries.push((layer, seq, id));
                    seq += 1;
                }
            }
        }
        entries.sort();
        entries.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Serialize the finished model to pretty JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| format!("JSON serialization error: {e}"))
    }

    fn snapshot(&self) -> ModelSnapshot {
        let systems = self
            .systems
            .iter()
            .map(|s| SystemSnapshot {
                index: s.index,
                rect: s.rect,
                first_column: s.first_column,
                last_column: s.last_column,
                shapes: self.shapes_in_draw_order(s.index)
                    .into_iter()
                    .map(|id| {
                        let shape = self.tree.get(id);
                        ShapeSnapshot {
                            id,
                            kind: shape.kind,
                            layer: shape.layer,
                            owner: shape.owner,
                            bounds: shape.bounds(),
                            components: shape.components().to_vec(),
                        }
                    })
                    .collect(),
            })
            .collect();
        ModelSnapshot { systems }
    }
}

#[derive(Debug, Serialize)]
struct ModelSnapshot {
    systems: Vec<SystemSnapshot>,
}

#[derive(Debug, Serialize)]
struct SystemSnapshot {
    index: usize,
    rect: Rect,
    first_column: usize,
    last_column: usize,
    shapes: Vec<ShapeSnapshot>,
}

#[derive(Debug, Serialize)]
struct ShapeSnapshot {
    id: ShapeId,
    kind: ShapeKind,
    layer: ShapeLayer,
    owner: Option<ObjId>,
    bounds: Rect,
    components: Vec<ShapeId>,
}
