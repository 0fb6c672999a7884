//! Shape tree: the graphic objects produced by the engravers.
//!
//! Shapes live in an id-indexed arena. Ownership is strictly tree-shaped:
//! a composite shape owns its component shapes, and recomputes its bounds
//! as the union of the components' bounds whenever one of them moves.
//! Cross-shape geometry dependencies (a beam following its note stems,
//! for instance) are not ownership: they are observer links resolved
//! through the arena, so removing either side can never leave a dangling
//! reference.

use std::collections::HashSet;

use serde::Serialize;

use crate::geometry::{Color, Point, Rect, Size};
use crate::model::ObjId;

/// Index of a shape in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId(pub usize);

/// Z-order layer. Boxes release their shapes sorted by layer, so aux
/// notations always draw above staff lines and below nothing important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ShapeLayer {
    Background,
    Staff,
    Barlines,
    AuxObjs,
    Notes,
    Top,
}

/// What a shape depicts. Leaf glyph kinds are Simple; Note and similar
/// aggregates are Composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeKind {
    Staff,
    Notehead,
    Stem,
    Flag,
    AccidentalGlyph,
    Dot,
    LedgerLine,
    Note,
    Rest,
    Clef,
    Barline,
    Beam,
    SlurArch,
    TieArch,
    TupletBracket,
    /// Hairpin box; the flags say which way it opens so a consumer of
    /// the snapshot needs no lookup through `owner`.
    Wedge { crescendo: bool, niente: bool },
    VoltaBracket,
    PedalLine,
    Text,
    LyricText,
    LyricHyphen,
    DynamicsMark,
    Invisible,
}

#[derive(Debug, Clone)]
enum Body {
    Simple,
    Composite { children: Vec<ShapeId> },
}

/// One node of the shape tree.
#[derive(Debug, Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Musical object this shape was engraved for, when any.
    pub owner: Option<ObjId>,
    pub layer: ShapeLayer,
    pub color: Color,
    origin: Point,
    size: Size,
    body: Body,
    parent: Option<ShapeId>,
}

impl Shape {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.origin.x, self.origin.y, self.size.width, self.size.height)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.body, Body::Composite { .. })
    }

    pub fn components(&self) -> &[ShapeId] {
        match &self.body {
            Body::Composite { children } => children,
            Body::Simple => &[],
        }
    }

    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }
}

/// Arena of shapes with exclusive composite ownership and observer links.
#[derive(Debug, Default)]
pub struct ShapeTree {
    nodes: Vec<Option<Shape>>,
    /// observers[i]: shapes that must follow shape i when it moves.
    observers: Vec<Vec<ShapeId>>,
    /// observing[i]: shapes that shape i registered with (reverse links,
    /// kept so removal can sever both ends).
    observing: Vec<Vec<ShapeId>>,
}

impl ShapeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Construction ───────────────────────────────────────────────

    pub fn add_simple(
        &mut self,
        kind: ShapeKind,
        owner: Option<ObjId>,
        bounds: Rect,
        layer: ShapeLayer,
    ) -> ShapeId {
        self.push(Shape {
            kind,
            owner,
            layer,
            color: Color::black(),
            origin: bounds.origin(),
            size: Size::new(bounds.width, bounds.height),
            body: Body::Simple,
            parent: None,
        })
    }

    /// A composite starts empty; its bounds are set by the first
    /// component and grow by union with each one added.
    pub fn add_composite(
        &mut self,
        kind: ShapeKind,
        owner: Option<ObjId>,
        layer: ShapeLayer,
    ) -> ShapeId {
        self.push(Shape {
            kind,
            owner,
            layer,
            color: Color::black(),
            origin: Point::default(),
            size: Size::default(),
            body: Body::Composite { children: Vec::new() },
            parent: None,
        })
    }

    fn push(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId(self.nodes.len());
        self.nodes.push(Some(shape));
        self.observers.push(Vec::new());
        self.observing.push(Vec::new());
        id
    }

    /// Attach `child` to composite `parent`. The child must not already
    /// be owned; ownership is exclusive.
    pub fn add_component(&mut self, parent: ShapeId, child: ShapeId) {
        debug_assert!(self.get(child).parent.is_none(), "shape already owned");
        {
            let node = self.node_mut(parent);
            match &mut node.body {
                Body::Composite { children } => children.push(child),
                Body::Simple => panic!("add_component on a simple shape"),
            }
        }
        self.node_mut(child).parent = Some(parent);
        self.recompute_bounds(parent);
        self.recompute_ancestors(parent);
    }

    // ── Access ─────────────────────────────────────────────────────

    pub fn get(&self, id: ShapeId) -> &Shape {
        self.nodes[id.0].as_ref().expect("shape was removed")
    }

    pub fn try_get(&self, id: ShapeId) -> Option<&Shape> {
        self.nodes.get(id.0).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: ShapeId) -> &mut Shape {
        self.nodes[id.0].as_mut().expect("shape was removed")
    }

    pub fn bounds(&self, id: ShapeId) -> Rect {
        self.get(id).bounds()
    }

    /// All live shape ids, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| ShapeId(i)))
    }

    /// First component of `id` with the given kind, if any.
    pub fn component_of_kind(&self, id: ShapeId, kind: ShapeKind) -> Option<ShapeId> {
        self.get(id)
            .components()
            .iter()
            .copied()
            .find(|&c| self.get(c).kind == kind)
    }

    pub fn set_color(&mut self, id: ShapeId, color: Color) {
        self.node_mut(id).color = color;
    }

    // ── Geometry mutation ──────────────────────────────────────────

    /// Shift a shape (and, for composites, all its components) by
    /// `delta`, recompute every ancestor's bounds, then notify observer
    /// shapes, which apply the same delta and notify their own
    /// observers in turn.
    pub fn shift_shape(&mut self, id: ShapeId, delta: Size) {
        let mut visited = HashSet::new();
        self.shift_and_notify(id, delta, &mut visited);
    }

    /// Move a shape so its origin lands at (x, y), with the same
    /// notification semantics as [`ShapeTree::shift_shape`].
    pub fn set_origin_and_notify(&mut self, id: ShapeId, x: f64, y: f64) {
        let origin = self.get(id).origin;
        self.shift_shape(id, Size::new(x - origin.x, y - origin.y));
    }

    fn shift_and_notify(&mut self, id: ShapeId, delta: Size, visited: &mut HashSet<ShapeId>) {
        if !visited.insert(id) {
            return;
        }
        self.apply_shift(id, delta);
        self.recompute_ancestors(id);
        let observers = self.observers[id.0].clone();
        for obs in observers {
            if self.nodes[obs.0].is_some() {
                self.shift_and_notify(obs, delta, visited);
            }
        }
    }

    /// Shift origins of a subtree without notification.
    fn apply_shift(&mut self, id: ShapeId, delta: Size) {
        let children: Vec<ShapeId> = self.get(id).components().to_vec();
        {
            let node = self.node_mut(id);
            node.origin.x += delta.width;
            node.origin.y += delta.height;
        }
        for child in children {
            self.apply_shift(child, delta);
        }
    }

    /// Resize a shape in place, keeping its origin. No observer
    /// notification; observers follow position changes only.
    pub fn resize_shape(&mut self, id: ShapeId, size: Size) {
        self.node_mut(id).size = size;
        self.recompute_ancestors(id);
    }

    /// Move and resize in one step, without notifying observers. Used
    /// while a composite is being assembled.
    pub fn set_bounds(&mut self, id: ShapeId, bounds: Rect) {
        let node = self.node_mut(id);
        node.origin = bounds.origin();
        node.size = Size::new(bounds.width, bounds.height);
        self.recompute_ancestors(id);
    }

    fn recompute_ancestors(&mut self, id: ShapeId) {
        let mut cur = self.get(id).parent;
        while let Some(parent) = cur {
            self.recompute_bounds(parent);
            cur = self.get(parent).parent;
        }
    }

    /// Bounds of a composite = union of its components' bounds.
    fn recompute_bounds(&mut self, id: ShapeId) {
        let children: Vec<ShapeId> = self.get(id).components().to_vec();
        if children.is_empty() {
            return;
        }
        let mut bbox = Rect::default();
        for child in &children {
            bbox = bbox.union(&self.bounds(*child));
        }
        let node = self.node_mut(id);
        node.origin = bbox.origin();
        node.size = Size::new(bbox.width, bbox.height);
    }

    // ── Observer links ─────────────────────────────────────────────

    /// Register `observer` to follow `target`: when `target` is shifted,
    /// `observer` receives the same delta.
    pub fn link_observer(&mut self, target: ShapeId, observer: ShapeId) {
        if !self.observers[target.0].contains(&observer) {
            self.observers[target.0].push(observer);
            self.observing[observer.0].push(target);
        }
    }

    /// Remove the link in both directions.
    pub fn unlink_observer(&mut self, target: ShapeId, observer: ShapeId) {
        self.observers[target.0].retain(|&s| s != observer);
        self.observing[observer.0].retain(|&s| s != target);
    }

    pub fn observers_of(&self, id: ShapeId) -> &[ShapeId] {
        &self.observers[id.0]
    }

    // ── Removal ────────────────────────────────────────────────────

    /// Remove a shape and its owned subtree. Every observer link the
    /// removed shapes participate in is severed on both ends.
    pub fn remove_shape(&mut self, id: ShapeId) {
        if self.nodes[id.0].is_none() {
            return;
        }
        // detach from owner
        if let Some(parent) = self.get(id).parent {
            if let Body::Composite { children } = &mut self.node_mut(parent).body {
                children.retain(|&c| c != id);
            }
            self.recompute_bounds(parent);
            self.recompute_ancestors(parent);
        }
        self.remove_subtree(id);
    }

    fn remove_subtree(&mut self, id: ShapeId) {
        let children: Vec<ShapeId> = self.get(id).components().to_vec();
        for child in children {
            self.remove_subtree(child);
        }
        for target in std::mem::take(&mut self.observing[id.0]) {
            self.observers[target.0].retain(|&s| s != id);
        }
        for observer in std::mem::take(&mut self.observers[id.0]) {
            self.observing[observer.0].retain(|&s| s != id);
        }
        self.nodes[id.0] = None;
    }
}
