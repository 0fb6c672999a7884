//! Vertical profile: per-staff record of the vertical extent already
//! occupied by shapes, as a function of horizontal position.
//!
//! Two piecewise-constant curves are kept per staff: a ceiling (the
//! topmost y reached by any shape at each x) and a floor (the
//! bottommost y). Engravers query them to place new annotations above
//! or below everything already engraved in an x window.

use crate::geometry::Rect;
use crate::shapes::{ShapeId, ShapeKind, ShapeTree};

/// One breakpoint of a profile curve: the level holds from `x` to the
/// next point's `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub x: f64,
    pub y: f64,
    pub shape: Option<ShapeId>,
}

#[derive(Debug, Clone)]
struct StaffProfile {
    y_top: f64,
    y_bottom: f64,
    /// Topmost occupied y per x; empty level is +inf (nothing above).
    ceiling: Vec<ProfilePoint>,
    /// Bottommost occupied y per x; empty level is -inf.
    floor: Vec<ProfilePoint>,
    /// Global extremes over the whole x range, when anything was added.
    y_min: Option<f64>,
    y_max: Option<f64>,
}

/// Collision-avoidance profile for every staff of one system.
#[derive(Debug, Clone)]
pub struct VerticalProfile {
    x_start: f64,
    x_end: f64,
    staves: Vec<StaffProfile>,
}

impl VerticalProfile {
    pub fn new(x_start: f64, x_end: f64, num_staves: usize) -> Self {
        let staves = (0..num_staves)
            .map(|_| StaffProfile {
                y_top: 0.0,
                y_bottom: 0.0,
                ceiling: vec![ProfilePoint { x: x_start, y: f64::INFINITY, shape: None }],
                floor: vec![ProfilePoint { x: x_start, y: f64::NEG_INFINITY, shape: None }],
                y_min: None,
                y_max: None,
            })
            .collect();
        Self { x_start, x_end, staves }
    }

    /// Record the staff's own vertical placement; clears any previous
    /// profile content for that staff.
    pub fn initialize(&mut self, staff: usize, y_top: f64, y_bottom: f64) {
        let sp = &mut self.staves[staff];
        sp.y_top = y_top;
        sp.y_bottom = y_bottom;
        sp.ceiling = vec![ProfilePoint { x: self.x_start, y: f64::INFINITY, shape: None }];
        sp.floor = vec![ProfilePoint { x: self.x_start, y: f64::NEG_INFINITY, shape: None }];
        sp.y_min = None;
        sp.y_max = None;
    }

    pub fn num_staves(&self) -> usize {
        self.staves.len()
    }

    pub fn staff_top(&self, staff: usize) -> f64 {
        self.staves[staff].y_top
    }

    pub fn staff_bottom(&self, staff: usize) -> f64 {
        self.staves[staff].y_bottom
    }

    // ── Updates ────────────────────────────────────────────────────

    /// Record a shape in the profile. Composite shapes are recorded
    /// component by component; barline shapes are excluded because they
    /// may join several staves and would hide each staff's true
    /// boundary without preventing any real collision.
    pub fn update_shape(&mut self, tree: &ShapeTree, id: ShapeId, staff: usize) {
        let shape = tree.get(id);
        match shape.kind {
            ShapeKind::Barline | ShapeKind::Invisible => return,
            _ => {}
        }
        if shape.is_composite() {
            let components: Vec<ShapeId> = shape.components().to_vec();
            for child in components {
                self.update_shape(tree, child, staff);
            }
        } else {
            self.update_rect(shape.bounds(), Some(id), staff);
        }
    }

    /// Record a raw rectangle. Rectangles outside the profile's
    /// horizontal span are ignored.
    pub fn update_rect(&mut self, rect: Rect, shape: Option<ShapeId>, staff: usize) {
        if rect.left() < self.x_start || rect.right() > self.x_end {
            return;
        }
        if rect.width <= 0.0 {
            return;
        }
        let sp = &mut self.staves[staff];
        sp.y_min = Some(sp.y_min.map_or(rect.top(), |y| y.min(rect.top())));
        sp.y_max = Some(sp.y_max.map_or(rect.bottom(), |y| y.max(rect.bottom())));

        insert_interval(&mut sp.ceiling, rect.left(), rect.right(), rect.top(), shape, false);
        insert_interval(&mut sp.floor, rect.left(), rect.right(), rect.bottom(), shape, true);
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Topmost (smallest) y reached by any recorded shape inside
    /// `[x_start, x_end]`, with the shape that reaches it. None when
    /// nothing is recorded in the range.
    pub fn get_min_for(&self, x_start: f64, x_end: f64, staff: usize) -> Option<(f64, Option<ShapeId>)> {
        extreme_in_range(&self.staves[staff].ceiling, x_start, x_end, false)
    }

    /// Bottommost (largest) y reached inside `[x_start, x_end]`.
    pub fn get_max_for(&self, x_start: f64, x_end: f64, staff: usize) -> Option<(f64, Option<ShapeId>)> {
        extreme_in_range(&self.staves[staff].floor, x_start, x_end, true)
    }

    /// Like [`VerticalProfile::get_min_for`] but falling back to the
    /// caller's baseline when the range holds no data. Callers never see
    /// an undefined sentinel coordinate.
    pub fn min_for_or(&self, x_start: f64, x_end: f64, staff: usize, baseline: f64) -> f64 {
        match self.get_min_for(x_start, x_end, staff) {
            Some((y, _)) => y.min(baseline),
            None => baseline,
        }
    }

    /// Floor counterpart of [`VerticalProfile::min_for_or`].
    pub fn max_for_or(&self, x_start: f64, x_end: f64, staff: usize, baseline: f64) -> f64 {
        match self.get_max_for(x_start, x_end, staff) {
            Some((y, _)) => y.max(baseline),
            None => baseline,
        }
    }

    /// Global topmost y recorded on the staff, if anything was.
    pub fn min_limit(&self, staff: usize) -> Option<f64> {
        self.staves[staff].y_min
    }

    /// Global bottommost y recorded on the staff, if anything was.
    pub fn max_limit(&self, staff: usize) -> Option<f64> {
        self.staves[staff].y_max
    }

    /// Debug dump of one staff's curves, ceiling then floor.
    pub fn dump(&self, staff: usize) -> String {
        let sp = &self.staves[staff];
        let fmt = |points: &[ProfilePoint]| {
            points
                .iter()
                .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
                .collect::<Vec<_>>()
                .join(",")
        };
        format!("min: {}\nmax: {}", fmt(&sp.ceiling), fmt(&sp.floor))
    }
}

/// Level of a curve at position x (the y of the last point at or
/// before x).
fn level_at(points: &[ProfilePoint], x: f64) -> ProfilePoint {
    let mut cur = points[0];
    for p in points {
        if p.x > x {
            break;
        }
        cur = *p;
    }
    cur
}

/// Merge the interval `[x0, x1]` at level `y` into a curve. For the
/// floor curve (`is_floor`) larger y wins; for the ceiling smaller y
/// wins. Overlapping ranges merge; no duplicate breakpoints remain.
fn insert_interval(
    points: &mut Vec<ProfilePoint>,
    x0: f64,
    x1: f64,
    y: f64,
    shape: Option<ShapeId>,
    is_floor: bool,
) {
    let wins = |new_y: f64, old_y: f64| {
        if is_floor {
            new_y > old_y
        } else {
            new_y < old_y
        }
    };

    let resume = level_at(points, x1); // level that continues after x1
    let mut out: Vec<ProfilePoint> = Vec::with_capacity(points.len() + 2);

    // points strictly before the interval
    for p in points.iter().filter(|p| p.x < x0) {
        out.push(*p);
    }

    let push = |out: &mut Vec<ProfilePoint>, p: ProfilePoint| {
        match out.last() {
            Some(last) if last.y == p.y && last.shape == p.shape => {}
            _ => out.push(p),
        }
    };

    // combined level at the left border
    let left_old = level_at(points, x0);
    let left = if wins(y, left_old.y) {
        ProfilePoint { x: x0, y, shape }
    } else {
        ProfilePoint { x: x0, y: left_old.y, shape: left_old.shape }
    };
    push(&mut out, left);

    // interior points keep whichever level wins
    for p in points.iter().filter(|p| p.x > x0 && p.x < x1) {
        let combined = if wins(y, p.y) {
            ProfilePoint { x: p.x, y, shape }
        } else {
            *p
        };
        push(&mut out, combined);
    }

    // right border resumes the previous level
    push(&mut out, ProfilePoint { x: x1, y: resume.y, shape: resume.shape });

    // points after the interval
    for p in points.iter().filter(|p| p.x > x1) {
        push(&mut out, *p);
    }

    *points = out;
}

/// Extreme level over `[x0, x1]`, ignoring the empty sentinel.
fn extreme_in_range(
    points: &[ProfilePoint],
    x0: f64,
    x1: f64,
    is_floor: bool,
) -> Option<(f64, Option<ShapeId>)> {
    let mut best: Option<(f64, Option<ShapeId>)> = None;
    for (i, p) in points.iter().enumerate() {
        let seg_start = p.x;
        let seg_end = points.get(i + 1).map_or(f64::INFINITY, |n| n.x);
        if seg_end <= x0 || seg_start >= x1 {
            continue;
        }
        if p.y.is_infinite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((y, _)) => {
                if is_floor {
                    p.y > y
                } else {
                    p.y < y
                }
            }
        };
        if better {
            best = Some((p.y, p.shape));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> VerticalProfile {
        let mut vp = VerticalProfile::new(0.0, 1000.0, 1);
        vp.initialize(0, 100.0, 500.0);
        vp
    }

    #[test]
    fn empty_range_returns_none_and_baseline() {
        let vp = profile();
        assert_eq!(vp.get_min_for(0.0, 1000.0, 0), None);
        assert_eq!(vp.min_for_or(0.0, 1000.0, 0, 100.0), 100.0);
        assert_eq!(vp.max_for_or(0.0, 1000.0, 0, 500.0), 500.0);
    }

    #[test]
    fn inserted_extremum_is_never_forgotten() {
        let mut vp = profile();
        vp.update_rect(Rect::new(100.0, 50.0, 200.0, 30.0), None, 0);

        // any sub-range of [100, 300] must reflect the ceiling at 50
        assert_eq!(vp.get_min_for(100.0, 300.0, 0).unwrap().0, 50.0);
        assert_eq!(vp.get_min_for(150.0, 160.0, 0).unwrap().0, 50.0);
        assert_eq!(vp.get_min_for(290.0, 600.0, 0).unwrap().0, 50.0);
        // and the floor at 80
        assert_eq!(vp.get_max_for(150.0, 160.0, 0).unwrap().0, 80.0);
    }

    #[test]
    fn overlapping_ranges_merge_keeping_extremes() {
        let mut vp = profile();
        vp.update_rect(Rect::new(100.0, 60.0, 200.0, 20.0), None, 0);
        vp.update_rect(Rect::new(200.0, 40.0, 200.0, 20.0), None, 0);

        assert_eq!(vp.get_min_for(100.0, 200.0, 0).unwrap().0, 60.0);
        assert_eq!(vp.get_min_for(200.0, 300.0, 0).unwrap().0, 40.0);
        assert_eq!(vp.get_min_for(100.0, 400.0, 0).unwrap().0, 40.0);
        // outside both ranges still empty
        assert_eq!(vp.get_min_for(500.0, 600.0, 0), None);
    }

    #[test]
    fn later_shallower_shape_does_not_loosen_bound() {
        let mut vp = profile();
        vp.update_rect(Rect::new(100.0, 50.0, 100.0, 10.0), None, 0);
        let before = vp.get_min_for(100.0, 200.0, 0).unwrap().0;
        vp.update_rect(Rect::new(100.0, 70.0, 100.0, 10.0), None, 0);
        let after = vp.get_min_for(100.0, 200.0, 0).unwrap().0;
        assert!(after <= before);
        assert_eq!(after, 50.0);
    }

    #[test]
    fn rect_outside_span_is_ignored() {
        let mut vp = profile();
        vp.update_rect(Rect::new(-50.0, 10.0, 100.0, 10.0), None, 0);
        assert_eq!(vp.get_min_for(0.0, 100.0, 0), None);
    }

    #[test]
    fn owning_shape_is_reported() {
        let mut vp = profile();
        vp.update_rect(Rect::new(100.0, 50.0, 100.0, 10.0), Some(ShapeId(7)), 0);
        let (y, shape) = vp.get_min_for(120.0, 130.0, 0).unwrap();
        assert_eq!(y, 50.0);
        assert_eq!(shape, Some(ShapeId(7)));
    }

    #[test]
    fn global_limits_track_all_updates() {
        let mut vp = profile();
        assert_eq!(vp.min_limit(0), None);
        vp.update_rect(Rect::new(100.0, 50.0, 100.0, 10.0), None, 0);
        vp.update_rect(Rect::new(400.0, 300.0, 100.0, 150.0), None, 0);
        assert_eq!(vp.min_limit(0), Some(50.0));
        assert_eq!(vp.max_limit(0), Some(450.0));
    }
}
