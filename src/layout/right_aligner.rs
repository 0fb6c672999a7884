//! Right aligner: stacks boxes against a moving "staircase" border so
//! that none overlap.
//!
//! Boxes are pushed in from the right until they touch existing
//! content, as if the right edge were the floor and the boxes were
//! dropped from above. Used for columns of annotations that must stay
//! right-aligned as a group (stacked accidentals in a chord, for
//! instance).

use crate::geometry::{Point, Rect};

/// Border breakpoint: from `y` (down to the next point's `y`) the
/// leftmost occupied x is `x`. `x == f64::INFINITY` means no content in
/// that band yet.
type Border = Vec<Point>;

#[derive(Debug, Clone)]
pub struct RightAligner {
    boxes: Vec<Rect>,
    border: Border,
    width: f64,
}

impl Default for RightAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl RightAligner {
    pub fn new() -> Self {
        Self {
            boxes: Vec::new(),
            border: vec![Point::new(f64::INFINITY, f64::NEG_INFINITY)],
            width: 0.0,
        }
    }

    /// Add a box: its right edge is placed where it touches the border
    /// over `[rect.y, rect.y + height]`. If the resulting left edge
    /// would be negative, every previously placed box (and the border)
    /// shifts right by the deficit. Returns the index of the box.
    pub fn add_box(&mut self, mut rect: Rect) -> usize {
        let touch_x = self.get_touch_x(rect.top(), rect.bottom());
        rect.x = touch_x - rect.width;
        if rect.x < 0.0 {
            let shift = -rect.x;
            self.shift_boxes_right(shift);
            self.shift_border(shift);
            rect.x = 0.0;
        }

        self.boxes.push(rect);
        self.add_border_segment(rect.top(), rect.bottom(), rect.x);
        self.width = self.width.max(rect.right());
        self.boxes.len() - 1
    }

    pub fn get_box(&self, i: usize) -> Option<Rect> {
        self.boxes.get(i).copied()
    }

    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    pub fn boxes(&self) -> &[Rect] {
        &self.boxes
    }

    /// Total width of the stacked group. Always at least the right
    /// edge of every stored box.
    pub fn get_total_width(&self) -> f64 {
        self.width
    }

    /// Bottom edge of the lowest stored box.
    pub fn get_total_height(&self) -> f64 {
        self.boxes.iter().map(Rect::bottom).fold(0.0, f64::max)
    }

    fn shift_boxes_right(&mut self, shift: f64) {
        for b in &mut self.boxes {
            b.x += shift;
        }
        self.width += shift;
    }

    fn shift_border(&mut self, shift: f64) {
        for p in &mut self.border {
            if p.x.is_finite() {
                p.x += shift;
            }
        }
    }

    /// Leftmost occupied x over the band `[y0, y1]`, or the current
    /// total width when the band is still empty.
    fn get_touch_x(&self, y0: f64, y1: f64) -> f64 {
        let mut x = self.width;
        for (i, p) in self.border.iter().enumerate() {
            let seg_end = self.border.get(i + 1).map_or(f64::INFINITY, |n| n.y);
            if seg_end < y0 || p.y > y1 {
                continue;
            }
            if p.x.is_finite() {
                x = x.min(p.x);
            }
        }
        x
    }

    /// Record that the band `[y0, y1]` is now occupied from `x`.
    fn add_border_segment(&mut self, y0: f64, y1: f64, x: f64) {
        // level that continues below y1
        let resume = *self
            .border
            .iter()
            .take_while(|p| p.y <= y1)
            .last()
            .unwrap_or(&self.border[0]);

        let mut out: Border = Vec::with_capacity(self.border.len() + 2);
        for p in self.border.iter().filter(|p| p.y < y0) {
            out.push(*p);
        }
        out.push(Point::new(x, y0));
        out.push(Point::new(resume.x, y1));
        for p in self.border.iter().filter(|p| p.y > y1) {
            out.push(*p);
        }
        // drop consecutive points at the same level
        out.dedup_by(|b, a| a.x == b.x);
        self.border = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_no_overlap(aligner: &RightAligner) {
        let boxes = aligner.boxes();
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                assert!(
                    !boxes[i].overlaps(&boxes[j]),
                    "box {i} {:?} overlaps box {j} {:?}",
                    boxes[i],
                    boxes[j]
                );
            }
        }
    }

    fn assert_width_covers_all(aligner: &RightAligner) {
        for b in aligner.boxes() {
            assert!(aligner.get_total_width() >= b.right() - 1e-9);
        }
    }

    #[test]
    fn first_box_lands_at_origin() {
        let mut a = RightAligner::new();
        let i = a.add_box(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(a.get_box(i).unwrap(), Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(a.get_total_width(), 100.0);
    }

    #[test]
    fn overlapping_band_shifts_previous_boxes() {
        let mut a = RightAligner::new();
        let first = a.add_box(Rect::new(0.0, 0.0, 100.0, 50.0));
        // same vertical band: must stack to the left, pushing the
        // first box right
        let second = a.add_box(Rect::new(0.0, 20.0, 60.0, 50.0));

        let b0 = a.get_box(first).unwrap();
        let b1 = a.get_box(second).unwrap();
        assert_eq!(b1.x, 0.0);
        assert_eq!(b0.x, 60.0);
        assert_eq!(a.get_total_width(), 160.0);
        assert_no_overlap(&a);
        assert_width_covers_all(&a);
    }

    #[test]
    fn disjoint_bands_right_align_without_shift() {
        let mut a = RightAligner::new();
        a.add_box(Rect::new(0.0, 0.0, 100.0, 40.0));
        let i = a.add_box(Rect::new(0.0, 100.0, 60.0, 40.0));
        // empty band below: right edge aligns with the total width
        assert_eq!(a.get_box(i).unwrap().right(), 100.0);
        assert_eq!(a.get_total_width(), 100.0);
        assert_no_overlap(&a);
    }

    #[test]
    fn staircase_of_mixed_boxes_never_overlaps() {
        let mut a = RightAligner::new();
        let rects = [
            Rect::new(0.0, 0.0, 30.0, 25.0),
            Rect::new(0.0, 10.0, 45.0, 25.0),
            Rect::new(0.0, 0.0, 20.0, 12.0),
            Rect::new(0.0, 30.0, 25.0, 25.0),
            Rect::new(0.0, 5.0, 35.0, 45.0),
        ];
        for r in rects {
            a.add_box(r);
        }
        assert_no_overlap(&a);
        assert_width_covers_all(&a);
    }

    #[test]
    fn total_height_is_lowest_bottom() {
        let mut a = RightAligner::new();
        a.add_box(Rect::new(0.0, 0.0, 30.0, 25.0));
        a.add_box(Rect::new(0.0, 40.0, 30.0, 35.0));
        assert_eq!(a.get_total_height(), 75.0);
    }
}
