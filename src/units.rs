//! Unit conversion between symbol-relative "tenths" and logical units.
//!
//! A tenth is 1/10 of the staff interline space of a given staff, so the
//! conversion factor depends on the instrument and staff the symbol
//! belongs to. Logical units are 1/100 mm, the native coordinate of the
//! shape tree.

/// Default staff interline in logical units (1.8 mm).
pub const DEFAULT_INTERLINE: f64 = 180.0;

/// Converts symbol-relative tenths to absolute logical units, per
/// instrument and staff.
///
/// Every sizing value entering the shape tree must pass through this
/// converter; the shape tree itself stores only logical units.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    /// Interline spacing, in logical units, indexed `[instrument][staff]`.
    interlines: Vec<Vec<f64>>,
}

impl UnitConverter {
    /// Build a converter with the default interline for every staff.
    /// `staves_per_instr[i]` is the number of staves of instrument `i`.
    pub fn new(staves_per_instr: &[usize]) -> Self {
        let interlines = staves_per_instr
            .iter()
            .map(|&n| vec![DEFAULT_INTERLINE; n.max(1)])
            .collect();
        Self { interlines }
    }

    /// Override the interline spacing of one staff (e.g. a cue-sized
    /// ossia staff).
    pub fn set_interline(&mut self, instr: usize, staff: usize, interline: f64) {
        if let Some(staves) = self.interlines.get_mut(instr) {
            if let Some(v) = staves.get_mut(staff) {
                *v = interline;
            }
        }
    }

    pub fn interline(&self, instr: usize, staff: usize) -> f64 {
        self.interlines
            .get(instr)
            .and_then(|staves| staves.get(staff))
            .copied()
            .unwrap_or(DEFAULT_INTERLINE)
    }

    /// Convert `value` tenths to logical units for the given staff.
    pub fn tenths_to_logical(&self, value: f64, instr: usize, staff: usize) -> f64 {
        value * self.interline(instr, staff) / 10.0
    }

    /// Inverse conversion, used by hit-testing collaborators.
    pub fn logical_to_tenths(&self, value: f64, instr: usize, staff: usize) -> f64 {
        value * 10.0 / self.interline(instr, staff)
    }

    /// Height of a five-line staff (four interlines) in logical units.
    pub fn staff_height(&self, instr: usize, staff: usize) -> f64 {
        self.interline(instr, staff) * 4.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scale_is_linear() {
        let uc = UnitConverter::new(&[1]);
        assert_eq!(uc.tenths_to_logical(10.0, 0, 0), DEFAULT_INTERLINE);
        assert_eq!(uc.tenths_to_logical(5.0, 0, 0), DEFAULT_INTERLINE / 2.0);
    }

    #[test]
    fn per_staff_interline_applies() {
        let mut uc = UnitConverter::new(&[2]);
        uc.set_interline(0, 1, 90.0);
        assert_eq!(uc.tenths_to_logical(10.0, 0, 0), 180.0);
        assert_eq!(uc.tenths_to_logical(10.0, 0, 1), 90.0);
    }

    #[test]
    fn round_trip() {
        let uc = UnitConverter::new(&[1]);
        let v = uc.tenths_to_logical(37.5, 0, 0);
        assert!((uc.logical_to_tenths(v, 0, 0) - 37.5).abs() < 1e-9);
    }
}
