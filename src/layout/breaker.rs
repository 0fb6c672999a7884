//! Line breaking: distributes columns into systems.
//!
//! Two strategies: a greedy packer that fills each system until space
//! runs out, and an optimal breaker closely related to Knuth's
//! paragraph-breaking algorithm, minimising the total stretching over
//! all systems via dynamic programming.
//!
//! Both return the break sequence as the index of the first column of
//! each system, so `[0, 10, 22]` means systems `0..10`, `10..22` and
//! `22..end`. Both honour forced breaks the same way: the flagged
//! column is the last of its system and the next system starts
//! immediately after it.

use log::warn;

/// Per-column input to the breakers.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMeasure {
    /// Width with trailing variable space removed, in logical units.
    pub trimmed_width: f64,
    /// Forces the system to end with this column.
    pub system_break: bool,
    /// Multiplier discouraging a break after this column (1.0 =
    /// neutral, >1.0 = avoid, e.g. a column not ended by a barline).
    pub penalty_factor: f64,
}

impl ColumnMeasure {
    pub fn new(trimmed_width: f64) -> Self {
        Self {
            trimmed_width,
            system_break: false,
            penalty_factor: 1.0,
        }
    }
}

/// Shared input for a breaking pass.
#[derive(Debug, Clone, Copy)]
pub struct BreakContext<'a> {
    pub columns: &'a [ColumnMeasure],
    /// Usable width of the first system (shortened by any indent).
    pub first_system_width: f64,
    /// Usable width of every other system.
    pub other_systems_width: f64,
}

impl BreakContext<'_> {
    fn target_width(&self, system: usize) -> f64 {
        if system == 0 {
            self.first_system_width
        } else {
            self.other_systems_width
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Greedy breaker
// ═══════════════════════════════════════════════════════════════════

/// Pack columns into systems first-fit: keep adding columns while they
/// fit, start a new system when one does not or right after a column
/// with a forced break.
pub fn break_lines_greedy(ctx: &BreakContext) -> Vec<usize> {
    if ctx.columns.is_empty() {
        return Vec::new();
    }

    let mut breaks = vec![0];
    let mut system = 0;
    let mut space = ctx.target_width(0) - ctx.columns[0].trimmed_width;

    for (i, col) in ctx.columns.iter().enumerate().skip(1) {
        let forced = ctx.columns[i - 1].system_break;
        if !forced && space >= col.trimmed_width {
            space -= col.trimmed_width;
        } else {
            system += 1;
            breaks.push(i);
            space = ctx.target_width(system) - col.trimmed_width;
        }
    }
    breaks
}

// ═══════════════════════════════════════════════════════════════════
// Optimal breaker
// ═══════════════════════════════════════════════════════════════════

/// Fit of one candidate line of columns.
#[derive(Debug, Clone, Copy)]
enum LineFit {
    /// Fraction of the system width left unused, `0.0..=1.0`.
    Fits(f64),
    /// A single column wider than any system; it still gets a system
    /// of its own.
    Oversized,
    /// The columns cannot share a line: they overflow it, or a forced
    /// break lies strictly inside.
    Impossible,
}

/// DP table entry: best known way to break the first `i` columns.
#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Accumulated penalty of the best break sequence ending here.
    penalty: f64,
    /// Start column of the last system in that sequence; None while
    /// the entry is unreached.
    predecessor: Option<usize>,
    /// Number of systems in that sequence.
    system: usize,
    /// Product of per-line stretch factors, used to break near-ties.
    product: f64,
    /// Oversized lines in that sequence. Compared before the scalar
    /// penalty, so an overflowing column never distorts how the
    /// columns around it are distributed.
    oversized: usize,
}

pub struct LinesBreakerOptimal {
    justify_last_line: bool,
    entries: Vec<Entry>,
}

impl LinesBreakerOptimal {
    pub fn new(justify_last_line: bool) -> Self {
        Self {
            justify_last_line,
            entries: Vec::new(),
        }
    }

    /// Compute the break sequence minimising total stretch.
    pub fn decide_line_breaks(&mut self, ctx: &BreakContext) -> Vec<usize> {
        if ctx.columns.is_empty() {
            return Vec::new();
        }
        self.initialize_entries_table(ctx.columns.len());
        self.compute_optimal_break_sequence(ctx);
        self.retrieve_breaks_sequence()
    }

    fn initialize_entries_table(&mut self, num_cols: usize) {
        self.entries.clear();
        self.entries.resize(
            num_cols + 1,
            Entry {
                penalty: f64::INFINITY,
                predecessor: None,
                system: 0,
                product: 1.0,
                oversized: 0,
            },
        );
        self.entries[0].penalty = 0.0;
        self.entries[0].predecessor = Some(0);
    }

    fn compute_optimal_break_sequence(&mut self, ctx: &BreakContext) {
        let num_cols = ctx.columns.len();
        for i in 0..num_cols {
            if self.entries[i].predecessor.is_none() {
                continue;
            }
            let system = self.entries[i].system;
            let total_penalty = self.entries[i].penalty;
            for j in (i + 1)..=num_cols {
                // try the system formed by columns i..j
                let (cur_penalty, oversized) = match self.assess_line(ctx, system, i, j - 1) {
                    LineFit::Fits(p) => (p, self.entries[i].oversized),
                    LineFit::Oversized => (0.0, self.entries[i].oversized + 1),
                    // no space left for column j, so none for j+1 either
                    LineFit::Impossible => break,
                };
                if self.is_better_option(total_penalty, cur_penalty, oversized, i, j) {
                    self.entries[j] = Entry {
                        penalty: total_penalty + cur_penalty,
                        predecessor: Some(i),
                        system: system + 1,
                        product: self.entries[i].product * (1.0 + cur_penalty),
                        oversized,
                    };
                }
            }
        }
    }

    fn is_better_option(
        &self,
        total_penalty: f64,
        cur_penalty: f64,
        oversized: usize,
        i: usize,
        j: usize,
    ) -> bool {
        let prev = &self.entries[j];
        if prev.predecessor.is_none() {
            return true;
        }
        // fewer oversized lines wins outright
        if oversized != prev.oversized {
            return oversized < prev.oversized;
        }
        let new_total = total_penalty + cur_penalty;
        let prev_total = prev.penalty;
        if (new_total - prev_total).abs() < 0.1 * prev_total {
            // near-tie on total stretch: prefer the sequence with the
            // more even distribution of stretching
            let new_prod = self.entries[i].product * (1.0 + cur_penalty);
            new_prod > prev.product
        } else {
            new_total < prev_total
        }
    }

    fn retrieve_breaks_sequence(&self) -> Vec<usize> {
        let last = match self.entries.last() {
            Some(e) => e,
            None => return Vec::new(),
        };
        // a single column forms at worst an oversized line, so the
        // final entry is always reachable
        let mut i = match last.predecessor {
            Some(p) => p,
            None => return vec![0],
        };
        let mut breaks = Vec::with_capacity(last.system);
        breaks.push(i);
        while i != 0 {
            i = self.entries[i].predecessor.unwrap_or(0);
            breaks.push(i);
        }
        breaks.reverse();
        breaks
    }

    /// Fit of the line of columns `i..=j` in system `system`.
    fn assess_line(&self, ctx: &BreakContext, system: usize, i: usize, j: usize) -> LineFit {
        // a forced break pins its column as the last of the line; the
        // caller stops extending a line once it turns impossible, so
        // checking the second-to-last column is enough
        if j > i && ctx.columns[j - 1].system_break {
            return LineFit::Impossible;
        }

        let occupied: f64 = ctx.columns[i..=j].iter().map(|c| c.trimmed_width).sum();
        let line = ctx.target_width(system);

        if occupied > line {
            if i == j {
                warn!(
                    "column {} is wider ({:.1}) than the system ({:.1}); it gets a system of its own",
                    i, occupied, line
                );
                return LineFit::Oversized;
            }
            return LineFit::Impossible;
        }

        // discourage breaking after columns not ended in a barline
        let occupied = occupied * ctx.columns[j].penalty_factor;
        let space = line - occupied;

        // no penalty for the last line when it is not justified
        if !self.justify_last_line && j == ctx.columns.len() - 1 {
            return LineFit::Fits(0.0);
        }

        LineFit::Fits(space / line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(n: usize, width: f64) -> Vec<ColumnMeasure> {
        vec![ColumnMeasure::new(width); n]
    }

    fn ctx<'a>(cols: &'a [ColumnMeasure], first: f64, others: f64) -> BreakContext<'a> {
        BreakContext {
            columns: cols,
            first_system_width: first,
            other_systems_width: others,
        }
    }

    #[test]
    fn greedy_packs_uniform_columns() {
        let cols = uniform(30, 1450.0);
        let breaks = break_lines_greedy(&ctx(&cols, 15000.0, 18000.0));
        assert_eq!(breaks, vec![0, 10, 22]);
    }

    #[test]
    fn optimal_balances_uniform_columns() {
        let cols = uniform(30, 1450.0);
        let breaks =
            LinesBreakerOptimal::new(false).decide_line_breaks(&ctx(&cols, 15000.0, 18000.0));
        assert_eq!(breaks, vec![0, 10, 22]);
    }

    #[test]
    fn greedy_breaks_right_after_forced_column() {
        let mut cols = uniform(20, 1450.0);
        cols[15].system_break = true;
        let breaks = break_lines_greedy(&ctx(&cols, 15000.0, 18000.0));
        assert_eq!(breaks, vec![0, 10, 16]);
    }

    #[test]
    fn optimal_breaks_right_after_forced_column() {
        let mut cols = uniform(20, 1450.0);
        cols[15].system_break = true;
        let breaks =
            LinesBreakerOptimal::new(false).decide_line_breaks(&ctx(&cols, 15000.0, 18000.0));
        assert_eq!(breaks, vec![0, 10, 16]);
    }

    #[test]
    fn breakers_agree_on_exact_fit() {
        // columns exactly divide both targets with zero slack
        let cols = uniform(12, 1500.0);
        let c = ctx(&cols, 6000.0, 6000.0);
        let greedy = break_lines_greedy(&c);
        let optimal = LinesBreakerOptimal::new(false).decide_line_breaks(&c);
        assert_eq!(greedy, vec![0, 4, 8]);
        assert_eq!(optimal, greedy);
    }

    #[test]
    fn oversized_column_gets_own_system() {
        let mut cols = uniform(5, 1000.0);
        cols[2].trimmed_width = 9000.0; // wider than any system
        let breaks =
            LinesBreakerOptimal::new(false).decide_line_breaks(&ctx(&cols, 4000.0, 4000.0));
        // systems: {0,1}, {2}, {3,4}
        assert_eq!(breaks, vec![0, 2, 3]);
    }

    #[test]
    fn two_oversized_columns_each_get_own_system() {
        let mut cols = uniform(7, 1000.0);
        cols[2].trimmed_width = 9000.0;
        cols[4].trimmed_width = 9000.0;
        let breaks =
            LinesBreakerOptimal::new(false).decide_line_breaks(&ctx(&cols, 4000.0, 4000.0));
        // systems: {0,1}, {2}, {3}, {4}, {5,6}
        assert_eq!(breaks, vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn everything_fits_in_one_system() {
        let cols = uniform(4, 1000.0);
        let c = ctx(&cols, 10000.0, 10000.0);
        assert_eq!(break_lines_greedy(&c), vec![0]);
        assert_eq!(
            LinesBreakerOptimal::new(false).decide_line_breaks(&c),
            vec![0]
        );
    }

    #[test]
    fn empty_input_yields_no_breaks() {
        let cols: Vec<ColumnMeasure> = Vec::new();
        let c = ctx(&cols, 10000.0, 10000.0);
        assert!(break_lines_greedy(&c).is_empty());
        assert!(LinesBreakerOptimal::new(false)
            .decide_line_breaks(&c)
            .is_empty());
    }
}
