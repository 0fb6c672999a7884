//! Line-breaking behavior through the public layout API.

use engravelib::{
    engrave_score, BreakerStrategy, Column, Instrument, LayoutOptions, NoteType, ObjId,
    ScoreDocument, StaffObjKind, StaffObject, StemDir,
};
use pretty_assertions::assert_eq;

fn note(id: u64, time: f64) -> StaffObject {
    StaffObject {
        id: ObjId(id),
        time,
        duration: 1.0,
        voice: 1,
        instr: 0,
        staff: 0,
        kind: StaffObjKind::Note {
            step: 6,
            note_type: NoteType::Quarter,
            dots: 0,
            accidental: None,
            stem: StemDir::Auto,
        },
    }
}

fn doc_with_widths(widths: &[f64]) -> ScoreDocument {
    let columns = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| Column {
            objects: vec![note(i as u64 + 1, i as f64)],
            ..Column::new(i as f64, w)
        })
        .collect();
    ScoreDocument {
        instruments: vec![Instrument {
            id: "P1".into(),
            name: None,
            num_staves: 1,
        }],
        columns,
        relations: vec![],
    }
}

fn options(page_width: f64, strategy: BreakerStrategy) -> LayoutOptions {
    LayoutOptions {
        page_width,
        strategy,
        ..LayoutOptions::default()
    }
}

fn system_ranges(doc: &ScoreDocument, opts: LayoutOptions) -> Vec<(usize, usize)> {
    engrave_score(doc, opts)
        .expect("layout failed")
        .systems
        .iter()
        .map(|s| (s.first_column, s.last_column))
        .collect()
}

#[test]
fn uniform_columns_break_the_same_greedy_and_optimal() {
    let doc = doc_with_widths(&[1500.0; 12]);
    let greedy = system_ranges(&doc, options(6000.0, BreakerStrategy::Greedy));
    let optimal = system_ranges(&doc, options(6000.0, BreakerStrategy::Optimal));

    assert_eq!(greedy, vec![(0, 4), (4, 8), (8, 12)]);
    assert_eq!(optimal, greedy);
}

#[test]
fn oversized_column_lands_alone_in_its_own_system() {
    let doc = doc_with_widths(&[1500.0, 1500.0, 9000.0, 1500.0, 1500.0]);
    for strategy in [BreakerStrategy::Greedy, BreakerStrategy::Optimal] {
        let ranges = system_ranges(&doc, options(6000.0, strategy));
        assert!(
            ranges.contains(&(2, 3)),
            "{strategy:?}: oversized column shares a system: {ranges:?}"
        );
    }
}

#[test]
fn first_system_indent_shortens_the_first_system() {
    let doc = doc_with_widths(&[1500.0; 8]);
    let opts = LayoutOptions {
        page_width: 6000.0,
        first_system_indent: 1600.0,
        strategy: BreakerStrategy::Greedy,
        ..LayoutOptions::default()
    };
    let ranges = system_ranges(&doc, opts);

    // 4400 usable on the first system holds 2 columns, the rest hold 4
    assert_eq!(ranges[0], (0, 2));
    assert_eq!(ranges[1], (2, 6));
}

#[test]
fn justify_last_line_stretches_the_final_system() {
    let doc = doc_with_widths(&[1000.0, 1000.0]);
    let unjustified = engrave_score(&doc, LayoutOptions::default()).expect("layout failed");
    assert!((unjustified.systems[0].slices[0].rect.width - 1000.0).abs() < 1e-6);

    let opts = LayoutOptions {
        justify_last_line: true,
        ..LayoutOptions::default()
    };
    let justified = engrave_score(&doc, opts).expect("layout failed");
    assert!((justified.systems[0].slices[0].rect.width - 9500.0).abs() < 1e-6);
}
