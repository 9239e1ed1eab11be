use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_match::GroupOverlap;

use crate::types::{LabelResult, MatchResult};

pub fn print_label_summary(result: &LabelResult) {
    match &result.labels_file {
        Some(path) => println!("Labels: {}", path.display()),
        None => println!("Labels: dry run, nothing written to {}", result.output_dir.display()),
    }
    if let Some(subjects) = result.feature_subjects {
        match &result.features_file {
            Some(path) => println!("Diagnosis features: {} ({subjects} subjects)", path.display()),
            None => println!("Diagnosis features: {subjects} subjects, not written"),
        }
    }
    let summary = &result.summary;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Records"),
        header_cell("Flagged"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    let rows = [
        ("Criteria", summary.criteria_records, None),
        ("Primary", summary.primary_records, Some(summary.primary_flagged)),
        ("Escalated", summary.escalated_records, Some(summary.escalated_flagged)),
        ("Terminal", summary.terminal_records, Some(summary.terminal_flagged)),
        ("Admissions", summary.admissions_total, None),
        ("  kept (length)", summary.admissions_kept, None),
        ("  with records", summary.admissions_attached, None),
    ];
    for (step, records, flagged) in rows {
        table.add_row(vec![
            Cell::new(step),
            Cell::new(records),
            count_cell(flagged, Color::Yellow),
        ]);
    }
    println!("{table}");

    let mut outcomes = Table::new();
    outcomes.set_header(vec![header_cell("Outcome"), header_cell("Admissions")]);
    apply_table_style(&mut outcomes);
    align_column(&mut outcomes, 1, CellAlignment::Right);
    outcomes.add_row(vec![
        Cell::new("Excluded"),
        count_cell(Some(summary.excluded), Color::Red),
    ]);
    outcomes.add_row(vec![
        Cell::new("Positive"),
        count_cell(Some(summary.positive), Color::Green),
    ]);
    outcomes.add_row(vec![Cell::new("Negative"), Cell::new(summary.negative)]);
    outcomes.add_row(vec![
        Cell::new("Labeled subjects")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(result.labels.len()).add_attribute(Attribute::Bold),
    ]);
    println!("{outcomes}");
}

pub fn print_match_summary(result: &MatchResult) {
    match &result.matches_file {
        Some(path) => println!("Matches: {}", path.display()),
        None => println!("Matches: dry run, nothing written to {}", result.output_dir.display()),
    }
    let report = &result.report;
    println!("Caliper threshold: {:.4}", report.threshold);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Group"),
        header_cell("Count"),
        header_cell("Mean logit"),
        header_cell("Std"),
        header_cell("Min"),
        header_cell("Max"),
    ]);
    apply_table_style(&mut table);
    for column in 1..6 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for group in [&result.overlap.treated, &result.overlap.untreated] {
        table.add_row(overlap_row(group));
    }
    println!("{table}");
    match result.overlap.common_support() {
        Some((low, high)) => println!("Common support: [{low:.4}, {high:.4}]"),
        None => println!("Common support: none"),
    }

    let mut matches = Table::new();
    matches.set_header(vec![header_cell("Matched"), header_cell("Unmatched treated")]);
    apply_table_style(&mut matches);
    align_column(&mut matches, 0, CellAlignment::Right);
    align_column(&mut matches, 1, CellAlignment::Right);
    matches.add_row(vec![
        count_cell(Some(report.matches.len()), Color::Green),
        count_cell(Some(report.unmatched_treated()), Color::Yellow),
    ]);
    println!("{matches}");
}

fn overlap_row(group: &GroupOverlap) -> Vec<Cell> {
    vec![
        Cell::new(group.group)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        Cell::new(group.count),
        stat_cell(group.mean),
        stat_cell(group.std),
        stat_cell(group.min),
        stat_cell(group.max),
    ]
}

fn stat_cell(value: Option<f64>) -> Cell {
    match value {
        Some(value) => Cell::new(format!("{value:.4}")),
        None => dim_cell("-"),
    }
}

fn count_cell(count: Option<usize>, color: Color) -> Cell {
    match count {
        Some(value) if value > 0 => Cell::new(value).fg(color).add_attribute(Attribute::Bold),
        Some(value) => dim_cell(value),
        None => dim_cell("-"),
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
