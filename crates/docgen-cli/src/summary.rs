use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use docgen_cli::pipeline::TagInventory;
use docgen_cli::types::{BatchResult, DocumentStatus};
use docgen_model::{Severity, ValidationIssue, ValidationReport};

pub fn print_batch_summary(result: &BatchResult) {
    println!("{}", batch_table(result));
    println!(
        "Converted {} of {} documents",
        result.succeeded(),
        result.documents.len()
    );
    let failures: Vec<_> = result
        .documents
        .iter()
        .filter_map(|document| match &document.status {
            DocumentStatus::Failed { error } => Some((document.name(), error)),
            DocumentStatus::Converted(_) => None,
        })
        .collect();
    if !failures.is_empty() {
        eprintln!("Errors:");
        for (name, error) in failures {
            eprintln!("- {name}: {error}");
        }
    }
}

fn batch_table(result: &BatchResult) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Document"),
        header_cell("Status"),
        header_cell("Tags"),
        header_cell("Converted"),
        header_cell("AI"),
        header_cell("Unconverted"),
        header_cell("Split"),
        header_cell("Errors"),
        header_cell("Warnings"),
        header_cell("Confidence"),
        header_cell("Output"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..=9 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for document in &result.documents {
        let name = Cell::new(document.name())
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold);
        let row = match &document.status {
            DocumentStatus::Converted(converted) => {
                let tags = converted.tags;
                let report = &converted.report;
                vec![
                    name,
                    status_cell(report),
                    Cell::new(tags.total),
                    Cell::new(tags.converted),
                    count_cell(tags.delegated, Color::Cyan),
                    count_cell(tags.unconverted, Color::Yellow),
                    count_cell(tags.split, Color::Yellow),
                    count_cell(report.error_count(), Color::Red),
                    count_cell(report.warning_count(), Color::Yellow),
                    Cell::new(format!("{:.1}", report.confidence)),
                    match &converted.output {
                        Some(path) => Cell::new(path.display()),
                        None => dim_cell("dry run"),
                    },
                ]
            }
            DocumentStatus::Failed { .. } => {
                let mut row = vec![
                    name,
                    Cell::new("FAILED")
                        .fg(Color::Red)
                        .add_attribute(Attribute::Bold),
                ];
                row.extend((0..9).map(|_| dim_cell("-")));
                row
            }
        };
        table.add_row(row);
    }
    table
}

pub fn print_validation_report(report: &ValidationReport) {
    let verdict = if report.is_valid {
        "VALID"
    } else {
        "INVALID"
    };
    println!(
        "{verdict}: {} errors, {} warnings, completeness {:.2}, confidence {:.1} ({})",
        report.error_count(),
        report.warning_count(),
        report.completeness,
        report.confidence,
        report.method.as_str()
    );
    if let Some(stated) = report.ai_confidence {
        println!("AI-stated confidence {stated:.2}");
    }
    if report.issues().next().is_none() {
        return;
    }
    println!("{}", issue_table(report));
}

fn issue_table(report: &ValidationReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Kind"),
        header_cell("Line"),
        header_cell("Col"),
        header_cell("Message"),
        header_cell("Suggestion"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for issue in report.issues() {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.kind),
            position_cell(issue.line),
            position_cell(issue.column),
            Cell::new(&issue.message),
            suggestion_cell(issue),
        ]);
    }
    table
}

pub fn print_tag_listing(inventory: &TagInventory) {
    print_tag_table(inventory);
    if !inventory.stray_runs.is_empty() {
        eprintln!("Runs with tag fragments but no complete tag:");
        for run in &inventory.stray_runs {
            eprintln!("- {}: {}", run.coordinate, run.text);
        }
    }
}

fn print_tag_table(inventory: &TagInventory) {
    let tags = &inventory.tags;
    if tags.is_empty() {
        println!("No legacy tags found");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Line"),
        header_cell("Col"),
        header_cell("Kind"),
        header_cell("Tag"),
        header_cell("Location"),
        header_cell("Rule"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 1, CellAlignment::Right);
    for tag in tags {
        let kind = if tag.nested {
            dim_cell(format!("  -> {}", tag.occurrence.kind))
        } else {
            Cell::new(tag.occurrence.kind)
        };
        let location = match &tag.occurrence.location {
            Some(location) if location.is_split() => {
                Cell::new(format!("{location} (split)")).fg(Color::Yellow)
            }
            Some(location) => Cell::new(location),
            None => Cell::new("unlocated").fg(Color::Red),
        };
        let rule = match tag.rule {
            Some(rule) => Cell::new(rule).fg(Color::Green),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(tag.line),
            Cell::new(tag.column),
            kind,
            Cell::new(&tag.occurrence.raw_text),
            location,
            rule,
        ]);
    }
    println!("{table}");
}

fn status_cell(report: &ValidationReport) -> Cell {
    if report.is_valid {
        Cell::new("OK").fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        Cell::new("INVALID").fg(Color::Red)
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Error => Cell::new("ERROR").fg(Color::Red),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn position_cell(value: usize) -> Cell {
    if value == 0 {
        dim_cell("-")
    } else {
        Cell::new(value)
    }
}

fn suggestion_cell(issue: &ValidationIssue) -> Cell {
    match &issue.suggestion {
        Some(suggestion) => Cell::new(suggestion),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(165);
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
