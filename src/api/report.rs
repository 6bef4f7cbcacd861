//! Side-by-side comparison output: display labels, per-scenario summaries and the
//! comparison table, plus plain-text renderings for the CLI.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::core::{
    CommonParams, DEFAULT_COMMON_TEXT_WIDTH, DisplayedDifference, Scenario, ScenarioDiff,
    ScenarioField, Trajectory, compare, describe_differences, format_common_text, format_value,
    project,
};

const NO_SCENARIOS_TEXT: &str = "No scenarios visible.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub label: String,
    pub display_label: String,
    pub final_age: u32,
    pub final_total_assets: f64,
    pub differences: Vec<DisplayedDifference>,
    pub trajectory: Trajectory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub parameter: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonTable {
    pub header: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub common: CommonParams,
    pub common_text: String,
    pub diffs: Vec<ScenarioDiff>,
    pub scenarios: Vec<ScenarioSummary>,
    pub table: ComparisonTable,
}

/// First occurrence of a label keeps it; later duplicates become `A |— 2`, `A |— 3`.
pub fn assign_display_labels(scenarios: &[Scenario]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    scenarios
        .iter()
        .map(|scenario| {
            let count = seen.entry(scenario.label.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                scenario.label.clone()
            } else {
                format!("{} |— {}", scenario.label, count)
            }
        })
        .collect()
}

pub fn build_comparison_report(scenarios: &[Scenario]) -> ComparisonReport {
    let (common, diffs) = compare(scenarios);
    let display_labels = assign_display_labels(scenarios);

    let summaries = scenarios
        .iter()
        .zip(display_labels)
        .zip(&diffs)
        .map(|((scenario, display_label), diff)| {
            let trajectory = project(scenario);
            ScenarioSummary {
                label: scenario.label.clone(),
                display_label,
                final_age: scenario.final_age(),
                final_total_assets: trajectory.total_assets.last().copied().unwrap_or(0.0),
                differences: describe_differences(diff),
                trajectory,
            }
        })
        .collect::<Vec<_>>();

    let table = build_comparison_table(&summaries, &diffs);
    tracing::info!(
        scenarios = scenarios.len(),
        common = common.len(),
        "built comparison report"
    );

    ComparisonReport {
        common_text: format_common_text(&common, DEFAULT_COMMON_TEXT_WIDTH),
        common,
        diffs,
        scenarios: summaries,
        table,
    }
}

/// Final age and final total asset per scenario, then one row per displayed
/// differing parameter, sorted by name. No scenarios, no rows.
pub fn build_comparison_table(
    summaries: &[ScenarioSummary],
    diffs: &[ScenarioDiff],
) -> ComparisonTable {
    let mut header = Vec::with_capacity(summaries.len() + 1);
    header.push("Parameter".to_string());
    header.extend(summaries.iter().map(|s| s.display_label.clone()));

    if summaries.is_empty() {
        return ComparisonTable {
            header,
            rows: Vec::new(),
        };
    }

    let mut rows = vec![
        TableRow {
            parameter: "Final Age".to_string(),
            cells: summaries.iter().map(|s| s.final_age.to_string()).collect(),
        },
        TableRow {
            parameter: "Final Total Asset".to_string(),
            cells: summaries
                .iter()
                .map(|s| format_thousands(s.final_total_assets))
                .collect(),
        },
    ];

    let mut fields = diffs
        .iter()
        .flat_map(|diff| diff.differing_fields())
        .filter(|field| field.is_displayed())
        .collect::<BTreeSet<ScenarioField>>()
        .into_iter()
        .collect::<Vec<_>>();
    fields.sort_by_key(|field| field.name());

    for field in fields {
        rows.push(TableRow {
            parameter: field.title(),
            cells: diffs
                .iter()
                .map(|diff| {
                    diff.get(field)
                        .map(|value| format_value(field, value))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect(),
        });
    }

    ComparisonTable { header, rows }
}

/// `1234567.891` -> `1,234,567.89`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let rounds_to_zero = formatted.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !rounds_to_zero { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

pub fn render_comparison_text(report: &ComparisonReport) -> String {
    if report.scenarios.is_empty() {
        return format!("{NO_SCENARIOS_TEXT}\n");
    }

    let mut lines = vec![report.common_text.clone()];
    for summary in &report.scenarios {
        lines.push(String::new());
        lines.push(format!(
            "{} (final age {}, total asset {})",
            summary.display_label,
            summary.final_age,
            format_thousands(summary.final_total_assets)
        ));
        if summary.differences.is_empty() {
            lines.push("  No Differences".to_string());
        }
        lines.extend(
            summary
                .differences
                .iter()
                .map(|difference| format!("  {}: {}", difference.title, difference.value)),
        );
    }

    let mut out = lines.join("\n");
    out.push_str("\n\n");
    out.push_str(&render_table(&report.table));
    out
}

pub fn render_trajectory_text(scenario: &Scenario, trajectory: &Trajectory) -> String {
    let table = ComparisonTable {
        header: [
            "Year",
            "Age",
            "Total Asset",
            "Investment",
            "Savings",
            "Income",
            "From Initial Asset",
            "From Income",
        ]
        .into_iter()
        .map(str::to_string)
        .collect(),
        rows: trajectory
            .points()
            .map(|point| TableRow {
                parameter: point.t.to_string(),
                cells: vec![
                    point.age.to_string(),
                    format_thousands(point.total_assets),
                    format_thousands(point.investment_account),
                    format_thousands(point.savings_account),
                    format_thousands(point.income),
                    format_thousands(point.initial_asset_only),
                    format_thousands(point.income_contribution_only),
                ],
            })
            .collect(),
    };

    format!("{} (nominal)\n{}", scenario.label, render_table(&table))
}

fn render_table(table: &ComparisonTable) -> String {
    let column_count = table.header.len();
    let mut widths = table
        .header
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();
    for row in &table.rows {
        let cells = std::iter::once(&row.parameter).chain(&row.cells);
        for (idx, cell) in cells.enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header = table.header.iter().collect::<Vec<_>>();
    push_table_line(&mut out, &header, &widths);
    for row in &table.rows {
        let cells = std::iter::once(&row.parameter)
            .chain(&row.cells)
            .collect::<Vec<_>>();
        push_table_line(&mut out, &cells, &widths);
    }
    out
}

fn push_table_line(out: &mut String, cells: &[&String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, width))| {
            let pad = width.saturating_sub(cell.chars().count());
            if idx == 0 {
                format!("{cell}{}", " ".repeat(pad))
            } else {
                format!("{}{cell}", " ".repeat(pad))
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(label: &str) -> Scenario {
        Scenario {
            label: label.to_string(),
            initial_asset: 10_000.0,
            annual_income_initial: 50_000.0,
            invest_fraction: 0.3,
            save_fraction: 0.2,
            consumption_fraction: 0.5,
            annual_return_investment: 0.07,
            annual_return_savings: 0.02,
            income_growth_rate: 0.0,
            inflation_rate: 0.02,
            years: 1,
            starting_age: 30,
        }
    }

    #[test]
    fn duplicate_labels_get_numbered_suffixes() {
        let scenarios = [scenario("A"), scenario("B"), scenario("A"), scenario("A")];
        assert_eq!(
            assign_display_labels(&scenarios),
            vec!["A", "B", "A |— 2", "A |— 3"]
        );
    }

    #[test]
    fn thousands_are_grouped_with_two_decimals() {
        assert_eq!(format_thousands(0.0), "0.00");
        assert_eq!(format_thousands(999.999), "1,000.00");
        assert_eq!(format_thousands(17_750.0), "17,750.00");
        assert_eq!(format_thousands(1_234_567.891), "1,234,567.89");
        assert_eq!(format_thousands(-2_500.5), "-2,500.50");
        assert_eq!(format_thousands(-0.001), "0.00");
    }

    #[test]
    fn table_lists_final_values_and_differing_parameters() {
        let a = scenario("A");
        let mut b = scenario("B");
        b.save_fraction = 0.1;
        b.invest_fraction = 0.4;
        b.inflation_rate = 0.05;

        let report = build_comparison_report(&[a, b]);
        let table = &report.table;

        assert_eq!(table.header, vec!["Parameter", "A", "B"]);
        assert_eq!(table.rows[0].parameter, "Final Age");
        assert_eq!(table.rows[0].cells, vec!["31", "31"]);
        assert_eq!(table.rows[1].parameter, "Final Total Asset");
        assert_eq!(table.rows[1].cells[0], "17,750.00");

        let parameters = table
            .rows
            .iter()
            .map(|row| row.parameter.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            parameters,
            vec![
                "Final Age",
                "Final Total Asset",
                "Invest Fraction",
                "Save Fraction"
            ]
        );
        assert_eq!(table.rows[2].cells, vec!["30.0%", "40.0%"]);
        assert_eq!(table.rows[3].cells, vec!["20.0%", "10.0%"]);
    }

    #[test]
    fn report_carries_common_text_and_per_scenario_differences() {
        let a = scenario("A");
        let mut b = scenario("A");
        b.years = 10;

        let report = build_comparison_report(&[a, b]);
        assert!(report.common_text.starts_with("Common among visible curves"));
        assert!(!report.common_text.contains("inflation_rate"));
        assert_eq!(report.scenarios[1].display_label, "A |— 2");
        assert_eq!(report.scenarios[1].final_age, 40);
        assert_eq!(report.scenarios[1].trajectory.len(), 11);
        assert_eq!(report.scenarios[0].differences.len(), 1);
        assert_eq!(report.scenarios[0].differences[0].title, "Years");
        assert_eq!(report.scenarios[0].differences[0].value, "1");
    }

    #[test]
    fn empty_report_has_no_table_rows() {
        let report = build_comparison_report(&[]);
        assert!(report.common.is_empty());
        assert!(report.diffs.is_empty());
        assert!(report.scenarios.is_empty());
        assert_eq!(report.common_text, "No common parameters. All differ!");
        assert_eq!(report.table.header, vec!["Parameter"]);
        assert!(report.table.rows.is_empty());
        assert_eq!(render_comparison_text(&report), "No scenarios visible.\n");
    }

    #[test]
    fn rendered_text_lists_scenarios_before_table() {
        let a = scenario("A");
        let mut b = scenario("B");
        b.years = 2;

        let text = render_comparison_text(&build_comparison_report(&[a, b]));
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("Common among visible curves"));
        assert!(lines.contains(&"A (final age 31, total asset 17,750.00)"));
        assert!(lines.contains(&"  Years: 1"));
        assert!(lines.contains(&"  Years: 2"));
        assert!(lines.iter().any(|line| line.starts_with("Parameter")));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn rendered_text_includes_differences_and_table() {
        let a = scenario("A");
        let mut b = scenario("B");
        b.annual_return_investment = 0.05;

        let text = render_comparison_text(&build_comparison_report(&[a, b]));
        assert!(text.contains("Annual Return Investment: 7.0%"));
        assert!(text.contains("Annual Return Investment: 5.0%"));
        assert!(text.contains("Final Total Asset"));
        assert!(text.contains("17,750.00"));
    }

    #[test]
    fn single_scenario_renders_no_differences() {
        let text = render_comparison_text(&build_comparison_report(&[scenario("Solo")]));
        assert!(text.contains("No Differences"));
    }

    #[test]
    fn trajectory_text_has_one_line_per_year() {
        let mut s = scenario("Plan");
        s.years = 3;
        let trajectory = project(&s);

        let text = render_trajectory_text(&s, &trajectory);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Plan (nominal)");
        assert!(lines[1].starts_with("Year"));
        assert_eq!(lines.len(), 2 + 4);
        assert!(lines[2].contains("5,000.00"));
    }
}
