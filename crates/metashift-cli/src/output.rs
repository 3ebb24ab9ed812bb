//! Output rendering for plan reports and run outcomes.

use clap::ValueEnum;
use comfy_table::{Cell, Table};

use metashift_core::{DatabaseAssessment, PlanReport, RunReport};

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a plan report in the requested format.
pub fn render_plan(report: &PlanReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => report
            .to_json()
            .unwrap_or_else(|e| format!("Error: {e}")),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec![
                "Database", "Strategy", "Status", "Target", "Views", "Objects", "Errors",
            ]);
            for row in &report.databases {
                table.add_row(vec![
                    Cell::new(&row.database),
                    Cell::new(&row.strategy),
                    Cell::new(&row.status),
                    Cell::new(&row.target),
                    Cell::new(if row.has_views { "yes" } else { "no" }),
                    Cell::new(
                        row.objects
                            .map(|n| n.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ),
                    Cell::new(row.message_count.to_string()),
                ]);
            }
            format!(
                "{table}\n{} complete, {} partial, {} failed, {} not started",
                report.totals.complete,
                report.totals.partial,
                report.totals.failed,
                report.totals.not_started
            )
        }
    }
}

/// Render a run report in the requested format.
pub fn render_run(report: &RunReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("Error: {e}")),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec![
                "Database",
                "Status",
                "Tables ok/failed/pending",
                "Views ok/failed/pending",
                "Provisioned",
            ]);
            for row in &report.databases {
                table.add_row(vec![
                    Cell::new(&row.database),
                    Cell::new(row.status.to_string()),
                    Cell::new(format!(
                        "{}/{}/{}",
                        row.tables_done, row.tables_failed, row.tables_pending
                    )),
                    Cell::new(format!(
                        "{}/{}/{}",
                        row.views_done, row.views_failed, row.views_pending
                    )),
                    Cell::new(if row.provision_failed { "failed" } else { "yes" }),
                ]);
            }
            table.to_string()
        }
    }
}

/// Render the assessments produced by a plan refresh.
pub fn render_assessments(assessments: &[DatabaseAssessment]) -> String {
    let mut table = Table::new();
    table.set_header(vec![
        "Database", "Strategy", "Tables", "Upgraded", "Views",
    ]);
    for assessment in assessments {
        table.add_row(vec![
            Cell::new(&assessment.database),
            Cell::new(assessment.strategy.to_string()),
            Cell::new(assessment.tables.to_string()),
            Cell::new(assessment.excluded.to_string()),
            Cell::new(assessment.views.to_string()),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use metashift_core::{
        Classifier, ExternalLocations, ObjectMeta, PlanStore, StorageKind,
    };

    fn seeded_report() -> PlanReport {
        let store = PlanStore::open_temporary().unwrap();
        let locations = ExternalLocations::empty();
        Classifier::new(&locations)
            .refresh_plan(
                &store,
                vec![ObjectMeta::table("sales", "orders", StorageKind::Managed)],
                None,
            )
            .unwrap();
        PlanReport::project(&store).unwrap()
    }

    #[test]
    fn test_table_rendering_includes_rows_and_totals() {
        let rendered = render_plan(&seeded_report(), OutputFormat::Table);

        assert!(rendered.contains("sales"));
        assert!(rendered.contains("ctas"));
        assert!(rendered.contains("1 not started"));
    }

    #[test]
    fn test_json_rendering_is_valid() {
        let rendered = render_plan(&seeded_report(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["databases"][0]["database"], "sales");
    }
}
