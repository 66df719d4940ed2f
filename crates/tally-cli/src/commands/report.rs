use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use tally_analytics_events::EventsService;
use tally_analytics_funnels::{ConversionReport, ConversionService, FunnelService};
use tally_core::DatabaseConfig;
use tracing::debug;

#[derive(Args)]
pub struct ReportCommand {
    /// Database connection URL
    #[arg(long, env = "TALLY_DATABASE_URL")]
    pub database_url: String,

    /// Funnel to report on
    #[arg(long)]
    pub funnel_id: i32,

    /// First day of the window, YYYY-MM-DD
    #[arg(long)]
    pub start_date: NaiveDate,

    /// Last day of the window (inclusive), YYYY-MM-DD
    #[arg(long)]
    pub end_date: NaiveDate,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ReportCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        let report = rt.block_on(async {
            let db = tally_database::establish_connection(&DatabaseConfig::new(
                self.database_url.clone(),
            ))
            .await?;

            let funnels = Arc::new(FunnelService::new(db.clone()));
            let events = Arc::new(EventsService::new(db));
            let conversion = ConversionService::new(funnels, events);

            debug!(
                "Computing report for funnel {} from {} to {}",
                self.funnel_id, self.start_date, self.end_date
            );
            conversion
                .compute_conversion(self.funnel_id, self.start_date, self.end_date)
                .await
                .map_err(anyhow::Error::from)
        })?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print!("{}", render_report(&report));
        }
        Ok(())
    }
}

/// Human readable table of a conversion report.
pub fn render_report(report: &ConversionReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} {} ({})\n",
        "Funnel".bright_white().bold(),
        report.funnel_name.bright_cyan(),
        report.window
    ));
    out.push_str(&format!(
        "{:>4}  {:<28} {:>10} {:>10} {:>10}\n",
        "#", "event", "sessions", "events", "rate"
    ));

    for step in &report.steps {
        let rate = format!("{}%", step.conversion_rate);
        let rate = if step.unique_sessions == 0 {
            rate.bright_red()
        } else {
            rate.bright_green()
        };
        out.push_str(&format!(
            "{:>4}  {:<28} {:>10} {:>10} {:>10}\n",
            step.step_number, step.event_type, step.unique_sessions, step.total_events, rate
        ));
    }

    out.push_str(&format!(
        "{} {}%\n",
        "Overall conversion:".bright_white().bold(),
        report.overall_conversion_rate
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_analytics_funnels::{Percentage, StepReport};
    use tally_core::DateWindow;

    #[test]
    fn test_render_report_lists_every_step() {
        colored::control::set_override(false);

        let report = ConversionReport {
            funnel_id: 3,
            funnel_name: "Signup".to_string(),
            window: DateWindow::new(
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            )
            .unwrap(),
            steps: vec![
                StepReport {
                    step_number: 1,
                    event_type: "page_view".to_string(),
                    unique_sessions: 3,
                    total_events: 4,
                    conversion_rate: Percentage::HUNDRED,
                },
                StepReport {
                    step_number: 2,
                    event_type: "sign_up".to_string(),
                    unique_sessions: 2,
                    total_events: 2,
                    conversion_rate: Percentage::ratio(2, 3),
                },
            ],
            overall_conversion_rate: Percentage::ratio(2, 3),
        };

        let rendered = render_report(&report);
        assert!(rendered.contains("Signup"));
        assert!(rendered.contains("page_view"));
        assert!(rendered.contains("100.00%"));
        assert!(rendered.contains("Overall conversion: 66.67%"));
    }
}
