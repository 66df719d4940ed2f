use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_analytics_events::EventsService;
use tally_core::DateWindow;
use tracing::{debug, info};
use utoipa::ToSchema;

use super::funnel_service::{validate_steps, FunnelError, FunnelService, FunnelStepInput};
use crate::percentage::Percentage;

/// Counts and conversion for one funnel step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StepReport {
    pub step_number: i32,
    pub event_type: String,
    pub unique_sessions: i64,
    pub total_events: i64,
    /// Unique sessions relative to the first step
    pub conversion_rate: Percentage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConversionReport {
    /// `0` for previews of unsaved funnels
    pub funnel_id: i32,
    pub funnel_name: String,
    pub window: DateWindow,
    pub steps: Vec<StepReport>,
    /// Last step relative to the first
    pub overall_conversion_rate: Percentage,
}

/// Unsaved funnel to evaluate without persisting it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreviewFunnelRequest {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<FunnelStepInput>,
}

/// Computes step-wise conversion over a window of events.
///
/// Each report is one sequential pass: one count query per step, in step
/// order. Nothing is cached between calls.
pub struct ConversionService {
    funnels: Arc<FunnelService>,
    events: Arc<EventsService>,
}

impl ConversionService {
    pub fn new(funnels: Arc<FunnelService>, events: Arc<EventsService>) -> Self {
        Self { funnels, events }
    }

    pub async fn compute_conversion(
        &self,
        funnel_id: i32,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<ConversionReport, FunnelError> {
        let window = DateWindow::new(window_start, window_end)?;
        let definition = self.funnels.get_funnel(funnel_id).await?;

        let steps: Vec<(i32, String)> = definition
            .steps
            .into_iter()
            .map(|s| (s.step_number, s.event_type))
            .collect();

        let report = self
            .build_report(definition.id, definition.name, steps, window)
            .await?;
        info!(
            "Computed conversion for funnel {} over {}: overall {}%",
            funnel_id, window, report.overall_conversion_rate
        );
        Ok(report)
    }

    /// Same computation for a step list that has not been saved.
    pub async fn preview_conversion(
        &self,
        request: PreviewFunnelRequest,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<ConversionReport, FunnelError> {
        let window = DateWindow::new(window_start, window_end)?;
        validate_steps(&request.steps)?;

        let steps = request
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, s)| (index as i32 + 1, s.event_type.trim().to_string()))
            .collect();

        self.build_report(0, request.name, steps, window).await
    }

    async fn build_report(
        &self,
        funnel_id: i32,
        funnel_name: String,
        steps: Vec<(i32, String)>,
        window: DateWindow,
    ) -> Result<ConversionReport, FunnelError> {
        let mut reports: Vec<StepReport> = Vec::with_capacity(steps.len());
        let mut baseline = 0;

        for (index, (step_number, event_type)) in steps.into_iter().enumerate() {
            let counts = self.events.count_events(&event_type, &window).await?;

            let conversion_rate = if index == 0 {
                baseline = counts.unique_sessions;
                Percentage::HUNDRED
            } else {
                Percentage::ratio(counts.unique_sessions, baseline)
            };

            debug!(
                "Funnel {} step {} ({}): {} sessions, {} events, {}%",
                funnel_id,
                step_number,
                event_type,
                counts.unique_sessions,
                counts.total_events,
                conversion_rate
            );

            reports.push(StepReport {
                step_number,
                event_type,
                unique_sessions: counts.unique_sessions,
                total_events: counts.total_events,
                conversion_rate,
            });
        }

        let overall_conversion_rate = reports
            .last()
            .map(|last| Percentage::ratio(last.unique_sessions, baseline))
            .unwrap_or(Percentage::ZERO);

        Ok(ConversionReport {
            funnel_id,
            funnel_name,
            window,
            steps: reports,
            overall_conversion_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CreateFunnelRequest;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use tally_analytics_events::NewEvent;
    use tally_core::DateTime;
    use tally_database::test_utils::TestDatabase;

    struct Fixture {
        db: TestDatabase,
        funnels: Arc<FunnelService>,
        events: Arc<EventsService>,
        conversion: ConversionService,
    }

    async fn fixture() -> anyhow::Result<Fixture> {
        let test_db = TestDatabase::new().await?;
        let funnels = Arc::new(FunnelService::new(test_db.connection_arc()));
        let events = Arc::new(EventsService::new(test_db.connection_arc()));
        let conversion = ConversionService::new(funnels.clone(), events.clone());
        Ok(Fixture {
            db: test_db,
            funnels,
            events,
            conversion,
        })
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn steps(types: &[&str]) -> Vec<FunnelStepInput> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| FunnelStepInput {
                step_number: i as i32 + 1,
                event_type: t.to_string(),
            })
            .collect()
    }

    async fn create(f: &Fixture, types: &[&str]) -> anyhow::Result<i32> {
        let created = f
            .funnels
            .create_funnel(CreateFunnelRequest {
                name: "Checkout".to_string(),
                description: None,
                is_active: None,
                steps: steps(types),
            })
            .await?;
        Ok(created.id)
    }

    async fn record(f: &Fixture, session: &str, event_type: &str, day: u32) -> anyhow::Result<()> {
        f.events
            .record_event(NewEvent {
                session_id: session.to_string(),
                event_type: event_type.to_string(),
                occurred_at: Some(DateTime(Utc.with_ymd_and_hms(2025, 5, day, 12, 0, 0).unwrap())),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    fn rates(report: &ConversionReport) -> Vec<String> {
        report
            .steps
            .iter()
            .map(|s| s.conversion_rate.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_window_reports_zero_counts() -> anyhow::Result<()> {
        let f = fixture().await?;
        let id = create(&f, &["page_view", "add_to_cart", "purchase"]).await?;

        let report = f
            .conversion
            .compute_conversion(id, date(2025, 5, 1), date(2025, 5, 31))
            .await?;

        assert_eq!(report.funnel_id, id);
        assert_eq!(report.funnel_name, "Checkout");
        assert!(report
            .steps
            .iter()
            .all(|s| s.unique_sessions == 0 && s.total_events == 0));
        assert_eq!(rates(&report), vec!["100.00", "0.00", "0.00"]);
        assert_eq!(report.overall_conversion_rate, Percentage::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_step_rates_relative_to_first_step() -> anyhow::Result<()> {
        let f = fixture().await?;
        let id = create(&f, &["page_view", "add_to_cart", "purchase"]).await?;

        for session in ["a", "b", "c"] {
            record(&f, session, "page_view", 3).await?;
        }
        record(&f, "a", "page_view", 4).await?;
        record(&f, "a", "add_to_cart", 4).await?;
        record(&f, "b", "add_to_cart", 5).await?;
        record(&f, "a", "purchase", 6).await?;
        // Outside the window
        record(&f, "z", "purchase", 20).await?;

        let report = f
            .conversion
            .compute_conversion(id, date(2025, 5, 1), date(2025, 5, 10))
            .await?;

        let counts: Vec<(i64, i64)> = report
            .steps
            .iter()
            .map(|s| (s.unique_sessions, s.total_events))
            .collect();
        assert_eq!(counts, vec![(3, 4), (2, 2), (1, 1)]);
        assert_eq!(rates(&report), vec!["100.00", "66.67", "33.33"]);
        assert_eq!(report.overall_conversion_rate.to_string(), "33.33");
        Ok(())
    }

    #[tokio::test]
    async fn test_rates_above_hundred_are_not_clamped() -> anyhow::Result<()> {
        let f = fixture().await?;
        let id = create(&f, &["landing", "sign_up"]).await?;

        record(&f, "a", "landing", 1).await?;
        record(&f, "a", "sign_up", 1).await?;
        record(&f, "b", "sign_up", 1).await?;

        let report = f
            .conversion
            .compute_conversion(id, date(2025, 5, 1), date(2025, 5, 1))
            .await?;
        assert_eq!(rates(&report), vec!["100.00", "200.00"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_funnel_without_steps_reports_nothing() -> anyhow::Result<()> {
        use sea_orm::{ActiveModelTrait, Set};
        use tally_entities::funnels;

        let f = fixture().await?;
        let funnel = funnels::ActiveModel {
            name: Set("bare".to_string()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(f.db.connection())
        .await?;

        let report = f
            .conversion
            .compute_conversion(funnel.id, date(2025, 5, 1), date(2025, 5, 1))
            .await?;
        assert!(report.steps.is_empty());
        assert_eq!(report.overall_conversion_rate, Percentage::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_funnel_is_not_found() -> anyhow::Result<()> {
        let f = fixture().await?;
        let err = f
            .conversion
            .compute_conversion(404, date(2025, 5, 1), date(2025, 5, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, FunnelError::NotFound(404)));
        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_window_is_rejected() -> anyhow::Result<()> {
        let f = fixture().await?;
        let id = create(&f, &["a"]).await?;
        let err = f
            .conversion
            .compute_conversion(id, date(2025, 5, 2), date(2025, 5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, FunnelError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_uses_request_order() -> anyhow::Result<()> {
        let f = fixture().await?;
        record(&f, "a", "view", 2).await?;
        record(&f, "b", "view", 2).await?;
        record(&f, "a", "buy", 2).await?;

        let report = f
            .conversion
            .preview_conversion(
                PreviewFunnelRequest {
                    name: "draft".to_string(),
                    steps: vec![
                        FunnelStepInput {
                            step_number: 3,
                            event_type: "view".to_string(),
                        },
                        FunnelStepInput {
                            step_number: 8,
                            event_type: "buy".to_string(),
                        },
                    ],
                },
                date(2025, 5, 1),
                date(2025, 5, 31),
            )
            .await?;

        assert_eq!(report.funnel_id, 0);
        assert_eq!(
            report.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(rates(&report), vec!["100.00", "50.00"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_event_store_failure_propagates() -> anyhow::Result<()> {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([DbErr::Custom("timeout".into())])
                .into_connection(),
        );
        let conversion = ConversionService::new(
            Arc::new(FunnelService::new(db.clone())),
            Arc::new(EventsService::new(db)),
        );

        let err = conversion
            .preview_conversion(
                PreviewFunnelRequest {
                    name: String::new(),
                    steps: steps(&["a"]),
                },
                date(2025, 1, 1),
                date(2025, 1, 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FunnelError::Events(_)));
        Ok(())
    }
}
