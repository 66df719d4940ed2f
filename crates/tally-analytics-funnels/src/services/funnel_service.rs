use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tally_analytics_events::EventsError;
use tally_core::{PaginationParams, ServiceError, UtcDateTime};
use tally_entities::{funnel_steps, funnels};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum FunnelError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Funnel {0} not found")]
    NotFound(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Funnel {funnel_id} has an invalid definition: {reason}")]
    InvalidDefinition { funnel_id: i32, reason: String },

    #[error("Event store error: {0}")]
    Events(#[from] EventsError),
}

impl From<ServiceError> for FunnelError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Database(message) => FunnelError::Database(DbErr::Custom(message)),
            ServiceError::Validation { message } => FunnelError::Validation(message),
            other => FunnelError::Validation(other.to_string()),
        }
    }
}

/// One step as written by callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FunnelStepInput {
    /// Position of the step, starting at 1
    pub step_number: i32,
    /// Event type that marks completion of this step
    pub event_type: String,
}

/// Full funnel definition used for both create and replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateFunnelRequest {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to `true` on create and to the current value on replace
    pub is_active: Option<bool>,
    pub steps: Vec<FunnelStepInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FunnelStepDefinition {
    pub step_number: i32,
    pub event_type: String,
}

/// A stored funnel with its steps in ascending, dense `step_number` order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FunnelDefinition {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub steps: Vec<FunnelStepDefinition>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: UtcDateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: UtcDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub step_count: usize,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: UtcDateTime,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: UtcDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FunnelPage {
    pub funnels: Vec<FunnelSummary>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Checks a step list: non-empty, non-blank event types, positive and
/// strictly increasing step numbers.
pub fn validate_steps(steps: &[FunnelStepInput]) -> Result<(), FunnelError> {
    if steps.is_empty() {
        return Err(FunnelError::Validation(
            "a funnel needs at least one step".to_string(),
        ));
    }

    let mut previous = 0;
    for step in steps {
        if step.event_type.trim().is_empty() {
            return Err(FunnelError::Validation(format!(
                "step {} has an empty event type",
                step.step_number
            )));
        }
        if step.step_number <= previous {
            return Err(FunnelError::Validation(format!(
                "step numbers must be positive and strictly increasing, got {} after {}",
                step.step_number, previous
            )));
        }
        previous = step.step_number;
    }

    Ok(())
}

fn validate_request(request: &CreateFunnelRequest) -> Result<(), FunnelError> {
    if request.name.trim().is_empty() {
        return Err(FunnelError::Validation(
            "funnel name must not be empty".to_string(),
        ));
    }
    validate_steps(&request.steps)
}

/// Assembles a definition from stored rows.
///
/// Duplicate step numbers are rejected. Gaps are closed so the result always
/// numbers its steps `1..=n`.
fn definition_from_rows(
    funnel: funnels::Model,
    mut steps: Vec<funnel_steps::Model>,
) -> Result<FunnelDefinition, FunnelError> {
    steps.sort_by_key(|step| (step.step_number, step.id));

    if let Some(pair) = steps
        .windows(2)
        .find(|pair| pair[0].step_number == pair[1].step_number)
    {
        return Err(FunnelError::InvalidDefinition {
            funnel_id: funnel.id,
            reason: format!("step number {} is used twice", pair[0].step_number),
        });
    }

    let dense = steps
        .iter()
        .enumerate()
        .all(|(index, step)| step.step_number == index as i32 + 1);
    if !dense {
        warn!(
            "Funnel {} has non-contiguous step numbers {:?}, renumbering",
            funnel.id,
            steps.iter().map(|s| s.step_number).collect::<Vec<_>>()
        );
    }

    Ok(FunnelDefinition {
        id: funnel.id,
        name: funnel.name,
        description: funnel.description,
        is_active: funnel.is_active,
        steps: steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| FunnelStepDefinition {
                step_number: index as i32 + 1,
                event_type: step.event_type,
            })
            .collect(),
        created_at: funnel.created_at,
        updated_at: funnel.updated_at,
    })
}

/// Writes steps densified to `1..=n`, keeping the request order.
async fn insert_steps<C: ConnectionTrait>(
    conn: &C,
    funnel_id: i32,
    steps: &[FunnelStepInput],
) -> Result<Vec<funnel_steps::Model>, DbErr> {
    let now = chrono::Utc::now();
    let mut stored = Vec::with_capacity(steps.len());

    for (index, step) in steps.iter().enumerate() {
        let model = funnel_steps::ActiveModel {
            funnel_id: Set(funnel_id),
            step_number: Set(index as i32 + 1),
            event_type: Set(step.event_type.trim().to_string()),
            created_at: Set(now),
            ..Default::default()
        };
        stored.push(model.insert(conn).await?);
    }

    Ok(stored)
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Funnel definition store
pub struct FunnelService {
    db: Arc<DatabaseConnection>,
}

impl FunnelService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn get_funnel(&self, funnel_id: i32) -> Result<FunnelDefinition, FunnelError> {
        let db = self.db.as_ref();

        let funnel = funnels::Entity::find_by_id(funnel_id)
            .one(db)
            .await?
            .ok_or(FunnelError::NotFound(funnel_id))?;

        let steps = funnel_steps::Entity::find()
            .filter(funnel_steps::Column::FunnelId.eq(funnel_id))
            .all(db)
            .await?;

        definition_from_rows(funnel, steps)
    }

    /// Page through funnels ordered by id, optionally by active flag.
    pub async fn list_funnels(
        &self,
        pagination: &PaginationParams,
        is_active: Option<bool>,
    ) -> Result<FunnelPage, FunnelError> {
        let db = self.db.as_ref();
        let (page, page_size) = pagination.normalize();

        let mut query = funnels::Entity::find();
        if let Some(active) = is_active {
            query = query.filter(funnels::Column::IsActive.eq(active));
        }

        let paginator = query
            .order_by_asc(funnels::Column::Id)
            .paginate(db, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let ids: Vec<i32> = rows.iter().map(|f| f.id).collect();
        let mut step_counts: HashMap<i32, usize> = HashMap::new();
        if !ids.is_empty() {
            let steps = funnel_steps::Entity::find()
                .filter(funnel_steps::Column::FunnelId.is_in(ids))
                .all(db)
                .await?;
            for step in steps {
                *step_counts.entry(step.funnel_id).or_default() += 1;
            }
        }

        let funnels = rows
            .into_iter()
            .map(|f| FunnelSummary {
                step_count: step_counts.get(&f.id).copied().unwrap_or(0),
                id: f.id,
                name: f.name,
                description: f.description,
                is_active: f.is_active,
                created_at: f.created_at,
                updated_at: f.updated_at,
            })
            .collect();

        Ok(FunnelPage {
            funnels,
            total,
            page,
            page_size,
        })
    }

    /// Create a funnel and all of its steps in one transaction.
    pub async fn create_funnel(
        &self,
        request: CreateFunnelRequest,
    ) -> Result<FunnelDefinition, FunnelError> {
        validate_request(&request)?;

        let txn = self.db.begin().await?;

        let funnel = funnels::ActiveModel {
            name: Set(request.name.trim().to_string()),
            description: Set(clean_description(request.description)),
            is_active: Set(request.is_active.unwrap_or(true)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let steps = insert_steps(&txn, funnel.id, &request.steps).await?;
        txn.commit().await?;

        info!(
            "Created funnel {} '{}' with {} steps",
            funnel.id,
            funnel.name,
            steps.len()
        );
        definition_from_rows(funnel, steps)
    }

    /// Replace a funnel's fields and its whole step sequence.
    pub async fn replace_funnel(
        &self,
        funnel_id: i32,
        request: CreateFunnelRequest,
    ) -> Result<FunnelDefinition, FunnelError> {
        validate_request(&request)?;

        let txn = self.db.begin().await?;

        let existing = funnels::Entity::find_by_id(funnel_id)
            .one(&txn)
            .await?
            .ok_or(FunnelError::NotFound(funnel_id))?;

        let mut funnel: funnels::ActiveModel = existing.into();
        funnel.name = Set(request.name.trim().to_string());
        funnel.description = Set(clean_description(request.description));
        if let Some(active) = request.is_active {
            funnel.is_active = Set(active);
        }
        let funnel = funnel.update(&txn).await?;

        funnel_steps::Entity::delete_many()
            .filter(funnel_steps::Column::FunnelId.eq(funnel_id))
            .exec(&txn)
            .await?;
        let steps = insert_steps(&txn, funnel_id, &request.steps).await?;

        txn.commit().await?;

        info!("Replaced funnel {} with {} steps", funnel_id, steps.len());
        definition_from_rows(funnel, steps)
    }

    /// Remove a funnel and every step it owns.
    pub async fn delete_funnel(&self, funnel_id: i32) -> Result<(), FunnelError> {
        let txn = self.db.begin().await?;

        funnels::Entity::find_by_id(funnel_id)
            .one(&txn)
            .await?
            .ok_or(FunnelError::NotFound(funnel_id))?;

        let removed = funnel_steps::Entity::delete_many()
            .filter(funnel_steps::Column::FunnelId.eq(funnel_id))
            .exec(&txn)
            .await?;
        funnels::Entity::delete_by_id(funnel_id).exec(&txn).await?;

        txn.commit().await?;

        debug!(
            "Deleted funnel {} and {} steps",
            funnel_id, removed.rows_affected
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_database::test_utils::TestDatabase;

    fn steps(types: &[&str]) -> Vec<FunnelStepInput> {
        types
            .iter()
            .enumerate()
            .map(|(i, t)| FunnelStepInput {
                step_number: i as i32 + 1,
                event_type: ToString::to_string(t),
            })
            .collect()
    }

    fn request(name: &str, types: &[&str]) -> CreateFunnelRequest {
        CreateFunnelRequest {
            name: name.to_string(),
            description: None,
            is_active: None,
            steps: steps(types),
        }
    }

    async fn setup() -> anyhow::Result<(TestDatabase, FunnelService)> {
        let test_db = TestDatabase::new().await?;
        let service = FunnelService::new(test_db.connection_arc());
        Ok((test_db, service))
    }

    #[tokio::test]
    async fn test_create_and_get_funnel() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;

        let created = service
            .create_funnel(CreateFunnelRequest {
                description: Some("  Signup flow ".to_string()),
                ..request("  Signup ", &["page_view", "sign_up", "purchase"])
            })
            .await?;
        assert_eq!(created.name, "Signup");
        assert_eq!(created.description.as_deref(), Some("Signup flow"));
        assert!(created.is_active);

        let fetched = service.get_funnel(created.id).await?;
        assert_eq!(fetched, created);
        assert_eq!(
            fetched
                .steps
                .iter()
                .map(|s| (s.step_number, s.event_type.as_str()))
                .collect::<Vec<_>>(),
            vec![(1, "page_view"), (2, "sign_up"), (3, "purchase")]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_step_numbers_are_densified_on_write() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;

        let created = service
            .create_funnel(CreateFunnelRequest {
                name: "Sparse".to_string(),
                description: None,
                is_active: None,
                steps: vec![
                    FunnelStepInput {
                        step_number: 10,
                        event_type: "a".to_string(),
                    },
                    FunnelStepInput {
                        step_number: 20,
                        event_type: "b".to_string(),
                    },
                ],
            })
            .await?;

        let numbers: Vec<i32> = created.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;

        let blank_name = service.create_funnel(request(" ", &["a"])).await;
        assert!(matches!(blank_name, Err(FunnelError::Validation(_))));

        let no_steps = service.create_funnel(request("x", &[])).await;
        assert!(matches!(no_steps, Err(FunnelError::Validation(_))));

        let blank_event = service.create_funnel(request("x", &["a", " "])).await;
        assert!(matches!(blank_event, Err(FunnelError::Validation(_))));

        let mut out_of_order = request("x", &["a", "b"]);
        out_of_order.steps[1].step_number = 1;
        let result = service.create_funnel(out_of_order).await;
        assert!(matches!(result, Err(FunnelError::Validation(_))));

        let page = service.list_funnels(&PaginationParams::default(), None).await?;
        assert_eq!(page.total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_funnel_swaps_all_steps() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;
        let created = service.create_funnel(request("Old", &["a", "b", "c"])).await?;

        let replaced = service
            .replace_funnel(
                created.id,
                CreateFunnelRequest {
                    is_active: Some(false),
                    ..request("New", &["x", "y"])
                },
            )
            .await?;

        assert_eq!(replaced.name, "New");
        assert!(!replaced.is_active);
        assert_eq!(replaced.steps.len(), 2);
        assert!(replaced.updated_at >= created.updated_at);
        assert_eq!(replaced.created_at, created.created_at);

        let fetched = service.get_funnel(created.id).await?;
        assert_eq!(fetched.steps, replaced.steps);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_missing_funnel() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;
        let err = service
            .replace_funnel(99, request("x", &["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, FunnelError::NotFound(99)));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_funnel_and_steps() -> anyhow::Result<()> {
        let (test_db, service) = setup().await?;
        let created = service.create_funnel(request("Gone", &["a", "b"])).await?;

        service.delete_funnel(created.id).await?;

        assert!(matches!(
            service.get_funnel(created.id).await,
            Err(FunnelError::NotFound(_))
        ));
        assert!(test_db
            .query_sql("SELECT id FROM funnel_steps")
            .await?
            .is_empty());
        assert!(matches!(
            service.delete_funnel(created.id).await,
            Err(FunnelError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_funnels_paginates_and_filters() -> anyhow::Result<()> {
        let (_db, service) = setup().await?;
        for i in 0..3 {
            service
                .create_funnel(request(&format!("f{}", i), &["a", "b"]))
                .await?;
        }
        service
            .create_funnel(CreateFunnelRequest {
                is_active: Some(false),
                ..request("inactive", &["a"])
            })
            .await?;

        let page = service
            .list_funnels(&PaginationParams::new(1, 2), None)
            .await?;
        assert_eq!(page.total, 4);
        assert_eq!(page.funnels.len(), 2);
        assert_eq!(page.funnels[0].name, "f0");
        assert_eq!(page.funnels[0].step_count, 2);

        let inactive = service
            .list_funnels(&PaginationParams::default(), Some(false))
            .await?;
        assert_eq!(inactive.total, 1);
        assert_eq!(inactive.funnels[0].step_count, 1);
        Ok(())
    }

    async fn insert_raw_funnel(
        db: &DatabaseConnection,
        numbers: &[(i32, &str)],
    ) -> anyhow::Result<i32> {
        let funnel = funnels::ActiveModel {
            name: Set("raw".to_string()),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;

        for (number, event_type) in numbers {
            funnel_steps::ActiveModel {
                funnel_id: Set(funnel.id),
                step_number: Set(*number),
                event_type: Set(ToString::to_string(event_type)),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(funnel.id)
    }

    #[tokio::test]
    async fn test_stored_duplicate_step_numbers_are_rejected() -> anyhow::Result<()> {
        let (test_db, service) = setup().await?;
        let id = insert_raw_funnel(test_db.connection(), &[(1, "a"), (2, "b"), (2, "c")]).await?;

        let err = service.get_funnel(id).await.unwrap_err();
        assert!(matches!(err, FunnelError::InvalidDefinition { funnel_id, .. } if funnel_id == id));
        Ok(())
    }

    #[tokio::test]
    async fn test_stored_gaps_are_normalized() -> anyhow::Result<()> {
        let (test_db, service) = setup().await?;
        let id = insert_raw_funnel(test_db.connection(), &[(7, "c"), (2, "a"), (5, "b")]).await?;

        let definition = service.get_funnel(id).await?;
        assert_eq!(
            definition.steps,
            vec![
                FunnelStepDefinition {
                    step_number: 1,
                    event_type: "a".to_string()
                },
                FunnelStepDefinition {
                    step_number: 2,
                    event_type: "b".to_string()
                },
                FunnelStepDefinition {
                    step_number: 3,
                    event_type: "c".to_string()
                },
            ]
        );
        Ok(())
    }
}
