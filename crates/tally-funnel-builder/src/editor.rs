use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tally_analytics_funnels::{CreateFunnelRequest, FunnelDefinition, FunnelStepInput};
use tracing::{debug, info};

use crate::confirm::{ConfirmDelete, DeleteOutcome};
use crate::draft::{FunnelStepDraft, StepId, StepKind, UtmOverrides};
use crate::error::{EditorError, MissingField, ValidationError};
use crate::keywords::DEFAULT_MAX_KEYWORDS;
use crate::metadata::BasicMetadata;
use crate::sink::FunnelSink;
use crate::templates::FunnelTemplate;

/// Limits applied by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EditorOptions {
    pub max_keywords: usize,
    pub max_steps: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            max_keywords: DEFAULT_MAX_KEYWORDS,
            max_steps: 20,
        }
    }
}

/// Ad-specific changes. Only valid for ad-click steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdClickEdit {
    pub ad_type: Option<String>,
    pub channel: Option<String>,
    pub creative_format: Option<String>,
    /// Replaces the whole keyword list when present
    pub keywords: Option<Vec<String>>,
}

/// Partial update of a step. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepEdit {
    pub name: Option<String>,
    pub tracked_event_name: Option<String>,
    pub required: Option<bool>,
    pub utm: Option<UtmOverrides>,
    pub ad: Option<AdClickEdit>,
}

/// Editing session for one funnel's step list.
///
/// Steps live in an id-keyed arena; `order` is the authoritative sequence.
/// The two always hold the same set of ids.
#[derive(Debug, Clone, Default)]
pub struct FunnelEditor {
    steps: HashMap<StepId, FunnelStepDraft>,
    order: Vec<StepId>,
    options: EditorOptions,
}

fn non_blank(value: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::BlankValue { field })
    } else {
        Ok(trimmed.to_string())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl FunnelEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            steps: HashMap::new(),
            order: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    /// Start over, either empty or from a template's steps. A template longer
    /// than the step limit is rejected and the current draft is kept.
    pub fn initialize(&mut self, template: Option<&FunnelTemplate>) -> Result<(), EditorError> {
        if let Some(template) = template {
            if template.steps.len() > self.options.max_steps {
                return Err(ValidationError::StepLimitExceeded {
                    max: self.options.max_steps,
                }
                .into());
            }
        }

        self.steps.clear();
        self.order.clear();

        if let Some(template) = template {
            for step_type in template.steps {
                self.push(FunnelStepDraft::new(StepKind::from_type(
                    step_type,
                    self.options.max_keywords,
                )));
            }
            info!(
                "Initialized funnel editor from template '{}' with {} steps",
                template.id,
                self.order.len()
            );
        }
        Ok(())
    }

    fn push(&mut self, draft: FunnelStepDraft) -> StepId {
        let id = draft.id;
        self.order.push(id);
        self.steps.insert(id, draft);
        id
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Steps in funnel order
    pub fn steps(&self) -> impl Iterator<Item = &FunnelStepDraft> + '_ {
        self.order.iter().filter_map(|id| self.steps.get(id))
    }

    pub fn step(&self, id: StepId) -> Option<&FunnelStepDraft> {
        self.steps.get(&id)
    }

    pub fn ids(&self) -> &[StepId] {
        &self.order
    }

    pub fn position(&self, id: StepId) -> Option<usize> {
        self.order.iter().position(|candidate| *candidate == id)
    }

    fn require_position(&self, id: StepId) -> Result<usize, EditorError> {
        self.position(id).ok_or(EditorError::StepNotFound(id))
    }

    /// Append a step of the given type with catalogue defaults.
    pub fn add_step(&mut self, step_type: &str) -> Result<StepId, EditorError> {
        let step_type = step_type.trim();
        if step_type.is_empty() {
            return Err(ValidationError::EmptyStepType.into());
        }
        if self.order.len() >= self.options.max_steps {
            return Err(ValidationError::StepLimitExceeded {
                max: self.options.max_steps,
            }
            .into());
        }

        let draft =
            FunnelStepDraft::new(StepKind::from_type(step_type, self.options.max_keywords));
        let id = self.push(draft);
        debug!("Added {} step {} at position {}", step_type, id, self.order.len());
        Ok(id)
    }

    /// Apply an edit. Either every change lands or none does.
    pub fn edit_step(&mut self, id: StepId, edit: StepEdit) -> Result<(), EditorError> {
        let current = self.steps.get(&id).ok_or(EditorError::StepNotFound(id))?;
        let mut updated = current.clone();

        if let Some(name) = edit.name {
            updated.name = non_blank(name, "name")?;
        }
        if let Some(event) = edit.tracked_event_name {
            updated.tracked_event_name = non_blank(event, "tracked_event_name")?;
        }
        if let Some(required) = edit.required {
            updated.required = required;
        }
        if let Some(utm) = edit.utm {
            updated.utm = UtmOverrides {
                campaign: clean(utm.campaign),
                source: clean(utm.source),
                medium: clean(utm.medium),
            };
        }
        if let Some(ad) = edit.ad {
            let step_type = updated.step_type().to_string();
            let StepKind::AdClick(config) = &mut updated.kind else {
                return Err(ValidationError::AdFieldsNotSupported { step_type }.into());
            };

            if let Some(ad_type) = ad.ad_type {
                config.ad_type = clean(Some(ad_type));
            }
            if let Some(channel) = ad.channel {
                config.channel = clean(Some(channel));
            }
            if let Some(format) = ad.creative_format {
                config.creative_format = clean(Some(format));
            }
            if let Some(keywords) = ad.keywords {
                config.keywords = config.keywords.try_replace(keywords)?;
            }
        }

        self.steps.insert(id, updated);
        debug!("Edited step {}", id);
        Ok(())
    }

    /// Add one keyword to an ad-click step.
    pub fn add_keyword(&mut self, id: StepId, keyword: &str) -> Result<(), EditorError> {
        let step = self.steps.get_mut(&id).ok_or(EditorError::StepNotFound(id))?;
        let step_type = step.step_type().to_string();
        match &mut step.kind {
            StepKind::AdClick(config) => Ok(config.keywords.add(keyword)?),
            _ => Err(ValidationError::AdFieldsNotSupported { step_type }.into()),
        }
    }

    /// Remove a step after the confirmation port agrees.
    pub fn delete_step(
        &mut self,
        id: StepId,
        confirm: &dyn ConfirmDelete,
    ) -> Result<DeleteOutcome, EditorError> {
        let position = self.require_position(id)?;
        let step = self.steps.get(&id).ok_or(EditorError::StepNotFound(id))?;

        if !confirm.confirm_delete(step) {
            debug!("Deletion of step {} cancelled", id);
            return Ok(DeleteOutcome::Cancelled);
        }

        self.order.remove(position);
        let removed = self.steps.remove(&id).ok_or(EditorError::StepNotFound(id))?;
        debug!("Deleted step {} from position {}", id, position + 1);
        Ok(DeleteOutcome::Deleted(removed))
    }

    /// Delete the steps at the given 1-based positions, highest first so the
    /// remaining positions stay valid. Every position is checked before any
    /// step is touched. Returns how many steps the port let go.
    pub fn remove_positions(
        &mut self,
        positions: &[usize],
        confirm: &dyn ConfirmDelete,
    ) -> Result<usize, EditorError> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let len = self.order.len();
        if let Some(&position) = positions.iter().find(|&&p| p == 0 || p > len) {
            return Err(ValidationError::NoStepAtPosition { position, len }.into());
        }

        let mut removed = 0;
        for position in positions.into_iter().rev() {
            let id = self.order[position - 1];
            match self.delete_step(id, confirm)? {
                DeleteOutcome::Deleted(_) => removed += 1,
                DeleteOutcome::Cancelled => debug!("Kept step at position {}", position),
            }
        }
        Ok(removed)
    }

    /// Move a step to `target_index` (0-based). Returns whether the order
    /// changed.
    pub fn move_step(&mut self, id: StepId, target_index: usize) -> Result<bool, EditorError> {
        let from = self.require_position(id)?;
        if target_index >= self.order.len() {
            return Err(ValidationError::InvalidReorder {
                target_index,
                len: self.order.len(),
            }
            .into());
        }
        if from == target_index {
            return Ok(false);
        }

        let moved = self.order.remove(from);
        self.order.insert(target_index, moved);
        debug!("Moved step {} from {} to {}", id, from, target_index);
        Ok(true)
    }

    /// Drag-and-drop form of [`move_step`](Self::move_step): `active` takes
    /// the position currently held by `over`.
    pub fn move_step_over(&mut self, active: StepId, over: StepId) -> Result<bool, EditorError> {
        self.require_position(active)?;
        let target = self.require_position(over)?;
        if active == over {
            return Ok(false);
        }
        self.move_step(active, target)
    }

    /// Validate everything at once and flatten the steps into a request.
    pub fn save_funnel(&self, metadata: &BasicMetadata) -> Result<CreateFunnelRequest, EditorError> {
        let mut missing = metadata.missing_fields();
        if self.order.is_empty() {
            missing.push(MissingField::Steps);
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        let steps = self
            .steps()
            .enumerate()
            .map(|(index, step)| FunnelStepInput {
                step_number: index as i32 + 1,
                event_type: step.tracked_event_name.clone(),
            })
            .collect();

        Ok(CreateFunnelRequest {
            name: metadata.name.trim().to_string(),
            description: clean(metadata.description.clone()),
            is_active: Some(true),
            steps,
        })
    }

    /// Save and hand the request to the store.
    pub async fn persist<S>(
        &self,
        metadata: &BasicMetadata,
        sink: &S,
    ) -> Result<FunnelDefinition, EditorError>
    where
        S: FunnelSink + ?Sized,
    {
        let request = self.save_funnel(metadata)?;
        let stored = sink.create_funnel(request).await?;
        info!(
            "Persisted funnel {} '{}' with {} steps",
            stored.id,
            stored.name,
            stored.steps.len()
        );
        Ok(stored)
    }
}
