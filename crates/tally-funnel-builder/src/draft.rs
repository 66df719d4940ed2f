//! Draft steps held by the editor before a funnel is saved

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::catalog::{self, StandardStep, AD_CLICK};
use crate::keywords::KeywordSet;

/// Identifier of a draft step, unique within one editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StepId(Uuid);

impl StepId {
    pub fn new() -> Self {
        StepId(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayMeta {
    pub icon: String,
    pub color: String,
}

/// Campaign attribution overrides, available on every step kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtmOverrides {
    pub campaign: Option<String>,
    pub source: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdClickConfig {
    pub ad_type: Option<String>,
    pub channel: Option<String>,
    pub creative_format: Option<String>,
    pub keywords: KeywordSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum StepKind {
    AdClick(AdClickConfig),
    Standard(#[serde(serialize_with = "serialize_standard")] StandardStep),
    Custom(String),
}

fn serialize_standard<S>(step: &StandardStep, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(step.as_str())
}

impl StepKind {
    /// Resolve a type string. Anything not catalogued becomes `Custom`.
    pub fn from_type(step_type: &str, max_keywords: usize) -> Self {
        if step_type == AD_CLICK {
            return StepKind::AdClick(AdClickConfig {
                keywords: KeywordSet::with_limit(max_keywords),
                ..Default::default()
            });
        }
        match step_type.parse::<StandardStep>() {
            Ok(standard) => StepKind::Standard(standard),
            Err(()) => StepKind::Custom(step_type.to_string()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            StepKind::AdClick(_) => AD_CLICK,
            StepKind::Standard(step) => step.as_str(),
            StepKind::Custom(name) => name,
        }
    }
}

/// One step of a funnel being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStepDraft {
    pub id: StepId,
    pub kind: StepKind,
    pub name: String,
    /// Event type this step will match once saved
    pub tracked_event_name: String,
    pub display: DisplayMeta,
    pub required: bool,
    pub utm: UtmOverrides,
}

impl FunnelStepDraft {
    /// Fresh step with catalogue defaults for its kind.
    pub fn new(kind: StepKind) -> Self {
        let step_type = kind.type_name().to_string();
        let (name, display) = match catalog::lookup(&step_type) {
            Some(info) => (
                info.name.to_string(),
                DisplayMeta {
                    icon: info.icon.to_string(),
                    color: info.color.to_string(),
                },
            ),
            None => (
                humanize(&step_type),
                DisplayMeta {
                    icon: "circle".to_string(),
                    color: "#6B7280".to_string(),
                },
            ),
        };

        Self {
            id: StepId::new(),
            tracked_event_name: catalog::default_event_name(&step_type),
            kind,
            name,
            display,
            required: true,
            utm: UtmOverrides::default(),
        }
    }

    pub fn step_type(&self) -> &str {
        self.kind.type_name()
    }
}

/// `webinar_joined` -> `Webinar Joined`
fn humanize(step_type: &str) -> String {
    step_type
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
