//! Funnel step editor
//!
//! An in-memory draft of an ordered step list. Steps are added from a
//! catalogue of known types or seeded from a template, edited, reordered and
//! deleted locally, then flattened into a funnel create request on save.
//! Nothing touches storage until [`FunnelEditor::persist`] hands the request
//! to a [`FunnelSink`].

pub mod catalog;
pub mod confirm;
pub mod draft;
pub mod editor;
pub mod error;
pub mod handlers;
pub mod keywords;
pub mod metadata;
pub mod plugin;
pub mod sink;
pub mod templates;

pub use catalog::{default_event_name, StandardStep, StepTypeInfo};
pub use confirm::{ConfirmDelete, DeleteOutcome, ForceDelete};
pub use draft::{AdClickConfig, DisplayMeta, FunnelStepDraft, StepId, StepKind, UtmOverrides};
pub use editor::{AdClickEdit, EditorOptions, FunnelEditor, StepEdit};
pub use error::{EditorError, MissingField, ValidationError};
pub use keywords::{KeywordError, KeywordSet};
pub use metadata::BasicMetadata;
pub use plugin::FunnelBuilderPlugin;
pub use sink::FunnelSink;
pub use templates::{find_template, FunnelTemplate, TEMPLATES};
