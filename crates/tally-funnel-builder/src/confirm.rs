//! Confirmation port consulted before a step is deleted

use crate::draft::FunnelStepDraft;

/// Asks whoever drives the editor whether a step may be removed.
pub trait ConfirmDelete {
    fn confirm_delete(&self, step: &FunnelStepDraft) -> bool;
}

/// Approves every deletion. For non-interactive callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceDelete;

impl ConfirmDelete for ForceDelete {
    fn confirm_delete(&self, _step: &FunnelStepDraft) -> bool {
        true
    }
}

impl<F> ConfirmDelete for F
where
    F: Fn(&FunnelStepDraft) -> bool,
{
    fn confirm_delete(&self, step: &FunnelStepDraft) -> bool {
        self(step)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The step was removed; later steps moved up by one.
    Deleted(FunnelStepDraft),
    /// The port declined; nothing changed.
    Cancelled,
}
