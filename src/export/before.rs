use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::workflow::BeforeAction;

/// Worker-side record for a pre-navigation action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkerAction {
    RemoveElement { selector: String },
    WaitTimeout { ms: u64 },
    WaitSelector { selector: String, timeout: u64 },
    WaitNetwork { timeout: u64 },
    Click { selector: String, wait_after: u64 },
    Scroll { times: u32, wait_after: u64 },
    Fill { selector: String, value: String, wait_after: u64 },
    SelectOption { selector: String, value: String, wait_after: u64 },
    Evaluate { script: String, wait_after: u64 },
    Screenshot { name: String, full_page: bool },
}

/// Lower one authoring action to its worker record.
///
/// Action types this build does not recognise become a zero-length wait so
/// that documents from a newer editor still compile.
pub fn lower_before_action(action: &BeforeAction) -> WorkerAction {
    match action {
        BeforeAction::RemoveElement { css_selector } => WorkerAction::RemoveElement {
            selector: css_selector.clone(),
        },
        BeforeAction::WaitTimeout { ms } => WorkerAction::WaitTimeout { ms: *ms },
        BeforeAction::WaitSelector { css_selector, timeout_ms } => WorkerAction::WaitSelector {
            selector: css_selector.clone(),
            timeout: *timeout_ms,
        },
        BeforeAction::WaitNetwork { timeout_ms } => WorkerAction::WaitNetwork { timeout: *timeout_ms },
        BeforeAction::Click { css_selector, wait_after_ms } => WorkerAction::Click {
            selector: css_selector.clone(),
            wait_after: *wait_after_ms,
        },
        BeforeAction::Scroll { times, wait_after_ms } => WorkerAction::Scroll {
            times: *times,
            wait_after: *wait_after_ms,
        },
        BeforeAction::Fill {
            css_selector,
            value,
            wait_after_ms,
        } => WorkerAction::Fill {
            selector: css_selector.clone(),
            value: value.clone(),
            wait_after: *wait_after_ms,
        },
        BeforeAction::SelectOption {
            css_selector,
            value,
            wait_after_ms,
        } => WorkerAction::SelectOption {
            selector: css_selector.clone(),
            value: value.clone(),
            wait_after: *wait_after_ms,
        },
        BeforeAction::Evaluate { script, wait_after_ms } => WorkerAction::Evaluate {
            script: script.clone(),
            wait_after: *wait_after_ms,
        },
        BeforeAction::Screenshot { name, full_page } => WorkerAction::Screenshot {
            name: name.clone(),
            full_page: *full_page,
        },
        // TODO: confirm with the worker owners whether unknown actions should
        // fail compilation instead of degrading to a no-op wait.
        BeforeAction::Unknown(raw) => {
            warn!(
                "Unrecognized before action {} lowered to a zero-duration wait",
                raw.get("type").and_then(|tag| tag.as_str()).unwrap_or("<untyped>")
            );
            WorkerAction::WaitTimeout { ms: 0 }
        }
    }
}

pub fn lower_before_actions(actions: &[BeforeAction]) -> Vec<WorkerAction> {
    actions.iter().map(lower_before_action).collect()
}
