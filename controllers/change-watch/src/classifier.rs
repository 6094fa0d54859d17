//! Severity classification.

use crate::change::ChangeType;
use notify_client::{Reason, Status};

/// Subtypes that mark a failure condition
const DANGER_SUBTYPES: &[&str] = &["NodeNotReady", "NodeRebooted", "Backoff"];

/// Maps a change to its severity and lifecycle label.
///
/// `kind` is the subtype when one was derived, otherwise the kind name.
#[must_use]
pub fn classify(change_type: ChangeType, kind: &str) -> (Status, Reason) {
    match change_type {
        ChangeType::Create if DANGER_SUBTYPES.contains(&kind) => (Status::Danger, Reason::Created),
        ChangeType::Create => (Status::Normal, Reason::Created),
        ChangeType::Update if kind == "Backoff" => (Status::Danger, Reason::Updated),
        ChangeType::Update => (Status::Warning, Reason::Updated),
        ChangeType::Delete => (Status::Danger, Reason::Deleted),
    }
}

/// Derives the subtype of a cluster `Event` from its `reason` field.
#[must_use]
pub fn event_subtype(reason: &str) -> Option<&'static str> {
    match reason {
        "NodeReady" => Some("NodeReady"),
        "NodeNotReady" => Some("NodeNotReady"),
        "NodeRebooted" => Some("NodeRebooted"),
        "BackOff" | "Backoff" => Some("Backoff"),
        _ => None,
    }
}
