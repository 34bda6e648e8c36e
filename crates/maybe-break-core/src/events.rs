use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::reminders::ReminderKind;
use crate::scheduler::{PauseOrigin, Phase};

/// Every lifecycle transition produces exactly one Event.
/// The UI layer renders overlays and plays sounds from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The final stretch of a work period began.
    HeadsUpStarted {
        remaining_secs: u64,
    },
    HeadsUpEnded,
    BreakStarted {
        is_long: bool,
        duration_secs: u64,
    },
    BreakEnded,
    WellnessReminder {
        kind: ReminderKind,
    },
    StateSnapshot {
        phase: Phase,
        running: bool,
        remaining_secs: u64,
        remaining_display: String,
        short_breaks_taken: u32,
        pause_origin: Option<PauseOrigin>,
        /// Seconds until a time-bounded pause resumes itself.
        resumes_in_secs: Option<u64>,
        /// Seconds left before smart pause resumes the schedule.
        cooldown_secs: Option<u64>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Lifecycle events, as opposed to snapshots and reminders.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Event::HeadsUpStarted { .. }
                | Event::HeadsUpEnded
                | Event::BreakStarted { .. }
                | Event::BreakEnded
        )
    }
}

/// Receives events synchronously, after the state change they describe.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// Recording sink.
impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Channel sink. A closed receiver drops events.
impl EventSink for UnboundedSender<Event> {
    fn emit(&mut self, event: Event) {
        if self.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}
