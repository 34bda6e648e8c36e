//! # maybe-break core library
//!
//! Break-reminder logic for the `maybe-break` daemon: a work/break state
//! machine, a smart pause monitor that reacts to idle input and fullscreen
//! apps, and periodic wellness reminders. The CLI binary is a thin shell
//! that owns a real-time loop over the same core.
//!
//! ## Architecture
//!
//! - **Clock**: a virtual timer queue. Nothing in the core reads wall time;
//!   the caller advances the queue, so every behavior is testable
//!   deterministically
//! - **Scheduler**: the work / heads-up / break / paused state machine
//! - **Smart pause**: polls an [`EnvironmentProbe`] and pauses or resumes
//!   the scheduler, never overriding a manual pause
//! - **Runtime**: composition root and single execution context
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Runtime`]: owns every component and dispatches timer wakeups
//! - [`BreakScheduler`]: break state machine
//! - [`SmartPauseMonitor`]: automatic pause/resume
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod format;
pub mod probe;
pub mod reminders;
pub mod runtime;
pub mod scheduler;
pub mod settings;
pub mod smart_pause;
pub mod storage;

pub use clock::{TimerId, TimerQueue};
pub use error::{ConfigError, CoreError, ParseCommandError, ProbeError, ValidationError};
pub use events::{Event, EventSink};
pub use format::{format_clock, format_compact, heads_up_title};
pub use probe::{EnvironmentProbe, ManualProbe, UnavailableProbe};
pub use reminders::{ReminderKind, WellnessReminders};
pub use runtime::{parse_duration_secs, Command, Context, Runtime, Timers, Wakeup};
pub use scheduler::{is_long_break, BreakScheduler, PauseOrigin, Phase, SavedPhase};
pub use settings::{Settings, SettingsSource, SharedSettings};
pub use smart_pause::{should_pause, SmartPauseMonitor, POLL_INTERVAL};
pub use storage::{data_dir, Config};
