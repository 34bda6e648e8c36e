//! Live settings snapshot consumed by the scheduler and the monitors.
//!
//! Components never cache these values: they ask their [`SettingsSource`]
//! for a fresh snapshot whenever a duration is needed, so edits take effect
//! at the next phase transition without a restart.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// All durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub short_break_interval: u64,
    pub short_break_duration: u64,
    pub long_break_interval: u64,
    pub long_break_duration: u64,
    pub long_breaks_enabled: bool,
    pub heads_up_duration: u64,
    pub smart_pause_idle_enabled: bool,
    pub smart_pause_idle_threshold: u64,
    pub smart_pause_fullscreen_enabled: bool,
    pub smart_pause_cooldown: u64,
    pub blink_reminder_enabled: bool,
    pub blink_reminder_interval: u64,
    pub posture_reminder_enabled: bool,
    pub posture_reminder_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            short_break_interval: 20 * 60,
            short_break_duration: 20,
            long_break_interval: 60 * 60,
            long_break_duration: 5 * 60,
            long_breaks_enabled: true,
            heads_up_duration: 30,
            smart_pause_idle_enabled: true,
            smart_pause_idle_threshold: 5 * 60,
            smart_pause_fullscreen_enabled: true,
            smart_pause_cooldown: 2 * 60,
            blink_reminder_enabled: false,
            blink_reminder_interval: 10 * 60,
            posture_reminder_enabled: false,
            posture_reminder_interval: 30 * 60,
        }
    }
}

impl Settings {
    /// How many break slots make up one long-break cycle.
    ///
    /// Never zero: a zero or oversized short interval collapses to 1.
    pub fn long_break_ratio(&self) -> u64 {
        if self.short_break_interval == 0 {
            return 1;
        }
        (self.long_break_interval / self.short_break_interval).max(1)
    }
}

/// Read-only provider of the current settings.
pub trait SettingsSource {
    fn settings(&self) -> Settings;
}

impl SettingsSource for Settings {
    fn settings(&self) -> Settings {
        *self
    }
}

/// Settings shared between the runtime and whoever edits them.
///
/// Cloning yields another handle to the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings(Arc<RwLock<Settings>>);

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    /// Replace the snapshot. Readers see it on their next query.
    pub fn replace(&self, settings: Settings) {
        match self.0.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    /// Edit the snapshot in place.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) {
        match self.0.write() {
            Ok(mut guard) => edit(&mut *guard),
            Err(poisoned) => edit(&mut *poisoned.into_inner()),
        }
    }
}

impl SettingsSource for SharedSettings {
    fn settings(&self) -> Settings {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
