//! Periodic wellness nudges (blink, posture), independent of the break
//! schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::clock::TimerId;
use crate::events::Event;
use crate::runtime::{Context, Wakeup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Blink,
    Posture,
}

impl ReminderKind {
    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::Blink => "Blink Reminder",
            ReminderKind::Posture => "Posture Check",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            ReminderKind::Blink => "Remember to blink! Keep your eyes hydrated.",
            ReminderKind::Posture => "Sit up straight and relax your shoulders.",
        }
    }
}

#[derive(Debug, Default)]
pub struct WellnessReminders {
    blink: Option<TimerId>,
    posture: Option<TimerId>,
}

impl WellnessReminders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self, kind: ReminderKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Arm every enabled reminder with its configured interval.
    pub fn start(&mut self, ctx: &mut Context<'_>) {
        self.stop(ctx);
        let settings = ctx.settings();
        let plan = [
            (
                ReminderKind::Blink,
                settings.blink_reminder_enabled,
                settings.blink_reminder_interval,
            ),
            (
                ReminderKind::Posture,
                settings.posture_reminder_enabled,
                settings.posture_reminder_interval,
            ),
        ];
        for (kind, enabled, every) in plan {
            if !enabled || every == 0 {
                continue;
            }
            let timer = ctx
                .timers
                .schedule_repeating(Duration::from_secs(every), Wakeup::Reminder(kind));
            *self.slot_mut(kind) = Some(timer);
        }
    }

    pub fn stop(&mut self, ctx: &mut Context<'_>) {
        for kind in [ReminderKind::Blink, ReminderKind::Posture] {
            if let Some(timer) = self.slot_mut(kind).take() {
                ctx.timers.cancel(timer);
            }
        }
    }

    /// Re-read settings; call after the reminder configuration changed.
    pub fn restart(&mut self, ctx: &mut Context<'_>) {
        self.start(ctx);
    }

    pub fn on_fire(&mut self, kind: ReminderKind, timer: TimerId, ctx: &mut Context<'_>) {
        if self.slot(kind) == Some(timer) {
            ctx.emit(Event::WellnessReminder { kind });
        } else {
            ctx.timers.cancel(timer);
        }
    }

    fn slot(&self, kind: ReminderKind) -> Option<TimerId> {
        match kind {
            ReminderKind::Blink => self.blink,
            ReminderKind::Posture => self.posture,
        }
    }

    fn slot_mut(&mut self, kind: ReminderKind) -> &mut Option<TimerId> {
        match kind {
            ReminderKind::Blink => &mut self.blink,
            ReminderKind::Posture => &mut self.posture,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Timers;
    use crate::settings::Settings;

    fn with_ctx<R>(
        timers: &mut Timers,
        settings: Settings,
        events: &mut Vec<Event>,
        f: impl FnOnce(&mut Context<'_>) -> R,
    ) -> R {
        let mut ctx = Context {
            timers,
            settings: &settings,
            events,
        };
        f(&mut ctx)
    }

    #[test]
    fn zero_interval_is_never_armed() {
        let mut timers = Timers::new();
        let mut events = Vec::new();
        let mut reminders = WellnessReminders::new();
        let settings = Settings {
            blink_reminder_enabled: true,
            blink_reminder_interval: 0,
            ..Settings::default()
        };
        with_ctx(&mut timers, settings, &mut events, |ctx| reminders.start(ctx));
        assert!(!reminders.is_armed(ReminderKind::Blink));
        assert!(timers.is_empty());
    }

    #[test]
    fn restart_drops_disabled_reminder() {
        let mut timers = Timers::new();
        let mut events = Vec::new();
        let mut reminders = WellnessReminders::new();
        let on = Settings {
            posture_reminder_enabled: true,
            ..Settings::default()
        };
        with_ctx(&mut timers, on, &mut events, |ctx| reminders.start(ctx));
        assert!(reminders.is_armed(ReminderKind::Posture));

        with_ctx(&mut timers, Settings::default(), &mut events, |ctx| {
            reminders.restart(ctx)
        });
        assert!(!reminders.is_armed(ReminderKind::Posture));
        assert!(timers.is_empty());
    }

    #[test]
    fn stale_firing_is_silent() {
        let mut timers = Timers::new();
        let mut events = Vec::new();
        let mut reminders = WellnessReminders::new();
        let on = Settings {
            blink_reminder_enabled: true,
            ..Settings::default()
        };
        with_ctx(&mut timers, on, &mut events, |ctx| reminders.start(ctx));
        let (timer, _) = timers.pop_due(std::time::Duration::from_secs(600)).unwrap();

        with_ctx(&mut timers, on, &mut events, |ctx| {
            reminders.stop(ctx);
            reminders.on_fire(ReminderKind::Blink, timer, ctx);
        });
        assert!(events.is_empty());
        assert!(timers.is_empty());
    }

    #[test]
    fn titles_and_bodies() {
        assert_eq!(ReminderKind::Blink.title(), "Blink Reminder");
        assert!(ReminderKind::Posture.body().contains("shoulders"));
    }
}
