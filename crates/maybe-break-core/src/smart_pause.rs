//! Smart pause: suspend the break schedule while the user is away or
//! watching something fullscreen.
//!
//! The monitor only talks to [`BreakScheduler`] through its public commands
//! and queries. It pauses with [`PauseOrigin::Automatic`] and only ever
//! resumes pauses carrying that origin, so a pause the user asked for is
//! never undone behind their back.

use std::time::Duration;
use tracing::{debug, info};

use crate::clock::TimerId;
use crate::probe::EnvironmentProbe;
use crate::runtime::{Context, Wakeup};
use crate::scheduler::{BreakScheduler, PauseOrigin};
use crate::settings::Settings;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
const COOLDOWN_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
struct Cooldown {
    timer: TimerId,
    remaining: u64,
}

/// Whether the environment currently calls for a pause.
///
/// A probe error counts as `false`.
pub fn should_pause(settings: &Settings, probe: &dyn EnvironmentProbe) -> bool {
    if settings.smart_pause_idle_enabled {
        match probe.is_idle_beyond(settings.smart_pause_idle_threshold) {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => debug!(%err, "idle probe failed"),
        }
    }
    if settings.smart_pause_fullscreen_enabled {
        match probe.is_frontmost_fullscreen() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => debug!(%err, "fullscreen probe failed"),
        }
    }
    false
}

#[derive(Debug, Default)]
pub struct SmartPauseMonitor {
    poll: Option<TimerId>,
    cooldown: Option<Cooldown>,
}

impl SmartPauseMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.poll.is_some()
    }

    /// Seconds left before an automatic resume, while one is pending.
    pub fn cooldown_remaining(&self) -> Option<u64> {
        self.cooldown.map(|c| c.remaining)
    }

    /// Arm the repeating poll. Restarts it if already armed.
    pub fn start(&mut self, ctx: &mut Context<'_>) {
        if let Some(timer) = self.poll.take() {
            ctx.timers.cancel(timer);
        }
        self.poll = Some(
            ctx.timers
                .schedule_repeating(POLL_INTERVAL, Wakeup::SmartPausePoll),
        );
    }

    pub fn stop(&mut self, ctx: &mut Context<'_>) {
        if let Some(timer) = self.poll.take() {
            ctx.timers.cancel(timer);
        }
        self.cancel_cooldown(ctx);
    }

    /// Abandon a pending automatic resume.
    pub fn cancel_cooldown(&mut self, ctx: &mut Context<'_>) {
        if let Some(cooldown) = self.cooldown.take() {
            ctx.timers.cancel(cooldown.timer);
            debug!(remaining = cooldown.remaining, "smart pause cooldown canceled");
        }
    }

    pub fn on_poll(
        &mut self,
        timer: TimerId,
        scheduler: &mut BreakScheduler,
        probe: &dyn EnvironmentProbe,
        ctx: &mut Context<'_>,
    ) {
        if self.poll != Some(timer) {
            return;
        }
        let settings = ctx.settings();

        if should_pause(&settings, probe) {
            self.cancel_cooldown(ctx);
            if scheduler.is_running() && !scheduler.is_paused() && !scheduler.is_on_break() {
                info!("smart pause engaged");
                scheduler.pause_with_origin(PauseOrigin::Automatic, ctx);
            }
            return;
        }

        if scheduler.pause_origin() != Some(PauseOrigin::Automatic) || self.cooldown.is_some() {
            return;
        }
        if settings.smart_pause_cooldown == 0 {
            info!("smart pause released");
            scheduler.resume(ctx);
        } else {
            debug!(secs = settings.smart_pause_cooldown, "smart pause cooldown started");
            self.cooldown = Some(Cooldown {
                timer: ctx
                    .timers
                    .schedule_repeating(COOLDOWN_STEP, Wakeup::SmartPauseCooldown),
                remaining: settings.smart_pause_cooldown,
            });
        }
    }

    /// One cooldown second. The environment must stay clear for the whole
    /// window, otherwise the cooldown is dropped and the pause stays.
    pub fn on_cooldown_tick(
        &mut self,
        timer: TimerId,
        scheduler: &mut BreakScheduler,
        probe: &dyn EnvironmentProbe,
        ctx: &mut Context<'_>,
    ) {
        let Some(mut cooldown) = self.cooldown else {
            ctx.timers.cancel(timer);
            return;
        };
        if cooldown.timer != timer {
            ctx.timers.cancel(timer);
            return;
        }

        if scheduler.pause_origin() != Some(PauseOrigin::Automatic) {
            self.cancel_cooldown(ctx);
            return;
        }
        if should_pause(&ctx.settings(), probe) {
            self.cancel_cooldown(ctx);
            return;
        }

        cooldown.remaining = cooldown.remaining.saturating_sub(1);
        if cooldown.remaining > 0 {
            self.cooldown = Some(cooldown);
            return;
        }
        self.cancel_cooldown(ctx);
        info!("smart pause released after cooldown");
        scheduler.resume(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::probe::{ManualProbe, UnavailableProbe};

    struct Flaky;

    impl EnvironmentProbe for Flaky {
        fn is_idle_beyond(&self, _: u64) -> Result<bool, ProbeError> {
            Err(ProbeError::CommandFailed("no display".into()))
        }

        fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError> {
            Ok(true)
        }
    }

    #[test]
    fn disabled_signals_are_not_consulted() {
        let probe = ManualProbe::new();
        probe.set_idle(true);
        probe.set_fullscreen(true);
        let settings = Settings {
            smart_pause_idle_enabled: false,
            smart_pause_fullscreen_enabled: false,
            ..Settings::default()
        };
        assert!(!should_pause(&settings, &probe));
    }

    #[test]
    fn either_signal_triggers() {
        let probe = ManualProbe::new();
        let settings = Settings::default();
        assert!(!should_pause(&settings, &probe));
        probe.set_fullscreen(true);
        assert!(should_pause(&settings, &probe));
        probe.set_fullscreen(false);
        probe.set_idle(true);
        assert!(should_pause(&settings, &probe));
    }

    #[test]
    fn probe_errors_fail_open() {
        assert!(!should_pause(&Settings::default(), &UnavailableProbe));
        // A failing idle probe does not hide a working fullscreen probe.
        assert!(should_pause(&Settings::default(), &Flaky));
    }
}
