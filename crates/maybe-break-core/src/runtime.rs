//! Composition root.
//!
//! [`Runtime`] owns the timer queue, the break scheduler, the smart pause
//! monitor and the wellness reminders, plus the injected settings source,
//! environment probe and event sink. Every timer firing and every external
//! command goes through `&mut Runtime`, which makes it the single execution
//! context: a tick can never interleave with a pause or a resume.
//!
//! ## Usage
//!
//! ```
//! use maybe_break_core::{Event, ManualProbe, Runtime, Settings};
//!
//! let settings = Settings { short_break_interval: 60, heads_up_duration: 10, ..Settings::default() };
//! let mut rt = Runtime::new(settings, ManualProbe::new(), Vec::<Event>::new());
//! rt.boot();
//! rt.advance_secs(60);
//! assert!(rt.scheduler().is_on_break());
//! ```

use chrono::Utc;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::clock::{TimerId, TimerQueue};
use crate::error::ParseCommandError;
use crate::events::{Event, EventSink};
use crate::format::format_clock;
use crate::probe::EnvironmentProbe;
use crate::reminders::{ReminderKind, WellnessReminders};
use crate::scheduler::{BreakScheduler, PauseOrigin};
use crate::settings::{Settings, SettingsSource};
use crate::smart_pause::SmartPauseMonitor;

/// What a timer wakes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// One-second work/break countdown step.
    Countdown,
    /// End of a `pause_for` window.
    DeferredResume,
    SmartPausePoll,
    SmartPauseCooldown,
    Reminder(ReminderKind),
}

pub type Timers = TimerQueue<Wakeup>;

/// Borrowed services handed to components for the duration of one command
/// or one timer firing.
pub struct Context<'a> {
    pub timers: &'a mut Timers,
    pub settings: &'a dyn SettingsSource,
    pub events: &'a mut dyn EventSink,
}

impl Context<'_> {
    /// Fresh settings snapshot.
    pub fn settings(&self) -> Settings {
        self.settings.settings()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.emit(event);
    }
}

/// User-facing commands, as typed on the daemon's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Pause,
    Resume,
    PauseFor(u64),
    AddTime(u64),
    SkipBreak,
    Postpone(u64),
    StartBreakNow,
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or(ParseCommandError::Empty)?;
        let mut secs = |name: &'static str| -> Result<u64, ParseCommandError> {
            let arg = words
                .next()
                .ok_or(ParseCommandError::MissingArgument(name))?;
            parse_duration_secs(arg)
        };

        match verb.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "pause-for" | "pause_for" => Ok(Command::PauseFor(secs("pause-for")?)),
            "add" | "add-time" | "add_time" => Ok(Command::AddTime(secs("add")?)),
            "skip" | "skip-break" | "skip_break" => Ok(Command::SkipBreak),
            "postpone" => Ok(Command::Postpone(secs("postpone")?)),
            "break-now" | "break_now" | "start-break-now" => Ok(Command::StartBreakNow),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

/// `90`, `90s`, `5m`, `1h` to seconds.
pub fn parse_duration_secs(raw: &str) -> Result<u64, ParseCommandError> {
    let invalid = || ParseCommandError::InvalidDuration(raw.to_string());
    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, ""),
    };
    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let factor = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        _ => return Err(invalid()),
    };
    value.checked_mul(factor).ok_or_else(invalid)
}

pub struct Runtime<S, P, E> {
    timers: Timers,
    scheduler: BreakScheduler,
    monitor: SmartPauseMonitor,
    reminders: WellnessReminders,
    settings: S,
    probe: P,
    events: E,
}

impl<S, P, E> Runtime<S, P, E>
where
    S: SettingsSource,
    P: EnvironmentProbe,
    E: EventSink,
{
    /// Nothing is armed until [`boot`](Self::boot).
    pub fn new(settings: S, probe: P, events: E) -> Self {
        Self {
            timers: Timers::new(),
            scheduler: BreakScheduler::new(),
            monitor: SmartPauseMonitor::new(),
            reminders: WellnessReminders::new(),
            settings,
            probe,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn scheduler(&self) -> &BreakScheduler {
        &self.scheduler
    }

    pub fn monitor(&self) -> &SmartPauseMonitor {
        &self.monitor
    }

    pub fn reminders(&self) -> &WellnessReminders {
        &self.reminders
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn snapshot(&self) -> Event {
        let scheduler = &self.scheduler;
        let remaining = scheduler.remaining();
        Event::StateSnapshot {
            phase: scheduler.phase(),
            running: scheduler.is_running(),
            remaining_secs: remaining,
            remaining_display: format_clock(remaining),
            short_breaks_taken: scheduler.short_breaks_taken(),
            pause_origin: scheduler.pause_origin(),
            resumes_in_secs: scheduler
                .deferred_resume_at()
                .map(|at| at.saturating_sub(self.timers.now()).as_secs()),
            cooldown_secs: self.monitor.cooldown_remaining(),
            at: Utc::now(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the schedule, the smart pause poll and the reminders.
    pub fn boot(&mut self) {
        let (mut ctx, scheduler, monitor, reminders, _) = self.parts();
        scheduler.start(&mut ctx);
        monitor.start(&mut ctx);
        reminders.start(&mut ctx);
    }

    /// Stop everything; no timer stays armed.
    pub fn shutdown(&mut self) {
        let (mut ctx, scheduler, monitor, reminders, _) = self.parts();
        monitor.stop(&mut ctx);
        reminders.stop(&mut ctx);
        scheduler.stop(&mut ctx);
    }

    pub fn restart_reminders(&mut self) {
        let (mut ctx, _, _, reminders, _) = self.parts();
        reminders.restart(&mut ctx);
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn apply(&mut self, command: Command) -> bool {
        debug!(?command, "command");
        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::PauseFor(secs) => self.pause_for(secs),
            Command::AddTime(secs) => self.add_time(secs),
            Command::SkipBreak => self.skip_break(),
            Command::Postpone(secs) => self.postpone(secs),
            Command::StartBreakNow => self.start_break_now(),
        }
    }

    pub fn start(&mut self) -> bool {
        self.command(|s, ctx| s.start(ctx))
    }

    pub fn stop(&mut self) -> bool {
        self.command(|s, ctx| s.stop(ctx))
    }

    pub fn pause(&mut self) -> bool {
        self.command(|s, ctx| s.pause(ctx))
    }

    pub fn resume(&mut self) -> bool {
        self.command(|s, ctx| s.resume(ctx))
    }

    pub fn pause_for(&mut self, secs: u64) -> bool {
        self.command(|s, ctx| s.pause_for(secs, ctx))
    }

    pub fn add_time(&mut self, secs: u64) -> bool {
        self.command(|s, ctx| s.add_time(secs, ctx))
    }

    pub fn skip_break(&mut self) -> bool {
        self.command(|s, ctx| s.skip_break(ctx))
    }

    pub fn postpone(&mut self, secs: u64) -> bool {
        self.command(|s, ctx| s.postpone(secs, ctx))
    }

    pub fn start_break_now(&mut self) -> bool {
        self.command(|s, ctx| s.start_break_now(ctx))
    }

    // ── Time ─────────────────────────────────────────────────────────

    /// Fire every timer due within `by`, in deadline order, then move the
    /// clock to the end of the window.
    pub fn advance(&mut self, by: Duration) {
        let target = self.timers.now().saturating_add(by);
        while let Some((timer, wakeup)) = self.timers.pop_due(target) {
            self.dispatch(timer, wakeup);
        }
        self.timers.advance_to(target);
    }

    pub fn advance_secs(&mut self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn parts(
        &mut self,
    ) -> (
        Context<'_>,
        &mut BreakScheduler,
        &mut SmartPauseMonitor,
        &mut WellnessReminders,
        &P,
    ) {
        (
            Context {
                timers: &mut self.timers,
                settings: &self.settings,
                events: &mut self.events,
            },
            &mut self.scheduler,
            &mut self.monitor,
            &mut self.reminders,
            &self.probe,
        )
    }

    /// Run a scheduler command. A pending smart pause cooldown only survives
    /// while the scheduler still holds an automatic pause.
    fn command(
        &mut self,
        f: impl FnOnce(&mut BreakScheduler, &mut Context<'_>) -> bool,
    ) -> bool {
        let (mut ctx, scheduler, monitor, _, _) = self.parts();
        let applied = f(scheduler, &mut ctx);
        if scheduler.pause_origin() != Some(PauseOrigin::Automatic) {
            monitor.cancel_cooldown(&mut ctx);
        }
        applied
    }

    fn dispatch(&mut self, timer: TimerId, wakeup: Wakeup) {
        let (mut ctx, scheduler, monitor, reminders, probe) = self.parts();
        match wakeup {
            Wakeup::Countdown => scheduler.on_countdown(timer, &mut ctx),
            Wakeup::DeferredResume => scheduler.on_deferred_resume(timer, &mut ctx),
            Wakeup::SmartPausePoll => monitor.on_poll(timer, scheduler, probe, &mut ctx),
            Wakeup::SmartPauseCooldown => {
                monitor.on_cooldown_tick(timer, scheduler, probe, &mut ctx)
            }
            Wakeup::Reminder(kind) => reminders.on_fire(kind, timer, &mut ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ManualProbe;
    use crate::scheduler::Phase;

    fn runtime(settings: Settings) -> Runtime<Settings, ManualProbe, Vec<Event>> {
        Runtime::new(settings, ManualProbe::new(), Vec::new())
    }

    #[test]
    fn parses_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!("  Pause ".parse::<Command>().unwrap(), Command::Pause);
        assert_eq!(
            "pause-for 5m".parse::<Command>().unwrap(),
            Command::PauseFor(300)
        );
        assert_eq!("add 120".parse::<Command>().unwrap(), Command::AddTime(120));
        assert_eq!(
            "postpone 90s".parse::<Command>().unwrap(),
            Command::Postpone(90)
        );
        assert_eq!(
            "break-now".parse::<Command>().unwrap(),
            Command::StartBreakNow
        );
        assert_eq!("skip".parse::<Command>().unwrap(), Command::SkipBreak);
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(matches!(
            "".parse::<Command>(),
            Err(ParseCommandError::Empty)
        ));
        assert!(matches!(
            "dance".parse::<Command>(),
            Err(ParseCommandError::Unknown(_))
        ));
        assert!(matches!(
            "postpone".parse::<Command>(),
            Err(ParseCommandError::MissingArgument("postpone"))
        ));
        assert!(matches!(
            "add 5x".parse::<Command>(),
            Err(ParseCommandError::InvalidDuration(_))
        ));
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_secs("45").unwrap(), 45);
        assert_eq!(parse_duration_secs("2h").unwrap(), 7200);
        assert!(parse_duration_secs("m").is_err());
        assert!(parse_duration_secs("-3").is_err());
    }

    #[test]
    fn boot_arms_countdown_and_poll() {
        let mut rt = runtime(Settings::default());
        assert_eq!(rt.pending_timers(), 0);
        rt.boot();
        assert!(rt.scheduler().is_running());
        assert!(rt.monitor().is_active());
        assert_eq!(rt.pending_timers(), 2);

        rt.shutdown();
        assert_eq!(rt.pending_timers(), 0);
        assert!(!rt.scheduler().is_running());
    }

    #[test]
    fn enabled_reminders_fire_on_interval() {
        let settings = Settings {
            blink_reminder_enabled: true,
            blink_reminder_interval: 600,
            ..Settings::default()
        };
        let mut rt = runtime(settings);
        rt.boot();
        assert!(rt.reminders().is_armed(ReminderKind::Blink));
        assert!(!rt.reminders().is_armed(ReminderKind::Posture));

        rt.advance_secs(1199);
        let blinks = rt
            .events()
            .iter()
            .filter(|e| matches!(e, Event::WellnessReminder { kind: ReminderKind::Blink }))
            .count();
        assert_eq!(blinks, 1);
    }

    #[test]
    fn snapshot_reports_deferred_resume() {
        let mut rt = runtime(Settings::default());
        rt.boot();
        rt.advance_secs(100);
        rt.pause_for(60);
        rt.advance_secs(15);

        match rt.snapshot() {
            Event::StateSnapshot {
                phase,
                remaining_secs,
                remaining_display,
                pause_origin,
                resumes_in_secs,
                ..
            } => {
                assert_eq!(phase, Phase::Paused);
                assert_eq!(remaining_secs, 1100);
                assert_eq!(remaining_display, "18:20");
                assert_eq!(pause_origin, Some(PauseOrigin::Manual));
                assert_eq!(resumes_in_secs, Some(45));
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn apply_routes_to_scheduler() {
        let mut rt = runtime(Settings::default());
        rt.boot();
        assert!(rt.apply(Command::StartBreakNow));
        assert!(rt.scheduler().is_on_break());
        assert!(!rt.apply(Command::Postpone(60)));
        assert!(rt.apply(Command::SkipBreak));
        assert_eq!(rt.scheduler().phase(), Phase::Working);
    }
}
