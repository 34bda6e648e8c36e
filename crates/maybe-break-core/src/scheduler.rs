//! Break scheduler.
//!
//! The scheduler alternates work periods and rest breaks. It owns no thread:
//! every countdown is a one-second repeating timer on the runtime's
//! [`Timers`](crate::runtime::Timers) queue, and the runtime routes each
//! firing back through [`BreakScheduler::on_countdown`].
//!
//! ## State Transitions
//!
//! ```text
//! Working -> HeadsUp -> OnBreak{is_long} -> Working
//!    \__________\___________\_____________-> Paused -> (restored phase)
//! ```
//!
//! Commands whose preconditions do not hold are ignored and return `false`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::TimerId;
use crate::events::Event;
use crate::runtime::{Context, Wakeup};
use crate::settings::Settings;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Working,
    HeadsUp,
    OnBreak { is_long: bool },
    Paused,
}

/// Who issued the active pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOrigin {
    Manual,
    /// Issued by smart pause; only these may be auto-resumed.
    Automatic,
}

/// Phase and remaining seconds captured by `pause()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPhase {
    pub phase: Phase,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct DeferredResume {
    timer: TimerId,
    at: Duration,
}

/// Whether the next break is a long one, given how many breaks were
/// completed since the schedule started.
pub fn is_long_break(settings: &Settings, short_breaks_taken: u32) -> bool {
    settings.long_breaks_enabled
        && short_breaks_taken > 0
        && (u64::from(short_breaks_taken) + 1) % settings.long_break_ratio() == 0
}

#[derive(Debug)]
pub struct BreakScheduler {
    phase: Phase,
    work_remaining: u64,
    break_remaining: u64,
    short_breaks_taken: u32,
    running: bool,
    saved: Option<SavedPhase>,
    pause_origin: Option<PauseOrigin>,
    countdown: Option<TimerId>,
    deferred: Option<DeferredResume>,
}

impl BreakScheduler {
    /// A stopped scheduler. Call [`start`](Self::start) to arm it.
    pub fn new() -> Self {
        Self {
            phase: Phase::Working,
            work_remaining: 0,
            break_remaining: 0,
            short_breaks_taken: 0,
            running: false,
            saved: None,
            pause_origin: None,
            countdown: None,
            deferred: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_on_break(&self) -> bool {
        matches!(self.phase, Phase::OnBreak { .. })
    }

    pub fn work_remaining(&self) -> u64 {
        self.work_remaining
    }

    pub fn break_remaining(&self) -> u64 {
        self.break_remaining
    }

    pub fn short_breaks_taken(&self) -> u32 {
        self.short_breaks_taken
    }

    /// `Some` only while paused.
    pub fn pause_origin(&self) -> Option<PauseOrigin> {
        self.pause_origin
    }

    pub fn saved_phase(&self) -> Option<SavedPhase> {
        self.saved
    }

    /// Virtual instant at which a time-bounded pause resumes.
    pub fn deferred_resume_at(&self) -> Option<Duration> {
        self.deferred.map(|d| d.at)
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }

    /// Phase the user is in, looking through a pause.
    pub fn effective_phase(&self) -> Phase {
        match (self.phase, self.saved) {
            (Phase::Paused, Some(saved)) => saved.phase,
            (phase, _) => phase,
        }
    }

    /// Seconds left in the current (or paused) phase.
    pub fn remaining(&self) -> u64 {
        match self.phase {
            Phase::Working | Phase::HeadsUp => self.work_remaining,
            Phase::OnBreak { .. } => self.break_remaining,
            Phase::Paused => self.saved.map(|s| s.remaining_secs).unwrap_or(0),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, ctx: &mut Context<'_>) -> bool {
        let closing = self.effective_phase();
        self.cancel_countdown(ctx);
        self.cancel_deferred_resume(ctx);

        self.running = true;
        self.short_breaks_taken = 0;
        self.saved = None;
        self.pause_origin = None;
        self.break_remaining = 0;
        self.phase = Phase::Working;
        self.work_remaining = ctx.settings().short_break_interval;

        close_phase(closing, ctx);
        self.arm_countdown(ctx);
        info!(work_secs = self.work_remaining, "break schedule started");
        true
    }

    pub fn stop(&mut self, ctx: &mut Context<'_>) -> bool {
        let closing = if self.running {
            self.effective_phase()
        } else {
            Phase::Working
        };
        self.cancel_countdown(ctx);
        self.cancel_deferred_resume(ctx);

        self.running = false;
        self.short_breaks_taken = 0;
        self.saved = None;
        self.pause_origin = None;
        self.work_remaining = 0;
        self.break_remaining = 0;
        self.phase = Phase::Working;

        close_phase(closing, ctx);
        info!("break schedule stopped");
        true
    }

    pub fn pause(&mut self, ctx: &mut Context<'_>) -> bool {
        self.pause_with_origin(PauseOrigin::Manual, ctx)
    }

    /// Snapshot the running phase and stop its countdown.
    pub fn pause_with_origin(&mut self, origin: PauseOrigin, ctx: &mut Context<'_>) -> bool {
        if !self.running || self.phase == Phase::Paused {
            debug!(?origin, phase = ?self.phase, "pause ignored");
            return false;
        }
        self.saved = Some(SavedPhase {
            phase: self.phase,
            remaining_secs: self.remaining(),
        });
        self.cancel_countdown(ctx);
        self.phase = Phase::Paused;
        self.pause_origin = Some(origin);
        info!(?origin, saved = ?self.saved, "paused");
        true
    }

    pub fn resume(&mut self, ctx: &mut Context<'_>) -> bool {
        if self.phase != Phase::Paused {
            debug!(phase = ?self.phase, "resume ignored");
            return false;
        }
        self.cancel_deferred_resume(ctx);
        let saved = self.saved.take().unwrap_or(SavedPhase {
            phase: Phase::Working,
            remaining_secs: ctx.settings().short_break_interval,
        });

        self.pause_origin = None;
        self.phase = saved.phase;
        match saved.phase {
            Phase::Working | Phase::HeadsUp => self.work_remaining = saved.remaining_secs,
            Phase::OnBreak { .. } => self.break_remaining = saved.remaining_secs,
            Phase::Paused => {}
        }
        self.arm_countdown(ctx);
        info!(phase = ?self.phase, remaining = saved.remaining_secs, "resumed");
        true
    }

    /// Pause now and resume by itself after `secs`.
    ///
    /// A second call replaces the pending resume. The pause counts as manual
    /// even if smart pause issued it, so the monitor leaves it alone.
    pub fn pause_for(&mut self, secs: u64, ctx: &mut Context<'_>) -> bool {
        if !self.running {
            debug!("pause_for ignored: not running");
            return false;
        }
        self.pause_with_origin(PauseOrigin::Manual, ctx);
        self.pause_origin = Some(PauseOrigin::Manual);

        self.cancel_deferred_resume(ctx);
        let delay = Duration::from_secs(secs);
        let timer = ctx.timers.schedule_once(delay, Wakeup::DeferredResume);
        self.deferred = Some(DeferredResume {
            timer,
            at: ctx.timers.now().saturating_add(delay),
        });
        info!(secs, "paused with deferred resume");
        true
    }

    /// Extend the current work period.
    pub fn add_time(&mut self, secs: u64, ctx: &mut Context<'_>) -> bool {
        if !matches!(self.phase, Phase::Working | Phase::HeadsUp) || !self.running {
            debug!(phase = ?self.phase, "add_time ignored");
            return false;
        }
        self.work_remaining = self.work_remaining.saturating_add(secs);
        if self.phase == Phase::HeadsUp
            && self.work_remaining > ctx.settings().heads_up_duration
        {
            self.phase = Phase::Working;
            ctx.emit(Event::HeadsUpEnded);
        }
        true
    }

    /// Drop the current (or upcoming) break and restart the schedule.
    pub fn skip_break(&mut self, ctx: &mut Context<'_>) -> bool {
        let closing = self.effective_phase();
        self.cancel_countdown(ctx);
        self.cancel_deferred_resume(ctx);
        self.saved = None;
        self.pause_origin = None;
        self.phase = Phase::Working;

        close_phase(closing, ctx);
        info!(?closing, "break skipped");
        self.start(ctx)
    }

    /// Push the pending break back by `secs` from now.
    pub fn postpone(&mut self, secs: u64, ctx: &mut Context<'_>) -> bool {
        if self.phase != Phase::HeadsUp {
            debug!(phase = ?self.phase, "postpone ignored");
            return false;
        }
        self.cancel_countdown(ctx);
        self.phase = Phase::Working;
        self.work_remaining = secs;
        ctx.emit(Event::HeadsUpEnded);
        self.arm_countdown(ctx);
        info!(secs, "break postponed");
        true
    }

    pub fn start_break_now(&mut self, ctx: &mut Context<'_>) -> bool {
        let closing = if self.running {
            self.effective_phase()
        } else {
            Phase::Working
        };
        self.cancel_countdown(ctx);
        self.cancel_deferred_resume(ctx);
        self.running = true;
        self.saved = None;
        self.pause_origin = None;
        self.phase = Phase::Working;

        close_phase(closing, ctx);
        self.begin_break(ctx);
        true
    }

    // ── Timer callbacks ──────────────────────────────────────────────

    /// One-second countdown step. Stale timer ids are ignored.
    pub fn on_countdown(&mut self, timer: TimerId, ctx: &mut Context<'_>) {
        if self.countdown != Some(timer) {
            ctx.timers.cancel(timer);
            return;
        }
        match self.phase {
            Phase::Working | Phase::HeadsUp => self.work_tick(ctx),
            Phase::OnBreak { .. } => self.break_tick(ctx),
            Phase::Paused => self.cancel_countdown(ctx),
        }
    }

    pub fn on_deferred_resume(&mut self, timer: TimerId, ctx: &mut Context<'_>) {
        match self.deferred {
            Some(deferred) if deferred.timer == timer => {
                self.deferred = None;
                self.resume(ctx);
            }
            _ => debug!("stale deferred resume ignored"),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn work_tick(&mut self, ctx: &mut Context<'_>) {
        let settings = ctx.settings();
        self.work_remaining = self.work_remaining.saturating_sub(1);

        if self.phase == Phase::Working && self.work_remaining <= settings.heads_up_duration {
            self.phase = Phase::HeadsUp;
            ctx.emit(Event::HeadsUpStarted {
                remaining_secs: self.work_remaining,
            });
        }

        if self.work_remaining == 0 {
            self.cancel_countdown(ctx);
            ctx.emit(Event::HeadsUpEnded);
            self.begin_break(ctx);
        }
    }

    fn break_tick(&mut self, ctx: &mut Context<'_>) {
        self.break_remaining = self.break_remaining.saturating_sub(1);
        if self.break_remaining > 0 {
            return;
        }
        self.cancel_countdown(ctx);
        self.short_breaks_taken += 1;
        self.phase = Phase::Working;
        self.work_remaining = ctx.settings().short_break_interval;
        ctx.emit(Event::BreakEnded);
        info!(taken = self.short_breaks_taken, "break completed");
        self.arm_countdown(ctx);
    }

    fn begin_break(&mut self, ctx: &mut Context<'_>) {
        let settings = ctx.settings();
        let is_long = is_long_break(&settings, self.short_breaks_taken);
        self.break_remaining = if is_long {
            settings.long_break_duration
        } else {
            settings.short_break_duration
        };
        self.work_remaining = 0;
        self.phase = Phase::OnBreak { is_long };
        ctx.emit(Event::BreakStarted {
            is_long,
            duration_secs: self.break_remaining,
        });
        info!(is_long, secs = self.break_remaining, "break started");
        self.arm_countdown(ctx);
    }

    fn arm_countdown(&mut self, ctx: &mut Context<'_>) {
        self.cancel_countdown(ctx);
        self.countdown = Some(ctx.timers.schedule_repeating(TICK, Wakeup::Countdown));
    }

    fn cancel_countdown(&mut self, ctx: &mut Context<'_>) {
        if let Some(timer) = self.countdown.take() {
            ctx.timers.cancel(timer);
        }
    }

    fn cancel_deferred_resume(&mut self, ctx: &mut Context<'_>) {
        if let Some(deferred) = self.deferred.take() {
            ctx.timers.cancel(deferred.timer);
        }
    }
}

impl Default for BreakScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire the end event of a phase that is being left.
fn close_phase(phase: Phase, ctx: &mut Context<'_>) {
    match phase {
        Phase::HeadsUp => ctx.emit(Event::HeadsUpEnded),
        Phase::OnBreak { .. } => ctx.emit(Event::BreakEnded),
        Phase::Working | Phase::Paused => {}
    }
}
