//! Environment signals consumed by smart pause.
//!
//! Platform code answers two questions: has the user been idle longer than a
//! threshold, and is the frontmost window fullscreen. A probe that cannot
//! answer returns an error, which the monitor reads as "no".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ProbeError;

pub trait EnvironmentProbe {
    fn is_idle_beyond(&self, threshold_secs: u64) -> Result<bool, ProbeError>;
    fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError>;
}

impl<P: EnvironmentProbe + ?Sized> EnvironmentProbe for Box<P> {
    fn is_idle_beyond(&self, threshold_secs: u64) -> Result<bool, ProbeError> {
        (**self).is_idle_beyond(threshold_secs)
    }

    fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError> {
        (**self).is_frontmost_fullscreen()
    }
}

/// Probe with no platform support. Never triggers a pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProbe;

impl EnvironmentProbe for UnavailableProbe {
    fn is_idle_beyond(&self, _threshold_secs: u64) -> Result<bool, ProbeError> {
        Err(ProbeError::Unavailable("idle time".into()))
    }

    fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::Unavailable("fullscreen detection".into()))
    }
}

/// Probe whose answers are set by hand.
///
/// Clones share state, so a test can keep one handle and flip signals while
/// the runtime owns the other. The idle flag means "idle beyond whatever
/// threshold is asked".
#[derive(Debug, Clone, Default)]
pub struct ManualProbe {
    idle: Arc<AtomicBool>,
    fullscreen: Arc<AtomicBool>,
}

impl ManualProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_idle(&self, idle: bool) {
        self.idle.store(idle, Ordering::SeqCst);
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.fullscreen.store(fullscreen, Ordering::SeqCst);
    }
}

impl EnvironmentProbe for ManualProbe {
    fn is_idle_beyond(&self, _threshold_secs: u64) -> Result<bool, ProbeError> {
        Ok(self.idle.load(Ordering::SeqCst))
    }

    fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError> {
        Ok(self.fullscreen.load(Ordering::SeqCst))
    }
}
