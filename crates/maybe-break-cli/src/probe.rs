//! Platform idle detection for the daemon.
//!
//! Idle time comes from `xprintidle` on Linux (milliseconds) and from the
//! `HIDIdleTime` property reported by `ioreg` on macOS (nanoseconds).
//! Fullscreen detection has no portable source and always reports
//! unavailable, which smart pause treats as "not fullscreen".

use std::process::Command;

use maybe_break_core::{EnvironmentProbe, ProbeError};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl EnvironmentProbe for SystemProbe {
    fn is_idle_beyond(&self, threshold_secs: u64) -> Result<bool, ProbeError> {
        Ok(idle_secs()? >= threshold_secs)
    }

    fn is_frontmost_fullscreen(&self) -> Result<bool, ProbeError> {
        Err(ProbeError::Unavailable("fullscreen detection".into()))
    }
}

#[cfg(target_os = "linux")]
fn idle_secs() -> Result<u64, ProbeError> {
    parse_xprintidle(&capture("xprintidle", &[])?)
}

#[cfg(target_os = "macos")]
fn idle_secs() -> Result<u64, ProbeError> {
    parse_hid_idle(&capture("ioreg", &["-c", "IOHIDSystem"])?)
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn idle_secs() -> Result<u64, ProbeError> {
    Err(ProbeError::Unavailable("idle detection".into()))
}

#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), allow(dead_code))]
fn capture(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(ProbeError::CommandFailed(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_xprintidle(output: &str) -> Result<u64, ProbeError> {
    let millis: u64 = output
        .trim()
        .parse()
        .map_err(|_| ProbeError::Parse(output.trim().to_string()))?;
    Ok(millis / 1000)
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_hid_idle(output: &str) -> Result<u64, ProbeError> {
    let line = output
        .lines()
        .find(|line| line.contains("\"HIDIdleTime\""))
        .ok_or_else(|| ProbeError::Parse("no HIDIdleTime in ioreg output".into()))?;
    let nanos: u64 = line
        .rsplit('=')
        .next()
        .map(str::trim)
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ProbeError::Parse(line.trim().to_string()))?;
    Ok(nanos / 1_000_000_000)
}
