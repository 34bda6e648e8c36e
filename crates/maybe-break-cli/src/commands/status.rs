//! Preview of upcoming breaks.
//!
//! Replays the configured schedule on the virtual clock, with smart pause
//! disabled, and reports when the next breaks would start.

use chrono::{Duration as ChronoDuration, Local};
use clap::Args;
use serde::Serialize;
use std::time::Duration;

use maybe_break_core::{format_clock, Config, Event, Runtime, Settings, UnavailableProbe};

/// Stop replaying after a week of simulated time.
const HORIZON_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Args)]
pub struct StatusArgs {
    /// Number of upcoming breaks to list
    #[arg(long, short = 'n', default_value_t = 4)]
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UpcomingBreak {
    pub index: usize,
    pub starts_in_secs: u64,
    pub starts_in: String,
    pub is_long: bool,
    pub duration_secs: u64,
}

pub fn run(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let now = Local::now();

    let upcoming: Vec<_> = plan(config.settings(), args.count)
        .into_iter()
        .map(|b| {
            let at = now + ChronoDuration::seconds(b.starts_in_secs as i64);
            serde_json::json!({
                "index": b.index,
                "starts_in_secs": b.starts_in_secs,
                "starts_in": b.starts_in,
                "starts_at": at.format("%H:%M:%S").to_string(),
                "is_long": b.is_long,
                "duration_secs": b.duration_secs,
            })
        })
        .collect();

    let out = serde_json::json!({
        "config": Config::path()?.display().to_string(),
        "upcoming": upcoming,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// The next `count` breaks after a fresh start, in order.
pub fn plan(settings: Settings, count: usize) -> Vec<UpcomingBreak> {
    let settings = Settings {
        smart_pause_idle_enabled: false,
        smart_pause_fullscreen_enabled: false,
        blink_reminder_enabled: false,
        posture_reminder_enabled: false,
        ..settings
    };
    let mut runtime = Runtime::new(settings, UnavailableProbe, Vec::<Event>::new());
    runtime.start();

    let mut upcoming = Vec::with_capacity(count);
    while upcoming.len() < count && runtime.now().as_secs() < HORIZON_SECS {
        runtime.advance(Duration::from_secs(1));
        let starts_in_secs = runtime.now().as_secs();
        let fired: Vec<Event> = runtime.events_mut().drain(..).collect();
        for event in fired {
            if let Event::BreakStarted {
                is_long,
                duration_secs,
            } = event
            {
                upcoming.push(UpcomingBreak {
                    index: upcoming.len() + 1,
                    starts_in_secs,
                    starts_in: format_clock(starts_in_secs),
                    is_long,
                    duration_secs,
                });
            }
        }
    }
    upcoming.truncate(count);
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_plan() {
        let breaks = plan(Settings::default(), 3);
        assert_eq!(breaks.len(), 3);
        assert_eq!(breaks[0].starts_in_secs, 1200);
        assert_eq!(breaks[0].starts_in, "20:00");
        assert_eq!(breaks[1].starts_in_secs, 1200 + 20 + 1200);
        assert!(breaks.iter().all(|b| !b.is_long));
    }

    #[test]
    fn long_break_slot_is_reported() {
        let settings = Settings {
            short_break_interval: 60,
            long_break_interval: 180,
            ..Settings::default()
        };
        let breaks = plan(settings, 3);
        assert_eq!(
            breaks.iter().map(|b| b.is_long).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(breaks[2].duration_secs, 300);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(plan(Settings::default(), 0).is_empty());
    }
}
