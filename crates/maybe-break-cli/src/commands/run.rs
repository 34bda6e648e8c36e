//! Foreground daemon.
//!
//! Owns one [`Runtime`] and feeds it wall-clock time once a second. Lines
//! read from stdin are commands (`pause`, `postpone 5m`, `status`,
//! `reload`, `quit`, ...). Every event is printed to stdout as one JSON
//! object per line.

use clap::Args;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use maybe_break_core::{
    heads_up_title, Command, Config, EnvironmentProbe, Event, Runtime, SharedSettings,
    UnavailableProbe,
};

use crate::probe::SystemProbe;

type Daemon = Runtime<SharedSettings, Box<dyn EnvironmentProbe>, UnboundedSender<Event>>;

#[derive(Args)]
pub struct RunArgs {
    /// Never pause automatically on idle or fullscreen
    #[arg(long)]
    pub no_smart_pause: bool,

    /// Print a state snapshot every N seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub snapshot_every: u64,
}

#[derive(Serialize)]
struct Line<'a> {
    #[serde(flatten)]
    event: &'a Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(daemon(args))
}

async fn daemon(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    for problem in config.validate() {
        warn!(%problem, "suspicious configuration");
    }

    let settings = SharedSettings::new(config.settings());
    let probe: Box<dyn EnvironmentProbe> = if args.no_smart_pause {
        Box::new(UnavailableProbe)
    } else {
        Box::new(SystemProbe)
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut runtime: Daemon = Runtime::new(settings.clone(), probe, tx);
    runtime.boot();
    info!("maybe-break running");

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    let mut since_snapshot = 0u64;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        drain(&mut rx, &config)?;
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                runtime.advance(now - last);
                last = now;

                since_snapshot += 1;
                if args.snapshot_every > 0 && since_snapshot >= args.snapshot_every {
                    since_snapshot = 0;
                    print_json(&runtime.snapshot())?;
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if handle_line(line.trim(), &mut runtime, &settings, &mut config)? == Flow::Quit {
                        break;
                    }
                }
                None => stdin_open = false,
            },
            _ = &mut ctrl_c => break,
        }
    }

    runtime.shutdown();
    drain(&mut rx, &config)?;
    info!("maybe-break stopped");
    Ok(())
}

fn handle_line(
    line: &str,
    runtime: &mut Daemon,
    settings: &SharedSettings,
    config: &mut Config,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match line {
        "" => {}
        "quit" | "exit" => return Ok(Flow::Quit),
        "status" => print_json(&runtime.snapshot())?,
        "reload" => {
            match Config::load() {
                Ok(fresh) => {
                    for problem in fresh.validate() {
                        warn!(%problem, "suspicious configuration");
                    }
                    settings.replace(fresh.settings());
                    *config = fresh;
                    runtime.restart_reminders();
                    info!("configuration reloaded");
                }
                Err(err) => warn!(%err, "reload failed; keeping current settings"),
            }
            print_json(&runtime.snapshot())?;
        }
        other => match other.parse::<Command>() {
            Ok(command) => {
                let applied = runtime.apply(command);
                print_json(&serde_json::json!({
                    "type": "CommandResult",
                    "command": other,
                    "applied": applied,
                }))?;
            }
            Err(err) => {
                warn!(%err, "bad command");
                print_json(&serde_json::json!({
                    "type": "CommandError",
                    "command": other,
                    "message": err.to_string(),
                }))?;
            }
        },
    }
    Ok(Flow::Continue)
}

fn drain(
    rx: &mut UnboundedReceiver<Event>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    while let Ok(event) = rx.try_recv() {
        print_json(&render(&event, config))?;
    }
    Ok(())
}

fn render<'a>(event: &'a Event, config: &Config) -> Line<'a> {
    let (title, message) = match event {
        Event::HeadsUpStarted { remaining_secs } => (Some(heads_up_title(*remaining_secs)), None),
        Event::BreakStarted { is_long, .. } => (
            Some(if *is_long { "Long break" } else { "Short break" }.to_string()),
            config
                .pick_message(&mut rand::thread_rng())
                .map(str::to_string),
        ),
        Event::WellnessReminder { kind } => {
            (Some(kind.title().to_string()), Some(kind.body().to_string()))
        }
        _ => (None, None),
    };
    Line {
        event,
        title,
        message,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
