use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    ActionOutcome, AttendanceController, BroadcastNotifier, ControllerOptions,
    DeviceLocationProvider, FixedGeolocation, GeolocationCapability, LocalTimeSource,
    Notification, RpcAttendanceClient,
};
use shared::domain::{AttendanceAction, Coordinates};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::{render_notification, render_state};

#[derive(Parser, Debug)]
#[command(name = "attendance", about = "Geo-tagged check-in/check-out")]
struct Args {
    #[arg(long, default_value = "attendance.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    login: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,
    /// Hide the live clock in `watch`.
    #[arg(long)]
    no_clock: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Show the current attendance status.
    Status,
    /// Check in at the configured location.
    CheckIn,
    /// Check out at the configured location.
    CheckOut,
    /// Interactive view with a live clock and periodic refresh.
    Watch,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.server_url {
            settings.server_url = v.clone();
        }
        if let Some(v) = &self.database {
            settings.database = Some(v.clone());
        }
        if let Some(v) = &self.login {
            settings.login = Some(v.clone());
        }
        if self.latitude.is_some() {
            settings.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            settings.longitude = self.longitude;
        }
        if self.no_clock || self.command != Command::Watch {
            settings.live_clock = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    args.apply(&mut settings);

    let client = RpcAttendanceClient::new(settings.server_url()?, settings.http_timeout())?;
    if let Some((database, login, password)) = settings.credentials() {
        client
            .authenticate(database, login, password)
            .await
            .with_context(|| format!("failed to sign in as '{login}'"))?;
    } else {
        warn!("no credentials configured; relying on an existing session");
    }

    let capability = settings.fixed_coordinates().map(|coords: Coordinates| {
        info!(
            latitude = coords.latitude,
            longitude = coords.longitude,
            "using configured terminal position"
        );
        Arc::new(FixedGeolocation::new(coords)) as Arc<dyn GeolocationCapability>
    });

    let notifier = Arc::new(BroadcastNotifier::default());
    let notifications = notifier.subscribe();
    let controller = Arc::new(AttendanceController::new_with_dependencies(
        Arc::new(DeviceLocationProvider::from_capability(capability)),
        Arc::new(client),
        notifier,
        Arc::new(LocalTimeSource),
        ControllerOptions {
            live_clock: settings.live_clock,
            worked_hours: settings.worked_hours,
            ..ControllerOptions::default()
        },
    ));

    match args.command {
        Command::Status => run_once(&controller, None, notifications).await,
        Command::CheckIn => {
            run_once(&controller, Some(AttendanceAction::CheckIn), notifications).await
        }
        Command::CheckOut => {
            run_once(&controller, Some(AttendanceAction::CheckOut), notifications).await
        }
        Command::Watch => watch(controller, &settings, notifications).await,
    }
}

async fn run_once(
    controller: &AttendanceController,
    action: Option<AttendanceAction>,
    mut notifications: broadcast::Receiver<Notification>,
) -> Result<()> {
    controller.activate().await;
    let outcome = match action {
        Some(AttendanceAction::CheckIn) => Some(controller.check_in().await),
        Some(AttendanceAction::CheckOut) => Some(controller.check_out().await),
        None => None,
    };

    while let Ok(notification) = notifications.try_recv() {
        println!("{}", render_notification(&notification));
    }
    println!(
        "{}",
        render_state(&controller.state(), controller.options().worked_hours)
    );
    controller.deactivate();

    match (action, outcome) {
        (Some(action), Some(outcome)) if outcome != ActionOutcome::Completed => {
            bail!("{} did not complete ({outcome:?})", action.label())
        }
        _ => Ok(()),
    }
}

async fn watch(
    controller: Arc<AttendanceController>,
    settings: &Settings,
    mut notifications: broadcast::Receiver<Notification>,
) -> Result<()> {
    let show_hours = controller.options().worked_hours;
    controller.activate().await;

    let mut states = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = tokio::time::interval(settings.refresh_interval());
    poll.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut pending_sticky = 0usize;

    println!("commands: in | out | refresh | quit   (empty line dismisses errors)");
    redraw(&render_state(&states.borrow_and_update(), show_hours));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = render_state(&states.borrow_and_update(), show_hours);
                redraw(&line);
            }
            received = notifications.recv() => match received {
                Ok(notification) => {
                    println!();
                    println!("{}", render_notification(&notification));
                    if notification.sticky {
                        pending_sticky += 1;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notifications lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = poll.tick() => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move { controller.refresh().await });
            }
            line = lines.next_line() => {
                let Some(input) = line.context("failed to read stdin")? else {
                    break;
                };
                match input.trim() {
                    "in" => spawn_action(&controller, AttendanceAction::CheckIn),
                    "out" => spawn_action(&controller, AttendanceAction::CheckOut),
                    "refresh" => {
                        let controller = Arc::clone(&controller);
                        tokio::spawn(async move { controller.refresh().await });
                    }
                    "quit" | "q" => break,
                    "" if pending_sticky > 0 => {
                        pending_sticky = 0;
                        println!("dismissed");
                    }
                    "" => {}
                    other => println!("unknown command '{other}'"),
                }
            }
        }
    }

    controller.deactivate();
    println!();
    Ok(())
}

fn spawn_action(controller: &Arc<AttendanceController>, action: AttendanceAction) {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        let outcome = match action {
            AttendanceAction::CheckIn => controller.check_in().await,
            AttendanceAction::CheckOut => controller.check_out().await,
        };
        if outcome == ActionOutcome::Rejected {
            println!("another check-in/out is still running");
        }
    });
}

fn redraw(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r\x1b[2K{line}");
    let _ = stdout.flush();
}
