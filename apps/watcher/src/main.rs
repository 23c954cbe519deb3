use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use search_core::{
    AttemptOutcome, HttpSlotFetcher, SearchController, SystemClock, SystemNotifier,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod terminal;

use commands::{dispatch, parse_command, Flow, HELP_TEXT};
use config::{load_settings, Settings};
use terminal::{render_event, render_slots, TerminalPermission, TerminalSink};

#[derive(Parser, Debug)]
#[command(name = "watcher", about = "Poll a scheduler for open appointment slots")]
struct Args {
    #[arg(long)]
    scheduler_url: Option<String>,
    #[arg(long)]
    location_id: Option<i64>,
    #[arg(long)]
    retry_delay_seconds: Option<u64>,
    /// Search once per command instead of every retry interval.
    #[arg(long)]
    no_auto_retry: bool,
    #[arg(long)]
    notifications: bool,
    /// Run a single search, print the result and exit.
    #[arg(long)]
    once: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.scheduler_url {
            settings.scheduler_url = v.clone();
        }
        if let Some(v) = self.location_id {
            settings.location_id = v;
        }
        if let Some(v) = self.retry_delay_seconds {
            settings.retry_delay_seconds = v;
        }
        if self.no_auto_retry || self.once {
            settings.auto_retry = false;
        }
        if self.notifications {
            settings.notifications = true;
        }
    }
}

fn build_controller(settings: &Settings) -> Result<Arc<SearchController>> {
    let fetcher = HttpSlotFetcher::new(&settings.scheduler_url)
        .context("failed to configure scheduler client")?;
    let notifier = SystemNotifier::with_catalog(
        TerminalPermission,
        TerminalSink,
        settings.messages.clone().unwrap_or_default(),
    );
    let controller = SearchController::new_with_dependencies(
        Arc::new(fetcher),
        Arc::new(notifier),
        Arc::new(SystemClock),
        settings.retry_delay(),
    );
    controller.set_location_id(settings.location_id());
    controller.set_should_auto_retry(settings.auto_retry);
    controller.set_notifications_enabled(settings.notifications);
    Ok(controller)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

async fn run_once(controller: Arc<SearchController>) -> Result<()> {
    let outcome = controller
        .start_search()
        .await
        .context("search task panicked")?;
    let snapshot = controller.snapshot();
    match outcome {
        AttemptOutcome::Succeeded(slots) => {
            print_lines(render_slots(&slots, &snapshot));
        }
        AttemptOutcome::Failed(err) => {
            controller.teardown();
            return Err(err).context("search failed");
        }
        AttemptOutcome::Cancelled => warn!("search: attempt was cancelled"),
    }
    controller.teardown();
    Ok(())
}

async fn run_interactive(controller: Arc<SearchController>) -> Result<()> {
    let mut events = controller.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    println!("{HELP_TEXT}");
    controller.start_search();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ui: interrupt received");
                break;
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) => match parse_command(&line) {
                        Ok(command) => {
                            let (flow, status) = dispatch(&controller, command);
                            println!("{status}");
                            if flow == Flow::Quit {
                                break;
                            }
                        }
                        Err(commands::CommandError::Empty) => {}
                        Err(err) => println!("{err}; {HELP_TEXT}"),
                    },
                    // Keep polling when stdin is not interactive.
                    None => stdin_open = false,
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_lines(render_event(&event, &controller.snapshot())),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "ui: dropped search events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.teardown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings();
    args.apply(&mut settings);
    info!(
        scheduler_url = %settings.scheduler_url,
        location_id = settings.location_id,
        auto_retry = settings.auto_retry,
        retry_delay_secs = settings.retry_delay().as_secs(),
        "watcher: starting"
    );

    let controller = build_controller(&settings)?;
    if args.once {
        run_once(controller).await
    } else {
        run_interactive(controller).await
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
