use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vigil_core::app::{Dispatcher, PollExecutor, Scheduler};
use vigil_core::domain::{Cadence, Subject, SubjectId};
use vigil_core::error::PushError;
use vigil_core::impls::{HttpPushSender, InMemorySubjectStore, WikidataLookup};
use vigil_core::ports::{Clock, PushNote, PushSender, SystemClock, UnsupportedWake};

#[derive(Debug, Parser)]
#[command(name = "vigil", about = "Watch a roster of public figures for deaths")]
struct Args {
    /// JSON roster file: a list of {"name": "..."} entries, each with an
    /// optional "death_date" for subjects already known deceased.
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Polling cadence: hourly, daily, weekly, monthly, or disabled.
    #[arg(long, default_value = "daily")]
    cadence: Cadence,

    /// Wikidata endpoint for death-date lookups.
    #[arg(long, default_value = "https://www.wikidata.org")]
    wikidata_url: String,

    /// Push gateway endpoint. Without it, push submissions are logged only.
    #[arg(long)]
    push_url: Option<String>,

    /// Treat the host as backgrounded: detections go out as pushes instead
    /// of into the pending-alert slot.
    #[arg(long)]
    background: bool,

    /// Run a single cycle immediately, print the result as JSON, and exit.
    #[arg(long)]
    check_now: bool,
}

#[derive(Debug, serde::Deserialize)]
struct RosterEntry {
    name: String,
    #[serde(default)]
    death_date: Option<chrono::NaiveDate>,
}

/// Push sender of last resort: logs what would have been submitted.
struct LogPush;

#[async_trait::async_trait]
impl PushSender for LogPush {
    async fn send(&self, note: PushNote) -> Result<(), PushError> {
        info!(key = %note.key, title = %note.title, "push (log only)");
        Ok(())
    }
}

fn load_roster(args: &Args, now: chrono::DateTime<chrono::Utc>) -> Vec<Subject> {
    let Some(path) = &args.roster else {
        warn!("no roster file given; starting with an empty roster");
        return Vec::new();
    };
    let raw = std::fs::read_to_string(path).expect("read roster file");
    let entries: Vec<RosterEntry> = serde_json::from_str(&raw).expect("parse roster file");
    entries
        .into_iter()
        .map(|entry| match entry.death_date {
            Some(date) => Subject::deceased(SubjectId::generate(now), entry.name, date, now),
            None => Subject::living(SubjectId::generate(now), entry.name, now),
        })
        .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let clock = Arc::new(SystemClock);
    let subjects = load_roster(&args, clock.now());
    info!(subjects = subjects.len(), cadence = %args.cadence, "vigil starting");

    let store = Arc::new(InMemorySubjectStore::with_subjects(subjects));
    let lookup = Arc::new(WikidataLookup::with_base_url(&args.wikidata_url));
    let push: Arc<dyn PushSender> = match &args.push_url {
        Some(url) => Arc::new(HttpPushSender::new(url)),
        None => Arc::new(LogPush),
    };

    let dispatcher = Arc::new(Dispatcher::new(push));
    dispatcher.set_foreground(!args.background).await;

    let executor = PollExecutor::new(store, lookup, clock);
    let scheduler = Scheduler::new(
        executor,
        dispatcher.clone(),
        Arc::new(UnsupportedWake),
        args.cadence,
    );

    if args.check_now {
        // Nothing else can hold the in-flight guard this early.
        let result = scheduler.run_now().await.expect("first cycle");
        println!(
            "{}",
            serde_json::to_string_pretty(&result).expect("serialize cycle result")
        );
        return;
    }

    scheduler.start().await;

    let mut cycles = dispatcher.subscribe_cycles();
    let mut deaths = dispatcher.subscribe_deceased();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = cycles.recv() => {
                if let Ok(event) = event {
                    info!(
                        cycle = %event.cycle_id,
                        newly_deceased = event.newly_deceased,
                        "cycle completed"
                    );
                }
            }
            event = deaths.recv() => {
                if let Ok(event) = event {
                    for subject in &event.subjects {
                        info!(
                            name = subject.name(),
                            death_date = ?subject.death_date(),
                            "newly deceased"
                        );
                    }
                    // A terminal has no alert UI; display and dismiss in
                    // one breath so the slot does not sit armed forever.
                    if let Some(alert) = dispatcher.peek_pending_alert().await {
                        info!(subjects = alert.subjects.len(), "pending alert displayed");
                        dispatcher.dismiss_pending_alert().await;
                    }
                }
            }
        }
    }

    info!("shutting down");
    scheduler.stop().await;
}
