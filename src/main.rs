// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;

use anvesha::bulk::{run_bulk, BulkJob, BulkReport};
use anvesha::dispatch::{DispatchSettings, HyperClient};
use anvesha::listener::{drain_events, FlowListener};
use anvesha::replay::replay_text;
use anvesha::store::ExchangeStore;
use anvesha::workspace::ReplayWorkspace;
use anvesha::{config, frame, persistence};
use tracing::{info, warn};

const DRAIN_TICK: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "anvesha")]
struct Args {
    /// Optional config TOML path
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Receive captured flows on the local socket until Ctrl-C
    Listen {
        /// Socket path the capture add-on writes to
        #[arg(long)]
        socket: Option<String>,
        /// Session file imported on start and exported on exit
        #[arg(long)]
        session: Option<String>,
    },
    /// Send one request per value, substituting `{keyword}` in the template
    Bulk {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        keyword: String,
        /// One value per line
        #[arg(long)]
        values: PathBuf,
        #[arg(long)]
        session: Option<String>,
        /// Append every generated request to the session's replay workspace
        #[arg(long)]
        to_replay: bool,
    },
    /// Send a raw request text and print the response
    Replay {
        #[arg(long)]
        request: PathBuf,
    },
    /// List stored exchanges
    Show {
        #[arg(long)]
        session: Option<String>,
        /// Case-insensitive text to match against the exchange text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Append exchanges from a JSONL flows file to a session
    ImportFlows {
        #[arg(long)]
        flows: PathBuf,
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // Load config: optional CLI path; defaults if not provided
    let cfg = if let Some(ref p) = args.config {
        config::Config::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(%p, %e, "failed to load config, using defaults");
            config::Config::default()
        })
    } else {
        config::Config::default()
    };
    let settings = cfg.dispatch_settings();

    match args.command {
        Command::Listen { socket, session } => {
            let socket = socket.unwrap_or(cfg.listener.socket_path);
            let session = session.unwrap_or(cfg.session.path);
            listen(&socket, &session).await
        }
        Command::Bulk {
            template,
            keyword,
            values,
            session,
            to_replay,
        } => {
            let job = read_bulk_job(&template, &keyword, &values).await?;
            let report = bulk(&job, &settings).await?;
            for line in report_lines(&report) {
                println!("{}", line);
            }
            if to_replay {
                let session = session.unwrap_or(cfg.session.path);
                append_to_replay(&session, &report).await?;
            }
            Ok(())
        }
        Command::Replay { request } => {
            let text = tokio::fs::read_to_string(&request)
                .await
                .with_context(|| format!("reading {}", request.display()))?;
            let client = HyperClient::new(&settings)?;
            let outcome = replay_text(&client, &text, settings.timeout).await;
            println!("{}", outcome.display_text());
            Ok(())
        }
        Command::Show { session, filter } => {
            let session = session.unwrap_or(cfg.session.path);
            for line in show(&session, filter.as_deref().unwrap_or("")).await? {
                println!("{}", line);
            }
            Ok(())
        }
        Command::ImportFlows { flows, session } => {
            let session = session.unwrap_or(cfg.session.path);
            let added = import_flows(&flows, &session).await?;
            println!("imported {} exchanges into {}", added, session);
            Ok(())
        }
    }
}

/// Import a session file when it exists; a missing file starts empty.
async fn open_session(
    path: &str,
    store: &mut ExchangeStore,
    workspace: &mut ReplayWorkspace,
) -> anyhow::Result<()> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        info!(%path, "no session file, starting empty");
        return Ok(());
    }
    persistence::load_from_path(path, store, workspace)
        .await
        .with_context(|| format!("loading session {}", path))
}

async fn listen(socket: &str, session: &str) -> anyhow::Result<()> {
    let mut store = ExchangeStore::new();
    let mut workspace = ReplayWorkspace::new();
    open_session(session, &mut store, &mut workspace).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut listener = FlowListener::new(socket);
    listener.start(tx)?;

    let mut tick = tokio::time::interval(DRAIN_TICK);
    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let before = store.len();
                let summary = drain_events(&mut rx, &mut store);
                for ex in &store.list()[before..] {
                    info!(
                        id = %ex.short_id(),
                        method = %ex.request.method,
                        url = %ex.request.url,
                        status = ?ex.response.as_ref().map(|r| r.status),
                        "captured"
                    );
                }
                if summary.failed > 0 {
                    warn!(failed = summary.failed, "undecodable flow segments skipped");
                }
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    listener.stop().await;
    drain_events(&mut rx, &mut store);
    persistence::save_to_path(session, &store, &workspace).await?;
    Ok(())
}

async fn read_bulk_job(template: &Path, keyword: &str, values: &Path) -> anyhow::Result<BulkJob> {
    let template_text = tokio::fs::read_to_string(template)
        .await
        .with_context(|| format!("reading {}", template.display()))?;
    let values_text = tokio::fs::read_to_string(values)
        .await
        .with_context(|| format!("reading {}", values.display()))?;
    Ok(BulkJob::from_values_text(
        template_text.trim_end(),
        keyword,
        &values_text,
    )?)
}

async fn bulk(job: &BulkJob, settings: &DispatchSettings) -> anyhow::Result<BulkReport> {
    let client = HyperClient::new(settings)?;
    let (tx, mut rx) = mpsc::unbounded_channel::<anvesha::bulk::BulkProgress>();
    let progress = tokio::spawn(async move {
        while let Some(p) = rx.recv().await {
            info!(
                item = p.index + 1,
                total = p.total,
                status = %p.outcome.status_label(),
                "bulk progress"
            );
        }
    });
    let report = run_bulk(&client, job, settings, Some(&tx)).await;
    drop(tx);
    let _ = progress.await;
    Ok(report)
}

fn report_lines(report: &BulkReport) -> Vec<String> {
    report
        .items()
        .iter()
        .map(|item| {
            format!(
                "{}\t{}\t{}",
                item.value,
                item.outcome.status_label(),
                item.outcome.detail()
            )
        })
        .collect()
}

async fn append_to_replay(session: &str, report: &BulkReport) -> anyhow::Result<()> {
    let mut store = ExchangeStore::new();
    let mut workspace = ReplayWorkspace::new();
    open_session(session, &mut store, &mut workspace).await?;
    workspace.add_all(report.generated_texts());
    persistence::save_to_path(session, &store, &workspace).await?;
    Ok(())
}

async fn show(session: &str, filter: &str) -> anyhow::Result<Vec<String>> {
    let mut store = ExchangeStore::new();
    let mut workspace = ReplayWorkspace::new();
    persistence::load_from_path(session, &mut store, &mut workspace)
        .await
        .with_context(|| format!("loading session {}", session))?;
    Ok(store
        .filter(filter)
        .map(|ex| {
            let status = ex
                .response
                .as_ref()
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{}\t{}\t{}\t{}",
                ex.short_id(),
                ex.request.method,
                ex.request.url,
                status
            )
        })
        .collect())
}

async fn import_flows(flows: &Path, session: &str) -> anyhow::Result<usize> {
    let mut store = ExchangeStore::new();
    let mut workspace = ReplayWorkspace::new();
    open_session(session, &mut store, &mut workspace).await?;
    let exchanges = frame::load_flow_file(flows).await?;
    let added = exchanges.len();
    for ex in exchanges {
        store.append(ex);
    }
    persistence::save_to_path(session, &store, &workspace).await?;
    Ok(added)
}
