use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use rpde_changelog::{spawn_publisher, ChangeLog, ChangeSource, PublisherHandle, RecordUpdate};
use rpde_core::FeedItem;
use rpde_feed::FeedPage;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rpdectl", version, about = "RPDE feed tools")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Feed base URL used when computing next page URLs
    #[arg(long = "base-url", global = true, default_value = "https://example.org/feed")]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Re-validate a served page against the prior cursor
    Validate {
        /// Page JSON file (stdin when omitted)
        #[arg(long = "file")]
        file: Option<PathBuf>,
        /// Prior cursor, timestamp half
        #[arg(long = "after-timestamp")]
        after_timestamp: Option<i64>,
        /// Prior cursor, id half
        #[arg(long = "after-id")]
        after_id: Option<AnyId>,
        /// Prior cursor for change-number feeds
        #[arg(long = "after-change-number")]
        after_change_number: Option<i64>,
    },
    /// Load record updates from a JSON array and walk the feed to its end
    Paginate {
        /// JSON array of record updates
        file: PathBuf,
        /// Items per page
        #[arg(long = "page-size", default_value_t = 8)]
        page_size: usize,
        /// Page by change number instead of (modified, id)
        #[arg(long = "by-change-number", action = ArgAction::SetTrue)]
        by_change_number: bool,
    },
    /// Run a live publisher over JSONL updates from stdin and print +/- lines
    Tail {
        /// Items per poll
        #[arg(long = "page-size", default_value_t = 8)]
        page_size: usize,
    },
}

/// Feed identifiers as they appear in page JSON: integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
enum AnyId {
    Num(i64),
    Str(String),
}

impl fmt::Display for AnyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyId::Num(n) => write!(f, "{}", n),
            AnyId::Str(s) => f.write_str(s),
        }
    }
}

impl FromStr for AnyId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => AnyId::Num(n),
            Err(_) => AnyId::Str(s.to_string()),
        })
    }
}

fn init_tracing() {
    let env = std::env::var("RPDE_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("RPDE_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid RPDE_METRICS_ADDR; expected host:port");
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    use std::io::Read as _;
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("read stdin")?;
            Ok(buf)
        }
    }
}

fn item_key(item: &FeedItem<AnyId>) -> String {
    let kind = item.kind.map(|k| k.wire_name()).unwrap_or("?");
    match &item.id {
        Some(id) => format!("{}/{}", kind, id),
        None => kind.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file, after_timestamp, after_id, after_change_number } => {
            let text = read_input(file.as_deref())?;
            let page: FeedPage<AnyId> = serde_json::from_str(&text).context("parse page JSON")?;
            let served_next = page.next.clone();
            info!(items = page.items.len(), "validate invoked");

            let rebuilt = match (after_change_number, after_timestamp, after_id) {
                (Some(n), None, None) => {
                    FeedPage::after_change_number(&cli.base_url, n, page.items)
                }
                (None, Some(ts), Some(id)) => {
                    FeedPage::after_modified_id(&cli.base_url, ts, id, page.items)
                }
                _ => anyhow::bail!(
                    "pass either --after-timestamp with --after-id, or --after-change-number"
                ),
            };

            match rebuilt {
                Ok(valid) => match cli.output {
                    Output::Human => {
                        println!("ok: {} items; next = {}", valid.items.len(), valid.next);
                        if !served_next.is_empty() && served_next != valid.next {
                            println!("note: served next differs: {}", served_next);
                        }
                    }
                    Output::Json => {
                        #[derive(Serialize)]
                        struct Verdict<'a> {
                            ok: bool,
                            items: usize,
                            next: &'a str,
                        }
                        let v = Verdict { ok: true, items: valid.items.len(), next: &valid.next };
                        println!("{}", serde_json::to_string_pretty(&v)?);
                    }
                },
                Err(e) => {
                    error!(error = %e, "page failed validation");
                    if cli.output == Output::Json {
                        let v = serde_json::json!({ "ok": false, "error": e.to_string() });
                        println!("{}", serde_json::to_string_pretty(&v)?);
                    }
                    return Err(e.into());
                }
            }
        }
        Commands::Paginate { file, page_size, by_change_number } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let updates: Vec<RecordUpdate<AnyId>> =
                serde_json::from_str(&text).context("parse updates JSON")?;
            info!(updates = updates.len(), page_size, by_change_number, "paginate invoked");

            let mut log = ChangeLog::new();
            for u in updates {
                log.apply(u);
            }
            let snap = log.freeze();

            // Walk to the end; the final empty page shows the stable cursor.
            let mut pages: Vec<FeedPage<AnyId>> = Vec::new();
            if by_change_number {
                let mut after = 0i64;
                loop {
                    let page = snap.page_after_change_number(&cli.base_url, after, page_size)?;
                    let done = page.items.is_empty();
                    if let Some(m) = page.items.last().and_then(|i| i.modified) {
                        after = m;
                    }
                    pages.push(page);
                    if done {
                        break;
                    }
                }
            } else {
                let mut after = (0i64, AnyId::Str(String::new()));
                loop {
                    let page = snap.page_after_modified_id(
                        &cli.base_url,
                        after.0,
                        after.1.clone(),
                        page_size,
                    )?;
                    let done = page.items.is_empty();
                    if let Some(last) = page.items.last() {
                        if let (Some(m), Some(id)) = (last.modified, last.id.clone()) {
                            after = (m, id);
                        }
                    }
                    pages.push(page);
                    if done {
                        break;
                    }
                }
            }

            match cli.output {
                Output::Json => println!("{}", serde_json::to_string_pretty(&pages)?),
                Output::Human => {
                    for (n, page) in pages.iter().enumerate() {
                        if page.items.is_empty() {
                            println!("end of feed: next = {}", page.next);
                        } else {
                            println!("-- page {} --", n + 1);
                            for item in &page.items {
                                let mark = if item.is_tombstone() { "-" } else { "+" };
                                println!("{} {}", mark, item_key(item));
                            }
                            println!("   next = {}", page.next);
                        }
                    }
                }
            }
        }
        Commands::Tail { page_size } => {
            info!(page_size, "tail invoked");
            let cap = std::env::var("RPDE_QUEUE_CAP")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(2048);
            let (tx, handle) = spawn_publisher::<AnyId>(cap);
            let mut tx = Some(tx);
            let mut seq_rx = handle.subscribe_seq();
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            let mut cursor = (0i64, AnyId::Str(String::new()));

            loop {
                tokio::select! {
                    maybe = lines.next_line(), if tx.is_some() => {
                        match maybe {
                            Ok(Some(line)) => {
                                let line = line.trim();
                                if line.is_empty() { continue; }
                                match serde_json::from_str::<RecordUpdate<AnyId>>(line) {
                                    Ok(update) => {
                                        if let Some(sender) = tx.as_ref() {
                                            let _ = sender.send(update).await;
                                        }
                                    }
                                    Err(e) => warn!(error = %e, "skipping malformed update line"),
                                }
                            }
                            Ok(None) => {
                                info!("stdin closed; waiting for final flush");
                                tx = None;
                            }
                            Err(e) => {
                                error!(error = %e, "stdin read failed");
                                tx = None;
                            }
                        }
                    }
                    changed = seq_rx.changed() => {
                        drain_new(&handle, &cli.base_url, page_size, &mut cursor)?;
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; shutting down tail loop");
                        break;
                    }
                }
            }
            warn!("tail loop ended (graceful shutdown)");
        }
    }

    Ok(())
}

/// Page forward from the cursor and print every newly surfaced item.
fn drain_new(
    handle: &PublisherHandle<AnyId>,
    base_url: &str,
    page_size: usize,
    cursor: &mut (i64, AnyId),
) -> Result<()> {
    loop {
        let page = handle.page_after_modified_id(base_url, cursor.0, cursor.1.clone(), page_size)?;
        if page.items.is_empty() {
            return Ok(());
        }
        for item in &page.items {
            let mark = if item.is_tombstone() { "-" } else { "+" };
            println!("{} {}", mark, item_key(item));
        }
        if let Some(last) = page.items.last() {
            if let (Some(m), Some(id)) = (last.modified, last.id.clone()) {
                *cursor = (m, id);
            }
        }
    }
}
