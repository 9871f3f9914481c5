use std::path::PathBuf;

use anyhow::{Context, Result};
use chatwire_events::{
    EventRegistry, EventRegistryBuilder, EventView, GenericEvent, ReceiptEvent, RedactionEvent,
    RoomEvent, RoomTombstoneEvent, StateEvent,
};
use chatwire_protocol::StructuredPayload;
use clap::Parser;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chatwire")]
#[command(about = "Inspect chat protocol wire events from JSON Lines input")]
struct Cli {
    /// JSON Lines file to read; stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Print each event re-serialized instead of a summary.
    #[arg(long)]
    raw: bool,
    /// Treat input as room timeline events.
    #[arg(long)]
    room: bool,
    /// Log filter; falls back to `RUST_LOG`, then `info`.
    #[arg(long, env = "CHATWIRE_LOG")]
    log_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
struct InspectOptions {
    raw: bool,
    room: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct InspectStats {
    typed: usize,
    generic: usize,
    fallback: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log_filter.as_deref()))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let registry = EventRegistryBuilder::with_core_events().build();
    let options = InspectOptions {
        raw: cli.raw,
        room: cli.room,
    };
    let mut stdout = tokio::io::stdout();

    let stats = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("failed opening event input {path:?}"))?;
            inspect(BufReader::new(file), &registry, options, &mut stdout).await?
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            inspect(stdin, &registry, options, &mut stdout).await?
        }
    };

    info!(
        typed = stats.typed,
        generic = stats.generic,
        fallback = stats.fallback,
        skipped = stats.skipped,
        "input processed"
    );
    Ok(())
}

async fn inspect<R, W>(
    reader: R,
    registry: &EventRegistry,
    options: InspectOptions,
    out: &mut W,
) -> Result<InspectStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = InspectStats::default();
    let mut line_no = 0_usize;

    while let Some(line) = lines.next_line().await.context("failed reading input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let payload = match StructuredPayload::from_json_str(&line) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(line = line_no, %error, "skipping line that is not an event object");
                stats.skipped += 1;
                continue;
            }
        };

        let event = if options.room {
            registry.parse_room_event(payload)
        } else {
            registry.parse(payload)
        };

        if event.is::<GenericEvent>() {
            stats.generic += 1;
        } else if event.is::<RoomEvent>() || event.is::<StateEvent>() {
            stats.fallback += 1;
        } else {
            stats.typed += 1;
        }
        debug!(line = line_no, event_type = event.event_type(), "event parsed");

        let rendered = if options.raw {
            serde_json::to_string(event.raw_payload()).context("failed serializing event")?
        } else {
            summarize(&*event)
        };
        out.write_all(rendered.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }

    out.flush().await?;
    Ok(stats)
}

fn log_filter(explicit: Option<&str>) -> EnvFilter {
    match explicit {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn summarize(event: &dyn EventView) -> String {
    let event_type = match event.event_type() {
        "" => "<untyped>",
        other => other,
    };

    if let Some(redaction) = event.downcast_ref::<RedactionEvent>() {
        format!(
            "{event_type} redacts={} reason={:?}",
            redaction.redacted_event(),
            redaction.reason()
        )
    } else if let Some(tombstone) = event.downcast_ref::<RoomTombstoneEvent>() {
        format!(
            "{event_type} successor={} message={:?}",
            tombstone.successor_room_id(),
            tombstone.server_message()
        )
    } else if let Some(receipt) = event.downcast_ref::<ReceiptEvent>() {
        let events = receipt.events_with_receipts();
        let receipts: usize = events.iter().map(|entry| entry.receipts.len()).sum();
        format!("{event_type} events={} receipts={receipts}", events.len())
    } else if event.is::<GenericEvent>() {
        format!("{event_type} generic keys={}", event.raw_payload().len())
    } else {
        format!("{event_type} content_keys={}", event.content().len())
    }
}
