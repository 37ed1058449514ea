//! Command implementations for the `brain` binary.
//!
//! Handlers write to any `Write` and read confirmations from any `BufRead`
//! so they can be driven from tests.

use std::fs;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use tracing::{debug, info};

use brain_embeddings::embedder_from_settings;
use brain_service::{Listing, RecallEngine, ScoredResult};
use brain_storage::RecordStore;
use brain_types::{MemoryRecord, MetadataValue, Settings};

use crate::cli::{Cli, Commands};
use crate::render::{relative_time, score_label, truncate_preview};

const RULE_WIDTH: usize = 60;

/// Load settings and apply CLI flags (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(path) = &cli.storage_path {
        settings.storage_path = path.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    if let Some(embedder) = cli.embedder {
        settings.embedder.provider = embedder.into();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the store and embedder named by `settings`.
pub fn open_engine(settings: &Settings) -> Result<RecallEngine> {
    let storage_path = settings.expanded_storage_path();
    fs::create_dir_all(&storage_path).with_context(|| {
        format!("Failed to create storage directory {}", storage_path.display())
    })?;

    let embedder = embedder_from_settings(&settings.embedder, settings.expanded_cache_dir())
        .context("Failed to load embedding model")?;
    let store = RecordStore::open(&storage_path, embedder.info().dimension)
        .with_context(|| format!("Failed to open record store at {}", storage_path.display()))?;

    RecallEngine::new(embedder, Arc::new(store), settings).context("Failed to start recall engine")
}

/// Parse, configure, and dispatch one invocation.
pub fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;
    debug!(storage = %settings.storage_path, "Configuration loaded");

    let engine = open_engine(&settings)?;
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout().lock();

    dispatch(&engine, &settings, cli.command, &mut input, &mut out)
}

/// Run a parsed command against an open engine.
pub fn dispatch<R: BufRead, W: Write>(
    engine: &RecallEngine,
    settings: &Settings,
    command: Commands,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    match command {
        Commands::Add { text, no_confirm } => {
            let confirm = settings.cli.confirm_before_save && !no_confirm;
            handle_add(engine, &text.join(" "), confirm, input, out)
        }
        Commands::Recall {
            query,
            limit,
            threshold,
            debug,
        } => handle_recall(engine, &query.join(" "), limit, threshold, debug, out),
        Commands::List { query, limit } => {
            let query = query.join(" ");
            let query = (!query.trim().is_empty()).then_some(query);
            handle_list(engine, settings, query.as_deref(), limit, out)
        }
        Commands::Get { id } => handle_get(engine, &id, out),
        Commands::Delete { id, yes } => handle_delete(engine, &id, yes, input, out),
        Commands::Clear { yes } => handle_clear(engine, yes, input, out),
        Commands::Stats => handle_stats(engine, settings, out),
    }
}

/// Ask a yes/no question. An empty answer or end of input takes `default`.
pub fn confirm<R: BufRead, W: Write>(
    prompt: &str,
    default: bool,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    write!(out, "{prompt} {hint} ")?;
    out.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

fn print_empty_brain<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Your brain is empty! Add some memories first.")?;
    writeln!(out, "\nTry: brain add \"your memory here\"")?;
    Ok(())
}

pub fn handle_add<R: BufRead, W: Write>(
    engine: &RecallEngine,
    text: &str,
    ask: bool,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Memory text cannot be empty");
    }

    if ask {
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        writeln!(out, "Memory ready to save:\n\n{text}\n")?;
        writeln!(out, "Timestamp: {}", Local::now().format("%b %d, %Y at %I:%M %p"))?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
        if !confirm("Save this memory?", true, input, out)? {
            writeln!(out, "Cancelled")?;
            return Ok(());
        }
    }

    let record = engine.add(text).context("Failed to add memory")?;
    writeln!(out, "Memory saved! [ID: {}]", record.short_id())?;
    Ok(())
}

pub fn handle_recall<W: Write>(
    engine: &RecallEngine,
    query: &str,
    limit: Option<usize>,
    threshold: Option<f64>,
    debug: bool,
    out: &mut W,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query cannot be empty");
    }
    if engine.count()? == 0 {
        return print_empty_brain(out);
    }

    let now = Utc::now();
    let results = engine
        .recall_with(query, limit, threshold, now)
        .context("Failed to recall memories")?;

    if results.is_empty() {
        writeln!(out, "No confident matches found for: \"{query}\"")?;
        writeln!(
            out,
            "\n(Try lowering the threshold with --threshold or use 'brain list' to see all memories)"
        )?;
        return Ok(());
    }

    writeln!(out, "\nFound {} matching memories:\n", results.len())?;
    for (i, result) in results.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, result.record.text)?;
        write_scored_meta(out, result, now)?;
        if debug {
            writeln!(
                out,
                "   Debug: similarity={:.3}, recency={:.3}, distance={:.3}",
                result.scores.similarity, result.scores.recency, result.scores.distance
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_scored_meta<W: Write>(
    out: &mut W,
    result: &ScoredResult,
    now: chrono::DateTime<Utc>,
) -> Result<()> {
    let score = result.score();
    writeln!(
        out,
        "   [{}] · {} · Score: {:.2} ({})",
        result.short_id,
        relative_time(&result.record.metadata.created_at, now),
        score,
        score_label(score)
    )?;
    Ok(())
}

pub fn handle_list<W: Write>(
    engine: &RecallEngine,
    settings: &Settings,
    query: Option<&str>,
    limit: Option<usize>,
    out: &mut W,
) -> Result<()> {
    let total = engine.count()?;
    if total == 0 {
        return print_empty_brain(out);
    }

    let now = Utc::now();
    let max_chars = settings.cli.preview_max_length;
    match engine.list(query, limit, now).context("Failed to list memories")? {
        Listing::Ranked(results) => {
            let query = query.unwrap_or_default();
            if results.is_empty() {
                writeln!(out, "No memories found matching: \"{query}\"")?;
                return Ok(());
            }
            writeln!(out, "\nMemories matching \"{query}\" ({} results)\n", results.len())?;
            for (i, result) in results.iter().enumerate() {
                writeln!(out, "{}. {}", i + 1, truncate_preview(&result.record.text, max_chars))?;
                write_scored_meta(out, result, now)?;
                writeln!(out)?;
            }
        }
        Listing::Recent(records) => {
            writeln!(out, "\nAll memories ({} of {total})\n", records.len())?;
            for (i, record) in records.iter().enumerate() {
                writeln!(out, "{}. {}", i + 1, truncate_preview(&record.text, max_chars))?;
                writeln!(
                    out,
                    "   [{}] · {}",
                    record.short_id(),
                    relative_time(&record.metadata.created_at, now)
                )?;
                writeln!(out)?;
            }
        }
    }
    Ok(())
}

/// Mention when a short id matched several records.
fn note_ambiguity<W: Write>(engine: &RecallEngine, id: &str, out: &mut W) -> Result<()> {
    let matches = engine.matching_ids(id)?;
    if matches.len() > 1 {
        writeln!(
            out,
            "Note: {} memories share the id prefix \"{id}\"; using the most recent.",
            matches.len()
        )?;
    }
    Ok(())
}

fn write_record<W: Write>(out: &mut W, record: &MemoryRecord) -> Result<()> {
    writeln!(out, "[{}] {}", record.short_id(), record.text)?;
    writeln!(out, "Added: {}", relative_time(&record.metadata.created_at, Utc::now()))?;
    Ok(())
}

pub fn handle_get<W: Write>(engine: &RecallEngine, id: &str, out: &mut W) -> Result<()> {
    let Some(record) = engine.get(id)? else {
        writeln!(out, "Memory not found: {id}")?;
        writeln!(out, "\nUse 'brain list' to see all memory IDs")?;
        return Ok(());
    };

    note_ambiguity(engine, id, out)?;
    write_record(out, &record)?;
    writeln!(out, "ID: {}", record.id)?;
    writeln!(out, "Created: {}", record.metadata.created_at)?;
    for (key, value) in &record.metadata.extra {
        let value = match value {
            MetadataValue::Text(s) => s.clone(),
            MetadataValue::Integer(n) => n.to_string(),
            MetadataValue::Float(f) => f.to_string(),
            MetadataValue::Bool(b) => b.to_string(),
        };
        writeln!(out, "{key}: {value}")?;
    }
    Ok(())
}

pub fn handle_delete<R: BufRead, W: Write>(
    engine: &RecallEngine,
    id: &str,
    yes: bool,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let Some(record) = engine.get(id)? else {
        writeln!(out, "Memory not found: {id}")?;
        writeln!(out, "\nUse 'brain list' to see all memory IDs")?;
        return Ok(());
    };

    note_ambiguity(engine, id, out)?;
    writeln!(out, "\nAbout to delete:\n")?;
    write_record(out, &record)?;
    writeln!(out)?;

    if !yes && !confirm("Delete this memory?", false, input, out)? {
        writeln!(out, "Cancelled")?;
        return Ok(());
    }

    // Delete by full id so the confirmed record is the one removed.
    if engine.delete(&record.id)? {
        info!(id = %record.id, "Memory deleted via CLI");
        writeln!(out, "Memory deleted")?;
        Ok(())
    } else {
        bail!("Failed to delete memory: {id}")
    }
}

pub fn handle_clear<R: BufRead, W: Write>(
    engine: &RecallEngine,
    yes: bool,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let total = engine.count()?;
    if total == 0 {
        writeln!(out, "Your brain is already empty!")?;
        return Ok(());
    }

    writeln!(out, "\nWARNING: This will delete ALL {total} memories!")?;
    writeln!(out, "This action CANNOT be undone.\n")?;

    if !yes {
        if !confirm("Are you absolutely sure?", false, input, out)? {
            writeln!(out, "Cancelled")?;
            return Ok(());
        }
        if !confirm("Really delete everything?", false, input, out)? {
            writeln!(out, "Cancelled")?;
            return Ok(());
        }
    }

    let removed = engine.clear().context("Failed to clear memories")?;
    writeln!(out, "Deleted all {removed} memories")?;
    Ok(())
}

pub fn handle_stats<W: Write>(
    engine: &RecallEngine,
    settings: &Settings,
    out: &mut W,
) -> Result<()> {
    let stats = engine.stats().context("Failed to read statistics")?;

    writeln!(out, "\nSecond Brain statistics\n")?;
    writeln!(out, "Total memories: {}", stats.record_count)?;
    if let Some(latest) = &stats.latest_created_at {
        writeln!(out, "Latest memory:  {}", relative_time(latest, Utc::now()))?;
    }
    writeln!(out, "Model:          {} ({} dimensions)", stats.model_name, stats.dimension)?;
    writeln!(out, "Storage:        {}", stats.storage_path.display())?;
    writeln!(out, "Disk usage:     {} KB", stats.disk_usage_bytes / 1024)?;

    let scoring = &settings.scoring;
    writeln!(out, "\nConfiguration:")?;
    writeln!(out, "  Similarity weight:    {}", scoring.similarity_weight)?;
    writeln!(out, "  Recency weight:       {}", scoring.recency_weight)?;
    writeln!(out, "  Recency decay rate:   {}", scoring.recency_decay_rate)?;
    writeln!(out, "  Confidence threshold: {}", scoring.confidence_threshold)?;
    writeln!(out, "  Top results:          {}", settings.retrieval.top_n_results)?;
    Ok(())
}
