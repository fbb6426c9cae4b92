//! # Draftsafe Editor
//!
//! A line-based terminal editor built on the Draftsafe SDK. Every line typed
//! becomes a paragraph; the auto-save coordinator writes local drafts and
//! syncs to a "server" directory in the background.
//!
//! ## Storage layout
//!
//! ```text
//! <cache-dir>/draft_<doc-id>.json    →  local draft (crash recovery)
//! <server-dir>/<doc-id>.json         →  last saved content
//! ```

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use draftsafe_sdk::prelude::*;
use draftsafe_sdk::{DocumentId, DraftStore, LocalDraft, SystemClock};
use server::DirectoryPersistence;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

type Editor = AutoSaveCoordinator<Arc<DirectoryPersistence>, FileCache, TokioClock>;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "draftsafe-editor")]
#[command(about = "Terminal editor with auto-save and draft recovery (Draftsafe SDK)")]
#[command(version)]
struct Cli {
    /// Directory holding local drafts
    #[arg(long, global = true, default_value = ".draftsafe/cache")]
    cache_dir: PathBuf,

    /// Directory standing in for the document server
    #[arg(long, global = true, default_value = ".draftsafe/server")]
    server_dir: PathBuf,

    /// Quiet period before the local draft is written
    #[arg(long, global = true, default_value_t = 1_000)]
    debounce_ms: u64,

    /// Background sync interval (0 disables)
    #[arg(long, global = true, default_value_t = 30_000)]
    periodic_ms: u64,

    /// Make every save fail, to exercise draft recovery
    #[arg(long, global = true)]
    fail_saves: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a document and edit it line by line
    Edit { doc_id: String },
    /// List local drafts and their age
    Drafts,
    /// Delete the local draft of a document
    Discard { doc_id: String },
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn warn_line(text: &str) {
    println!("  {} {}", "!".bright_red(), text);
}

fn colored_status(status: &SaveStatus) -> ColoredString {
    let summary = status.summary();
    match status.state {
        SaveState::Saving => summary.bright_yellow(),
        SaveState::Saved if !status.has_unsaved_changes => summary.bright_green(),
        SaveState::Error => summary.bright_red().bold(),
        _ if status.has_unsaved_changes => summary.yellow(),
        _ => summary.dimmed(),
    }
}

fn show_document(paragraphs: &[String]) {
    let border = "─".repeat(56);
    println!("  ┌{}┐", border);
    if paragraphs.is_empty() {
        println!("  │ {:^54} │", "(empty document)".dimmed().to_string());
    }
    for (i, text) in paragraphs.iter().enumerate() {
        println!("  │ {:>3} {:<50} │", (i + 1).to_string().dimmed(), text);
    }
    println!("  └{}┘", border);
}

fn format_age(age_ms: u64) -> String {
    let age = chrono::Duration::milliseconds(age_ms as i64);
    if age.num_hours() > 0 {
        format!("{}h {}m ago", age.num_hours(), age.num_minutes() % 60)
    } else if age.num_minutes() > 0 {
        format!("{}m ago", age.num_minutes())
    } else {
        format!("{}s ago", age.num_seconds())
    }
}

/// Editable paragraphs of `content`; a lone empty paragraph counts as none.
fn paragraphs_of(content: Option<ContentValue>) -> Vec<String> {
    let texts = content.map(|c| c.paragraph_texts()).unwrap_or_default();
    if texts.len() == 1 && texts[0].is_empty() {
        Vec::new()
    } else {
        texts
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, text: &str) -> anyhow::Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

// ─── Commands ──────────────────────────────────────────────────────────────

/// Offer a fresh local draft for recovery. Returns true if it was restored.
async fn offer_recovery(
    editor: &Editor,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<bool> {
    let Some(draft) = editor.recovery_offer() else {
        return Ok(false);
    };

    println!(
        "\n{} {}",
        "▸".bright_yellow(),
        "Unsaved changes found from a previous session".bold()
    );
    println!(
        "  Saved locally {}",
        format_age(draft.age_ms(editor.clock().now_ms())).bright_magenta()
    );
    show_document(&paragraphs_of(Some(draft.content.clone())));

    loop {
        let answer = prompt(lines, &format!("  Restore it? {} ", "[y/n]".bright_cyan())).await?;
        match answer.as_deref().map(str::trim) {
            Some("y") | Some("Y") | Some("yes") => {
                editor.restore_from_local_draft();
                step("Draft restored");
                return Ok(true);
            }
            Some("n") | Some("N") | Some("no") | None => {
                editor.discard_local_draft();
                step("Draft discarded");
                return Ok(false);
            }
            Some(_) => continue,
        }
    }
}

async fn run_edit(cli: &Cli, doc_id: &str) -> anyhow::Result<()> {
    let id = DocumentId::parse(doc_id)?;
    let cache = FileCache::open(&cli.cache_dir)
        .with_context(|| format!("opening cache {}", cli.cache_dir.display()))?;
    let server = Arc::new(
        DirectoryPersistence::open(&cli.server_dir)
            .with_context(|| format!("opening server dir {}", cli.server_dir.display()))?,
    );
    server.set_offline(cli.fail_saves);

    let initial = server
        .load(&id)
        .with_context(|| format!("loading {}", id))?
        .unwrap_or(serde_json::Value::Null);

    let config = AutoSaveConfigBuilder::new()
        .local_debounce(cli.debounce_ms)
        .periodic_sync(cli.periodic_ms)
        .build();
    let editor = Arc::new(
        AutoSaveCoordinator::new(doc_id, server.clone(), cache, TokioClock::new(), config)
            .with_initial_content(initial),
    );

    header(&format!("DRAFTSAFE · {}", id));
    println!(
        "  {} {}   {} {}",
        "server:".dimmed(),
        server.root().display(),
        "drafts:".dimmed(),
        cli.cache_dir.display()
    );
    if cli.fail_saves {
        warn_line("Saves will fail (--fail-saves)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    offer_recovery(&editor, &mut lines).await?;

    let mut paragraphs = paragraphs_of(editor.content());
    show_document(&paragraphs);
    println!(
        "  {}  {} save  {} status  {} print  {} quit",
        "Type a line to add a paragraph.".dimmed(),
        ":w".bright_cyan(),
        ":s".bright_cyan(),
        ":p".bright_cyan(),
        ":q".bright_cyan()
    );

    let driver = spawn_driver(editor.clone());

    let mut status_rx = editor.subscribe_status();
    let status_printer = tokio::spawn(async move {
        let mut last = status_rx.borrow().clone();
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            if status.state != last.state || status.error != last.error {
                println!("  {} {}", "◆".bright_blue(), colored_status(&status));
            }
            last = status;
        }
    });

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":q" => break,
            ":w" => match editor.save().await {
                Ok(()) => step("Saved"),
                Err(e) => warn_line(&format!("Save failed: {}", e)),
            },
            ":s" => println!("  {}", colored_status(&editor.status())),
            ":p" => show_document(&paragraphs),
            _ => {
                paragraphs.push(line);
                editor.update_content(ContentValue::from_paragraphs(&paragraphs));
            }
        }
    }

    if editor.status().has_unsaved_changes {
        match editor.save().await {
            Ok(()) => step("Changes saved"),
            Err(e) => warn_line(&format!(
                "Could not save ({}); your draft is kept for next time",
                e
            )),
        }
    }

    driver.shutdown().await;
    status_printer.abort();
    println!("  {}", "Goodbye!".dimmed());
    Ok(())
}

fn run_drafts(cli: &Cli) -> anyhow::Result<()> {
    let drafts = DraftStore::new(FileCache::open(&cli.cache_dir)?).list()?;
    let now = SystemClock.now_ms();
    let freshness = AutoSaveConfig::default().draft_freshness_ms;

    header("LOCAL DRAFTS");
    if drafts.is_empty() {
        println!("  {}", "(no drafts)".dimmed());
        return Ok(());
    }
    for draft in &drafts {
        print_draft(draft, now, freshness);
    }
    Ok(())
}

fn print_draft(draft: &LocalDraft, now: u64, freshness: u64) {
    let label = if draft.is_fresh(now, freshness) {
        "recoverable".bright_green()
    } else {
        "stale".dimmed()
    };
    println!(
        "  {:<24} {:>14}  {:>3} paragraphs  {}",
        draft.document_id.bright_magenta().to_string(),
        format_age(draft.age_ms(now)),
        paragraphs_of(Some(draft.content.clone())).len(),
        label
    );
}

fn run_discard(cli: &Cli, doc_id: &str) -> anyhow::Result<()> {
    let id = DocumentId::parse(doc_id)?;
    let store = DraftStore::new(FileCache::open(&cli.cache_dir)?);
    if store.load(&id)?.is_none() {
        warn_line(&format!("No draft for '{}'", id));
        return Ok(());
    }
    store.remove(&id)?;
    step(&format!("Discarded draft for '{}'", id));
    Ok(())
}

// ─── Entry point ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Edit { doc_id } => run_edit(&cli, doc_id).await,
        Commands::Drafts => run_drafts(&cli),
        Commands::Discard { doc_id } => run_discard(&cli, doc_id),
    }
}
