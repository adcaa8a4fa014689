//! Run command - reconcile a ledger against a document corpus.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;

use recon_core::report::{SUMMARY_FILE, TOP_MISMATCHES_FILE, VERDICTS_FILE};
use recon_core::{Corpus, Overall, Reconciler, RunOptions};

use super::{document_progress, load_config};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Ledger file (CSV or spreadsheet)
    #[arg(short, long)]
    ledger: PathBuf,

    /// Corpus directory or zip archive
    #[arg(long)]
    corpus: PathBuf,

    /// Reuse an index written by `recon index` instead of re-indexing
    #[arg(long)]
    index: Option<PathBuf>,

    /// Override CSV mapping row_id to a document path
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "recon-out")]
    output_dir: PathBuf,

    /// Only reconcile rows of this ledger section
    #[arg(long)]
    section: Option<String>,

    /// Propose canonical file names for matched documents
    #[arg(long)]
    propose_renames: bool,

    /// Copy matched documents into this directory under their proposed names
    #[arg(long)]
    rename_dir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Skip the amount recheck on mismatched rows
    #[arg(long)]
    no_recheck: bool,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.pdf.jobs = jobs;
    }
    if args.no_recheck {
        config.recheck.enabled = false;
    }

    let pb = if args.index.is_none() && args.corpus.is_dir() {
        let total = Corpus::open(&args.corpus)?.files(&config.pdf)?.len();
        Some(document_progress(total)?)
    } else {
        None
    };

    let options = RunOptions {
        ledger: args.ledger,
        corpus: args.corpus,
        index: args.index,
        overrides: args.overrides,
        out_dir: args.output_dir.clone(),
        section: args.section,
        propose_renames: args.propose_renames,
        rename_dir: args.rename_dir.clone(),
    };

    let reconciler = Reconciler::new(config);
    let outcome = reconciler
        .run_with_progress(&options, |_| {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        })
        .await;
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    let totals = &outcome.summary.totals;
    println!(
        "{} Reconciled {} rows in {:?}",
        style("✓").green(),
        totals.rows,
        start.elapsed()
    );
    println!(
        "   {} ok, {} mismatch ({} ok anywhere), {} missing PDF",
        style(totals.ok).green(),
        style(totals.mismatch).red(),
        style(totals.ok_anywhere).yellow(),
        style(totals.missing_pdf).yellow()
    );

    for (section, counts) in &outcome.summary.by_section {
        println!(
            "   {:<20} {:>5} rows  {:>5} ok  {:>5} mismatch  {:>5} missing",
            section, counts.rows, counts.ok, counts.mismatch, counts.missing_pdf
        );
    }

    let low_confidence = outcome
        .verdicts
        .iter()
        .filter(|v| v.overall != Overall::MissingPdf)
        .filter(|v| v.match_candidate.as_ref().is_some_and(|c| c.confidence < 1.0))
        .count();
    if low_confidence > 0 {
        println!(
            "   {} rows matched with reduced confidence",
            style(low_confidence).yellow()
        );
    }

    if outcome.summary.documents_with_errors > 0 {
        println!();
        println!("{}", style("Unreadable documents:").red());
        for item in &outcome.summary.errors {
            println!("  - {}: {}", item.path.display(), item.error);
        }
    }

    if let Some(dir) = &args.rename_dir {
        println!(
            "{} Copied {} documents to {}",
            style("✓").green(),
            outcome.renamed.len(),
            dir.display()
        );
    }

    println!();
    println!("Reports in {}:", args.output_dir.display());
    for file in [VERDICTS_FILE, SUMMARY_FILE, TOP_MISMATCHES_FILE] {
        println!("  - {}", file);
    }

    Ok(())
}
