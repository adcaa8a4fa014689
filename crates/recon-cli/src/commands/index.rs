//! Index command - extract the flat document index of a corpus.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;

use recon_core::index::write_index_csv;
use recon_core::{Corpus, DocumentTextCache, Reconciler};

use super::{document_progress, load_config};

/// Arguments for the index command.
#[derive(Args)]
pub struct IndexArgs {
    /// Corpus directory or zip archive
    #[arg(required = true)]
    corpus: PathBuf,

    /// Output CSV file
    #[arg(short, long, default_value = "index.csv")]
    output: PathBuf,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub async fn run(args: IndexArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.pdf.jobs = jobs;
    }

    let corpus = Corpus::open(&args.corpus)?;
    let total = corpus.files(&config.pdf)?.len();
    println!(
        "{} Found {} documents in {}",
        style("ℹ").blue(),
        total,
        args.corpus.display()
    );

    let pb = document_progress(total)?;
    let reconciler = Reconciler::new(config);
    let cache = DocumentTextCache::new();
    let records = reconciler
        .index_corpus(&corpus, &cache, |_| pb.inc(1))
        .await?;
    pb.finish_and_clear();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_index_csv(&args.output, &records)?;

    let failed: Vec<_> = records.iter().filter(|r| r.is_failed()).collect();
    println!(
        "{} Indexed {} documents in {:?}",
        style("✓").green(),
        records.len(),
        start.elapsed()
    );
    println!(
        "   {} readable, {} with errors",
        style(records.len() - failed.len()).green(),
        style(failed.len()).red()
    );
    println!("   Index written to {}", args.output.display());

    if !failed.is_empty() {
        println!();
        println!("{}", style("Unreadable documents:").red());
        for record in &failed {
            println!(
                "  - {}: {}",
                record.source_path.display(),
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}
