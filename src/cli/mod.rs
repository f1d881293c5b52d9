//! Command-line interface.

pub mod args;

use anyhow::Context;
use clap::Parser;
use std::io::Write;

use crate::config::Settings;
use crate::graph::MemoryIngestor;
use crate::pipeline::GraphPipeline;
use args::{Cli, Command};

/// Entry point for the `codegraph` binary.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Index(args) => run_index(args),
    }
}

fn run_index(args: args::IndexArgs) -> anyhow::Result<()> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path).context("loading configuration file")?,
        None => Settings::load().context("loading configuration")?,
    };
    args.apply_to(&mut settings);
    crate::logging::init_with_config(&settings.logging);

    let pipeline = GraphPipeline::new(&settings, &args.path)
        .with_context(|| format!("opening repository at {}", args.path.display()))?;

    let pipeline = if args.progress {
        let bar = indicatif::ProgressBar::new_spinner();
        bar.set_style(
            indicatif::ProgressStyle::with_template("{spinner} {msg}")
                .expect("valid progress template"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        pipeline.with_progress(Box::new(move |stage, _payload| {
            bar.set_message(format!("stage: {stage}"));
        }))
    } else {
        pipeline
    };

    let mut ingestor = MemoryIngestor::new();
    let stats = pipeline.run(&mut ingestor)?;

    if let Some(output) = &args.output {
        let json = ingestor.to_json().context("serializing graph")?;
        let mut file = std::fs::File::create(output)
            .with_context(|| format!("creating {}", output.display()))?;
        file.write_all(json.as_bytes())?;
        eprintln!("Graph written to {}", output.display());
    }

    eprintln!(
        "Indexed {} files ({} skipped, {} edge-only, {} failed, {} deleted) \
         into {} nodes and {} relationships in {:.2?}{}",
        stats.files_parsed,
        stats.files_skipped,
        stats.edge_only_updates,
        stats.files_failed,
        stats.files_deleted,
        ingestor.node_count(),
        ingestor.relationship_count(),
        stats.elapsed,
        if stats.cancelled { " (cancelled)" } else { "" },
    );
    Ok(())
}
