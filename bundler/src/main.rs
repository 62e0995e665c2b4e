// Copyright (c) The incremental-bundler Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Context, Result};
use bundler::{BundlerConfig, GraphOptions, IncrementalBundler};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(about = "Incremental JavaScript module bundler")]
struct Args {
    /// Path to a JSON configuration file (spec §6, "Configuration surface").
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a graph from an entry point and print a summary of the initial delta.
    Build {
        entry: Utf8PathBuf,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        dev: Option<bool>,
        #[arg(long)]
        minify: Option<bool>,
    },
}

fn load_config(path: Option<&Utf8PathBuf>) -> Result<BundlerConfig> {
    match path {
        None => Ok(BundlerConfig::default()),
        Some(path) => {
            let contents = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
            serde_json::from_str(&contents).with_context(|| format!("parsing config file {}", path))
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.cmd {
        Command::Build { entry, platform, dev, minify } => {
            let transformer = Arc::new(NoopTransformer);
            let bundler = IncrementalBundler::new(config, transformer);
            let graph_options = GraphOptions { platform, dev, minify };
            let (graph_id, revision) = bundler.build_graph(&entry, graph_options).context("building graph")?;
            let delta = bundler.get_delta(graph_id, None).context("computing initial delta")?;
            println!(
                "graph {} at revision {}: {} added, {} modified, {} deleted",
                graph_id,
                revision,
                delta.added().len(),
                delta.modified().len(),
                delta.deleted().len()
            );
            bundler.end_graph(graph_id).context("ending graph")?;
            Ok(())
        }
    }
}

/// A pass-through [`bundler_transform::Transformer`] used when no real transformer
/// plugin is configured: it returns the source unchanged and reports no
/// dependencies. Real deployments supply their own (spec §1, "Deliberately out of
/// scope": the concrete AST transformer is a pluggable external collaborator).
struct NoopTransformer;

impl bundler_transform::Transformer for NoopTransformer {
    fn transform(&self, _path: &camino::Utf8Path, source: &str, _options: &bundler_transform::TransformOptions) -> Result<bundler_transform::RawTransformOutput, String> {
        Ok(bundler_transform::RawTransformOutput {
            code: source.to_string(),
            dependencies: Vec::new(),
            foldable: Vec::new(),
        })
    }
}
