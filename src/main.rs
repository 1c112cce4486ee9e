use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modelgen::run_emit::run_emit;
use modelgen::settings::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generates model and call classes from a JSON-RPC introspection document")]
struct Args {
    /// Config file to read instead of ./modelgen.toml
    #[arg(long, short)]
    config: Option<String>,
    /// Introspection file, or http(s) URL of a JSON-RPC endpoint
    #[arg(long)]
    source: Option<String>,
    /// Existing directory the generated files are written to
    #[arg(long)]
    output_dir: Option<String>,
    /// Only generate model classes
    #[arg(long)]
    skip_methods: bool,
    /// Log the resolved descriptor tree
    #[arg(long)]
    dump: bool,
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings = Settings::new(
        args.config.as_deref(),
        Overrides {
            introspect_source: args.source,
            output_dir: args.output_dir,
            skip_method_generation: args.skip_methods,
            dump: args.dump,
            debug: args.verbose,
        },
    )
    .context("Failed to create settings")?;

    let filter = if settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(?settings, "loaded settings");

    let written = run_emit(&settings).await?;
    info!(files = written.len(), output_dir = %settings.output_dir, "generation finished");

    Ok(())
}
