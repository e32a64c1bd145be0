//! BiomeForge CLI
//!
//! Generates a batch of unique biomes into a timestamped run directory.
//! Progress goes to the log; the batch report is printed as JSON to stdout.
//! Exit codes: 1 load failure, 2 run failure, 3 table check errors.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biomeforge_core::{
    compute_manifest_hash, AttributeResolver, BiomeManifest, BiomePipeline, FsArtifactStore,
    HttpRandomSource, LayeredCompositor, PipelineOptions, RandomSource, RetryPolicy,
    SeededRandomSource, TableValidator, ViolationSeverity,
};

#[derive(Parser)]
#[command(name = "biomeforge-cli")]
#[command(about = "BiomeForge CLI - unique layered biome generator")]
struct Cli {
    /// Number of biomes to produce
    #[arg(default_value_t = 20)]
    count: u32,

    /// Path to the biome manifest
    #[arg(short, long, default_value = "biomes.json")]
    manifest: PathBuf,

    /// Root directory for run output
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Draw from a seeded generator instead of the HTTP random source
    #[arg(long)]
    seed: Option<u64>,

    /// Give up on a slot after this many draws
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Give up after this many duplicate reconciliation rounds
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_rounds: Option<u32>,

    /// Only check the manifest tables and print the findings
    #[arg(long)]
    check: bool,
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!(r#"{{"error": "Failed to serialize output: {}"}}"#, e),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biomeforge_core=info,biomeforge_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let manifest = match BiomeManifest::load(&cli.manifest) {
        Ok(m) => m,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to load manifest: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    let report = TableValidator::new().validate(&manifest);
    if cli.check {
        print_json(&report);
        return if report.valid { ExitCode::SUCCESS } else { ExitCode::from(3) };
    }
    for violation in report.by_severity(ViolationSeverity::Warning) {
        tracing::warn!(rule = %violation.rule, "{}", violation.message);
    }
    if !report.valid {
        print_json(&report);
        return ExitCode::from(3);
    }

    let source: Box<dyn RandomSource> = match cli.seed {
        Some(seed) => match SeededRandomSource::new(seed, manifest.draw_domain) {
            Ok(source) => {
                tracing::info!(seed, "Using seeded random source");
                Box::new(source)
            }
            Err(e) => {
                eprintln!(r#"{{"error": "{}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
        None => match HttpRandomSource::new(manifest.random_source.clone(), manifest.draw_domain) {
            Ok(source) => {
                tracing::info!(url = source.url(), "Using HTTP random source");
                Box::new(source)
            }
            Err(e) => {
                eprintln!(r#"{{"error": "{}"}}"#, e);
                return ExitCode::FAILURE;
            }
        },
    };

    let store = match FsArtifactStore::create_run_dir(&cli.output) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to create output directory: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };
    let run_dir = store.dir().to_path_buf();

    let options = PipelineOptions {
        retry: cli.max_attempts.map_or(RetryPolicy::Unbounded, RetryPolicy::MaxAttempts),
        max_rounds: cli.max_rounds,
    };
    let mut pipeline = BiomePipeline::new(
        AttributeResolver::from_manifest(&manifest),
        source,
        LayeredCompositor::from_manifest(&manifest),
        store,
    )
    .with_options(options);

    match pipeline.run(cli.count) {
        Ok(batch) => {
            println!("{}", "-".repeat(60));
            println!("Total time for {} biomes was: {:.3}s", cli.count, batch.elapsed_secs);
            let output = serde_json::json!({
                "success": true,
                "manifestHash": compute_manifest_hash(&manifest).ok(),
                "outputDir": run_dir,
                "batch": batch,
            });
            print_json(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let output = serde_json::json!({
                "success": false,
                "outputDir": run_dir,
                "error": e.to_string(),
            });
            print_json(&output);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bounds_refused() {
        assert!(Cli::try_parse_from(["biomeforge-cli", "--max-attempts", "0"]).is_err());
        assert!(Cli::try_parse_from(["biomeforge-cli", "--max-rounds", "0"]).is_err());

        let cli = Cli::try_parse_from(["biomeforge-cli", "5", "--max-attempts", "1", "--max-rounds", "1"]).unwrap();
        assert_eq!(cli.count, 5);
        assert_eq!(cli.max_attempts, Some(1));
        assert_eq!(cli.max_rounds, Some(1));
    }
}
