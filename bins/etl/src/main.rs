//! Starlift pipeline runner.
//!
//! Usage:
//!   etl full            - Re-read every source from the beginning
//!   etl incremental     - Read only past the last succeeded watermarks
//!
//! Flags (combinable): --skip-fx --skip-oltp --skip-json
//!
//! Exits non-zero only on a fatal error; per-record rejections are
//! summarized and do not fail the run.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use starlift_db::{Pipeline, RunMode, RunOptions};
use starlift_shared::EtlConfig;

// Targets follow the crate names, not the workspace prefix.
const DEFAULT_LOG_FILTER: &str = "etl=info,starlift_db=info,starlift_core=info,starlift_shared=info";

fn parse_args() -> Result<RunOptions, String> {
    let mut options = RunOptions::default();
    let mut mode_seen = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "full" => {
                options.mode = RunMode::Full;
                mode_seen = true;
            }
            "incremental" => {
                options.mode = RunMode::Incremental;
                mode_seen = true;
            }
            "--skip-fx" => options.skip_fx = true,
            "--skip-oltp" => options.skip_oltp = true,
            "--skip-json" => options.skip_json = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }

    if !mode_seen {
        return Err("expected a run mode: 'full' or 'incremental'".to_string());
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: etl <full|incremental> [--skip-fx] [--skip-oltp] [--skip-json]");
            return ExitCode::from(2);
        }
    };

    let config = match EtlConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::connect(config).await {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!(error = %err, "failed to connect to the warehouse");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(&options).await {
        Ok(summary) => {
            info!(rejected = summary.rejections.len(), "pipeline finished");
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "pipeline run failed");
            ExitCode::FAILURE
        }
    }
}
