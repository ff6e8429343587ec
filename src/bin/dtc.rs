//! dtc: Aparavi DTC 命令行工具
//!
//! Command-line front end for the DTC client: validate and run pipelines, inspect and
//! stop tasks, push files to webhook tasks.

use anyhow::{bail, Context, Result};
use aparavi_dtc_sdk::client::{DEFAULT_POLL_ATTEMPTS, DEFAULT_TASK_TYPE};
use aparavi_dtc_sdk::pipelines::{resolve_pipeline, PredefinedPipeline};
use aparavi_dtc_sdk::{
    DtcClient, PollPolicy, UploadEncoding, WorkflowOutcome, WorkflowOutput, WorkflowRequest,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Client for the Aparavi Data Toolchain web services.
#[derive(Parser)]
#[command(name = "dtc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the web services
    #[arg(long, env = "DTC_BASE_URL", global = true)]
    base_url: Option<String>,

    /// API key sent as a bearer token
    #[arg(long, env = "DTC_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "DTC_HTTP_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv); -vv also logs response bodies
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the web services version
    Version,

    /// List the predefined pipelines bundled with the SDK
    Pipelines,

    /// Validate a pipeline (predefined name or JSON/YAML file)
    Validate {
        pipeline: String,
    },

    /// Run a pipeline end to end: validate, submit, feed files, fetch status, tear down
    Run {
        /// Predefined pipeline name or path to a JSON/YAML file
        pipeline: String,

        /// Task name
        #[arg(short, long)]
        name: Option<String>,

        /// Files to upload when the pipeline is webhook-fed
        #[arg(short, long)]
        files: Option<String>,

        #[command(flatten)]
        task: TaskArgs,

        /// Worker threads (1-16)
        #[arg(long)]
        threads: Option<u32>,

        /// Maximum status checks while waiting for the task to run
        #[arg(long, default_value_t = DEFAULT_POLL_ATTEMPTS)]
        max_attempts: u32,

        /// Seconds between status checks
        #[arg(long, default_value_t = 15)]
        interval_secs: u64,

        /// Upload each file as a base64 JSON record
        #[arg(long)]
        legacy_base64: bool,
    },

    /// Show the status of a task
    Status {
        #[arg(short, long)]
        token: String,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// End a task
    Stop {
        #[arg(short, long)]
        token: String,

        #[command(flatten)]
        task: TaskArgs,
    },

    /// Upload files to a running webhook task
    Upload {
        #[arg(short, long)]
        token: String,

        /// Glob pattern of files to upload
        #[arg(short, long)]
        files: String,

        #[command(flatten)]
        task: TaskArgs,

        /// Upload each file as a base64 JSON record
        #[arg(long)]
        legacy_base64: bool,
    },
}

#[derive(Args)]
struct TaskArgs {
    /// Task type
    #[arg(long = "type", default_value = DEFAULT_TASK_TYPE)]
    task_type: String,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(cli: &Cli) -> Result<DtcClient> {
    let mut builder = DtcClient::builder().verbose(cli.verbose >= 2);
    if let Some(url) = &cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(key) = &cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(secs) = cli.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("failed to create client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn encoding(legacy_base64: bool) -> UploadEncoding {
    if legacy_base64 {
        UploadEncoding::Base64Json
    } else {
        UploadEncoding::Raw
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Pipelines = cli.command {
        for pipeline in PredefinedPipeline::ALL {
            println!("{}", pipeline);
        }
        return Ok(());
    }

    let client = build_client(&cli)?;
    match &cli.command {
        Commands::Pipelines => {}
        Commands::Version => print_json(&client.get_version()?)?,
        Commands::Validate { pipeline } => {
            let doc = resolve_pipeline(pipeline)?;
            print_json(&client.validate_pipe(&doc)?)?;
        }
        Commands::Run {
            pipeline,
            name,
            files,
            task,
            threads,
            max_attempts,
            interval_secs,
            legacy_base64,
        } => {
            let doc = resolve_pipeline(pipeline)?;
            let mut request = WorkflowRequest::new()
                .task_type(&task.task_type)
                .poll(PollPolicy {
                    max_attempts: *max_attempts,
                    interval: Duration::from_secs(*interval_secs),
                })
                .encoding(encoding(*legacy_base64));
            if let Some(name) = name {
                request = request.name(name);
            }
            if let Some(files) = files {
                request = request.file_glob(files);
            }
            if let Some(threads) = threads {
                request = request.threads(*threads);
            }

            match client.execute_pipeline_workflow(&doc, &request) {
                WorkflowOutcome::Completed(WorkflowOutput::Uploaded(responses)) => {
                    print_json(&responses)?
                }
                WorkflowOutcome::Completed(WorkflowOutput::Finished(status)) => {
                    print_json(&status)?
                }
                WorkflowOutcome::Failed(failure) => bail!("{}", failure),
            }
        }
        Commands::Status { token, task } => {
            print_json(&client.get_task_status(token, &task.task_type)?)?
        }
        Commands::Stop { token, task } => print_json(&client.end_task(token, &task.task_type)?)?,
        Commands::Upload {
            token,
            files,
            task,
            legacy_base64,
        } => {
            let responses =
                client.upload_files(token, &task.task_type, files, encoding(*legacy_base64))?;
            print_json(&responses)?;
        }
    }
    Ok(())
}
