//! ecs-run: run a one-off ECS task and follow it to completion
//!
//! Deploy pipelines call this with the environment already set; every input
//! is also available as a flag.

use clap::{Parser, Subcommand};
use ecs_run::aws::{AwsContext, EcsClient, LogsClient, find_aws_error};
use ecs_run::config::{EnvArgs, RunConfig, TailConfig, TargetConfig};
use ecs_run::error::RunError;
use ecs_run::orchestrator::{Orchestrator, write_report_file};
use ecs_run_common::TerminationReport;
use std::collections::HashMap;
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ecs-run")]
#[command(about = "Run a one-off ECS task and tail its logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    env: EnvArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow an already started task until it stops
    Tail {
        /// ARN of the task to follow
        task_arn: String,

        /// CloudWatch log group (default: /ecs/{cluster}/{app})
        #[arg(long)]
        log_group: Option<String>,

        /// awslogs stream prefix (default: {app})
        #[arg(long)]
        stream_prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Print error in a user-friendly way
fn print_error(e: &RunError) {
    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = find_aws_error(e).and_then(|aws| aws.suggestion()) {
        let _ = writeln!(stderr, "\n\x1b[2mHint:\x1b[0m {suggestion}");
    }
}

async fn run(cli: Cli) -> Result<i32, RunError> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "Step 1: Checking environment variables \n")?;

    match cli.command {
        None => {
            let config = RunConfig::from_args(&cli.env)?;
            info!(
                cluster = %config.target.cluster,
                app = %config.target.app_name,
                region = %config.target.region,
                template = %config.template_file.display(),
                "Starting task run"
            );

            let aws = AwsContext::new(&config.target.region).await;
            let ecs = EcsClient::from_context(&aws);
            let logs = LogsClient::from_context(&aws);
            let vars: HashMap<String, String> = std::env::vars().collect();

            let mut orchestrator = Orchestrator::new(&ecs, &logs, &mut stdout, config.target.poll);
            let report = orchestrator.launch(&config, &vars).await?;
            finish(&config.target, &report)
        }
        Some(Command::Tail {
            task_arn,
            log_group,
            stream_prefix,
        }) => {
            let config = TailConfig::from_args(&cli.env, task_arn, log_group, stream_prefix)?;
            info!(
                cluster = %config.target.cluster,
                task_arn = %config.task_arn,
                log_group = %config.log_location.group,
                "Attaching to task"
            );

            let aws = AwsContext::new(&config.target.region).await;
            let ecs = EcsClient::from_context(&aws);
            let logs = LogsClient::from_context(&aws);

            let mut orchestrator = Orchestrator::new(&ecs, &logs, &mut stdout, config.target.poll);
            let report = orchestrator.attach(&config).await?;
            finish(&config.target, &report)
        }
    }
}

fn finish(target: &TargetConfig, report: &TerminationReport) -> Result<i32, RunError> {
    if let Some(path) = &target.report_file {
        write_report_file(path, report)?;
    }
    Ok(report.exit_code())
}
