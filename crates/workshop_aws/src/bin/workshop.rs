use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use workshop_aws::adapters::aws::AwsContext;
use workshop_aws::adapters::http::HttpFetcher;
use workshop_aws::config::WorkshopConfig;
use workshop_aws::error::WorkflowError;
use workshop_aws::handlers::deploy::{deploy_stack, load_template, DeployAction};
use workshop_aws::handlers::prepare_data::{prepare_data, PrepareDataConfig};
use workshop_aws::telemetry::{init_logging, LogFormat};
use workshop_core::contract::{
    resolve_stack_name, FileOutcome, PrepareDataRequest, StackTemplateRequest, WaitPolicy,
};
use workshop_core::prompts::{load_prompt_from_file, PromptVariables};
use workshop_core::token_costs::{compute_costs, AgentMetrics, TokenPricing};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "workshop",
    about = "Setup utilities for the big-data agent workshop",
    long_about = "Deploys the workshop CloudFormation stack, stages NYC taxi data\n\
                  into its bucket, and reports agent token costs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the workshop CloudFormation stack
    Deploy {
        /// Stack name (default: big-data-agent-infrastructure-<suffix>)
        #[arg(long)]
        stack_name: Option<String>,
        /// Suffix passed as the stack's `Suffix` parameter
        #[arg(long)]
        suffix: Option<String>,
        /// CloudFormation template file
        #[arg(long)]
        template: Option<PathBuf>,
        /// Seconds between stack status polls
        #[arg(long)]
        poll_interval_secs: Option<u64>,
        /// Maximum number of stack status polls
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Download dataset files and upload them under partitioned keys
    PrepareData {
        /// Stack name (default: big-data-agent-infrastructure-<suffix>)
        #[arg(long)]
        stack_name: Option<String>,
        /// Suffix used to derive the default stack name
        #[arg(long)]
        suffix: Option<String>,
        /// Logical table name used as the top-level key prefix
        #[arg(long)]
        table_name: String,
        /// Directory under which a per-run staging directory is created
        #[arg(long)]
        scratch_root: Option<PathBuf>,
        /// Source file URLs, processed in order
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Price the token usage recorded in an agent metrics JSON file
    TokenCosts {
        /// JSON file with `accumulated_metrics` and `accumulated_usage`
        metrics: PathBuf,
        /// USD per million input tokens
        #[arg(long, default_value_t = 3.0)]
        input_price: f64,
        /// USD per million output tokens
        #[arg(long, default_value_t = 15.0)]
        output_price: f64,
    },
    /// Render a prompt template file with `{name}` placeholders
    RenderPrompt {
        /// Template file
        template: PathBuf,
        /// Variable assignment, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_variable)]
        vars: Vec<(String, String)>,
    },
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("variable name cannot be empty in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

// ── commands ───────────────────────────────────────────────────────

fn run_deploy(
    config: &WorkshopConfig,
    stack_name: Option<String>,
    suffix: Option<String>,
    template: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    max_attempts: Option<u32>,
) -> Result<()> {
    let suffix = suffix.unwrap_or_else(|| config.suffix.clone());
    let template_path = template.unwrap_or_else(|| config.template_file.clone());
    let request = StackTemplateRequest {
        stack_name: resolve_stack_name(stack_name.as_deref(), &suffix),
        template_body: load_template(&template_path)?,
        suffix,
    };
    let policy = WaitPolicy {
        poll_interval: poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(config.poll_interval),
        max_attempts: max_attempts.unwrap_or(config.max_attempts),
    };

    let aws = AwsContext::load(config.region.as_deref()).context("failed to start AWS runtime")?;
    let outcome = deploy_stack(&request, &policy, &aws.provisioner())
        .with_context(|| format!("error deploying/updating stack {}", request.stack_name))?;

    match &outcome.action {
        DeployAction::Created { stack_id } => println!("Stack created: {stack_id}"),
        DeployAction::Updated { stack_id } => println!("Stack updated: {stack_id}"),
        DeployAction::Unchanged => println!("No updates needed, stack is already up to date"),
    }
    println!("Stack outputs for {}:", outcome.stack_name);
    for (key, value) in &outcome.outputs {
        println!("  {key}: {value}");
    }
    Ok(())
}

fn run_prepare_data(
    config: &WorkshopConfig,
    stack_name: Option<String>,
    suffix: Option<String>,
    table_name: String,
    scratch_root: Option<PathBuf>,
    urls: Vec<String>,
) -> Result<()> {
    let request = PrepareDataRequest {
        stack_name,
        suffix: suffix.unwrap_or_else(|| config.suffix.clone()),
        file_urls: urls,
        table_name,
    };
    let prepare_config = PrepareDataConfig {
        scratch_root: scratch_root.unwrap_or_else(|| config.scratch_root.clone()),
    };

    let aws = AwsContext::load(config.region.as_deref()).context("failed to start AWS runtime")?;
    let fetcher = HttpFetcher::new().context("failed to build HTTP client")?;

    let report = match prepare_data(
        request,
        &prepare_config,
        &aws.provisioner(),
        &aws.object_store(),
        &fetcher,
    ) {
        Ok(report) => report,
        Err(error) => {
            if matches!(
                error,
                WorkflowError::StackNotFound { .. } | WorkflowError::MissingBucketOutput { .. }
            ) {
                eprintln!("hint: deploy the infrastructure first with `workshop deploy`");
            }
            return Err(error.into());
        }
    };

    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Uploaded { key, bytes, .. } => {
                println!("uploaded s3://{}/{key} ({bytes} bytes)", report.bucket)
            }
            FileOutcome::Failed {
                url,
                stage,
                message,
            } => println!("skipped {url} ({stage} failed: {message})"),
        }
    }
    println!(
        "Setup complete! Bucket: {} ({} uploaded, {} skipped)",
        report.bucket,
        report.uploaded_keys().len(),
        report.failed_count()
    );
    Ok(())
}

fn run_token_costs(metrics: PathBuf, input_price: f64, output_price: f64) -> Result<()> {
    let raw = std::fs::read_to_string(&metrics)
        .with_context(|| format!("failed to read {}", metrics.display()))?;
    let parsed = AgentMetrics::from_json(&raw)?;
    let pricing = TokenPricing::new(input_price, output_price)?;
    println!("{}", compute_costs(&parsed, &pricing));
    Ok(())
}

fn run_render_prompt(template: PathBuf, vars: Vec<(String, String)>) -> Result<()> {
    let variables: PromptVariables = vars.into_iter().collect();
    print!("{}", load_prompt_from_file(&template, &variables)?);
    Ok(())
}

fn run(command: Commands, config: &WorkshopConfig) -> Result<()> {
    match command {
        Commands::Deploy {
            stack_name,
            suffix,
            template,
            poll_interval_secs,
            max_attempts,
        } => run_deploy(
            config,
            stack_name,
            suffix,
            template,
            poll_interval_secs,
            max_attempts,
        ),
        Commands::PrepareData {
            stack_name,
            suffix,
            table_name,
            scratch_root,
            urls,
        } => run_prepare_data(config, stack_name, suffix, table_name, scratch_root, urls),
        Commands::TokenCosts {
            metrics,
            input_price,
            output_price,
        } => run_token_costs(metrics, input_price, output_price),
        Commands::RenderPrompt { template, vars } => run_render_prompt(template, vars),
    }
}

/// Prints the full error chain, independent of the log filter.
fn report_failure(error: &anyhow::Error, out: &mut impl Write) {
    let _ = writeln!(out, "error: {error:#}");
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(LogFormat::from_env()) {
        eprintln!("warning: {error:#}");
    }
    let config = WorkshopConfig::from_env();

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "command failed");
            report_failure(&error, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}
