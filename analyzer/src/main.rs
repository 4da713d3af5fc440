use anyhow::Context;
use bridge::server::HttpBridge;
use chrono::Utc;
use clap::Parser;
use generator::profile::{build_log, GeneratorConfig, Scenario};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod bridge;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline GNSS log analysis driver")]
struct Args {
    /// Analyze one receiver log and emit the JSON report
    #[arg(long)]
    input: Option<PathBuf>,
    /// Write the report (or generated log) here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Classifier model artifact; overrides the workflow's model_path
    #[arg(long)]
    model: Option<PathBuf>,
    /// Run the HTTP upload bridge until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Listen address for --serve; overrides the workflow's bind
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Write a synthetic receiver log for the given scenario
    #[arg(long, value_enum)]
    generate: Option<Scenario>,
    #[arg(long, default_value_t = 120)]
    epochs: u32,
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

fn emit(output: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            println!("{}", contents);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(scenario) = args.generate {
        let log = build_log(&GeneratorConfig {
            scenario,
            epochs: args.epochs,
            seed: args.seed,
            ..Default::default()
        })?;
        return emit(args.output.as_deref(), log.trim_end());
    }

    let mut workflow_config = match &args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    };
    if let Some(model) = args.model {
        workflow_config.model_path = Some(model);
    }
    if let Some(bind) = args.bind {
        workflow_config.bind = bind;
    }

    if args.input.is_none() && !args.serve {
        anyhow::bail!("nothing to do: pass --input, --serve or --generate");
    }

    let runner = Runner::from_config(&workflow_config)?;

    if let Some(input) = &args.input {
        let outcome = runner.analyze_file(input, Utc::now())?;
        let diagnostics = &outcome.diagnostics;
        eprintln!(
            "{}: {} samples, {} anomalies, {} malformed lines",
            input.display(),
            outcome.report.meta.sample_count,
            outcome.report.summary.total_anomalies,
            diagnostics.parse_errors
        );
        for warning in &diagnostics.warnings {
            eprintln!(
                "warning {} (x{}): {}",
                warning.kind.as_str(),
                warning.count,
                warning.detail
            );
        }
        let json = outcome
            .report
            .to_json_pretty()
            .context("serializing analysis report")?;
        emit(args.output.as_deref(), &json)?;
    }

    if args.serve {
        let bridge = HttpBridge::new(runner.clone(), workflow_config.max_upload_bytes);
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for the HTTP bridge")?;
        runtime.block_on(bridge.serve(workflow_config.bind, async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("awaiting Ctrl+C failed: {}", err);
            }
        }))?;
    }

    Ok(())
}
