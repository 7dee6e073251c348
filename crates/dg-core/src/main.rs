//! dg-core: Gaussian digit classifier and generator CLI.
//!
//! JSON payloads go to stdout. Logs and error reports go to stderr. The exit
//! code follows `exit_codes::ExitCode`.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use dg_common::{format_error_human, Error, ErrorReport, Label, Result, Sample, TrainingTable};
use dg_config::{load_config, EngineConfig, LoadedConfig};
use dg_core::dataset::load_training_csv;
use dg_core::exit_codes::ExitCode;
use dg_core::log_event;
use dg_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use dg_core::schema::{available_schemas, generate_all_schemas, generate_schema};
use dg_core::Engine;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dg-core", version, about = "Gaussian digit classifier and generator")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalOpts {
    /// Path to engine.json (overrides DG_CONFIG and the search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Training CSV: label, then 784 pixel columns
    #[arg(long, global = true)]
    train: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Seed for generative sampling
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate class statistics and print their summary
    Estimate,

    /// Classify one sample (JSON array of 784 integers)
    Classify(ClassifyArgs),

    /// Draw a sample from a class Gaussian
    Sample(LabelArgs),

    /// Print the rescaled class mean
    SampleMean(LabelArgs),

    /// Fit the projection + mixture and score clusters against labels
    Evaluate(EvaluateArgs),

    /// Draw a sample from the per-label mixture generator
    Generate(LabelArgs),

    /// Projected training points of one label grouped by mixture component
    Clusters(LabelArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Print JSON Schemas of inputs and outputs
    Schema(SchemaArgs),
}

#[derive(Args)]
struct ClassifyArgs {
    /// Sample as a JSON array; read from stdin when absent
    #[arg(long)]
    sample: Option<String>,

    /// Include the full posterior
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct LabelArgs {
    /// Digit label (0-9)
    #[arg(long, allow_negative_numbers = true)]
    label: i64,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Projected dimensions (defaults to cluster_dims)
    #[arg(long)]
    dims: Option<usize>,

    /// Mixture components (defaults to cluster_count)
    #[arg(long)]
    clusters: Option<usize>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration snapshot
    Show,
}

#[derive(Args)]
struct SchemaArgs {
    /// Type name to print
    name: Option<String>,

    /// List available type names
    #[arg(long)]
    list: bool,

    /// Print every schema
    #[arg(long)]
    all: bool,
}

#[derive(Serialize)]
struct LabelOutput {
    label: Label,
}

#[derive(Serialize)]
struct SampleOutput {
    label: Label,
    sample: Sample,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);
    let ctx = LogContext::new(generate_run_id());

    log_event!(ctx, DEBUG, event_names::RUN_STARTED, Stage::Init, "dg-core started");
    let code = match run(&cli, &ctx) {
        Ok(()) => ExitCode::Clean,
        Err(err) => report_error(&err, &ctx),
    };
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Init,
        "dg-core finished",
        exit_code = code.as_i32()
    );
    std::process::exit(code.as_i32());
}

fn run(cli: &Cli, ctx: &LogContext) -> Result<()> {
    match &cli.command {
        Commands::Schema(args) => return run_schema(args),
        Commands::Config(args) => {
            let loaded = load(&cli.global, ctx)?;
            return match args.command {
                ConfigCommands::Show => emit(&loaded.snapshot),
            };
        }
        _ => {}
    }

    let loaded = load(&cli.global, ctx)?;
    let config = loaded.config;
    let table = load_table(&cli.global, &config, ctx)?;
    let engine = Engine::with_context(config, ctx.clone());

    match &cli.command {
        Commands::Estimate => emit(&engine.estimate(&table)?),
        Commands::Classify(args) => {
            let sample = read_sample(args.sample.as_deref())?;
            engine.estimate(&table)?;
            if args.detailed {
                emit(&engine.classify_detailed(&sample)?)
            } else {
                emit(&LabelOutput {
                    label: engine.classify(&sample)?,
                })
            }
        }
        Commands::Sample(args) => {
            let label = Label::new(args.label)?;
            engine.estimate(&table)?;
            emit(&SampleOutput {
                label,
                sample: engine.sample(args.label)?,
            })
        }
        Commands::SampleMean(args) => {
            let label = Label::new(args.label)?;
            engine.estimate(&table)?;
            emit(&SampleOutput {
                label,
                sample: engine.sample_mean(args.label)?,
            })
        }
        Commands::Evaluate(args) => {
            let dims = args.dims.unwrap_or(engine.config().cluster_dims);
            let clusters = args.clusters.unwrap_or(engine.config().cluster_count);
            emit(&engine.fit_and_evaluate_clusters(&table, dims, clusters)?)
        }
        Commands::Generate(args) => {
            let label = Label::new(args.label)?;
            engine.fit_label_mixtures(&table)?;
            emit(&SampleOutput {
                label,
                sample: engine.generate(args.label)?,
            })
        }
        Commands::Clusters(args) => {
            let label = Label::new(args.label)?;
            engine.fit_label_mixtures(&table)?;
            let clusters = engine.label_clusters(args.label, &table)?;
            emit(&serde_json::json!({ "label": label, "clusters": clusters }))
        }
        Commands::Config(_) | Commands::Schema(_) => Ok(()),
    }
}

fn load(global: &GlobalOpts, ctx: &LogContext) -> Result<LoadedConfig> {
    let mut loaded = load_config(global.config.as_deref())?;
    if let Some(seed) = global.seed {
        loaded.config.sample_seed = Some(seed);
    }
    let source = loaded.paths.source.to_string();
    log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration loaded",
        source = source.as_str(),
        config_id = loaded.snapshot.short_id()
    );
    Ok(loaded)
}

fn load_table(global: &GlobalOpts, config: &EngineConfig, ctx: &LogContext) -> Result<TrainingTable> {
    let path: &Path = global
        .train
        .as_deref()
        .or(config.train_data_path.as_deref())
        .ok_or_else(|| Error::InvalidParameter {
            name: "train",
            message: "no training data; pass --train or set DG_TRAIN_DATA_PATH".to_string(),
        })?;
    let table = load_training_csv(path)?;
    let path_display = path.display().to_string();
    log_event!(
        ctx,
        INFO,
        event_names::DATASET_LOADED,
        Stage::Load,
        "training table loaded",
        path = path_display.as_str(),
        rows = table.len(),
        labels = table.labels().len()
    );
    Ok(table)
}

fn read_sample(arg: Option<&str>) -> Result<Sample> {
    let text = match arg {
        Some(text) => text.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let values: Vec<i64> =
        serde_json::from_str(text.trim()).map_err(|e| Error::InvalidParameter {
            name: "sample",
            message: format!("expected a JSON array of integers: {e}"),
        })?;
    Sample::from_values(&values)
}

fn run_schema(args: &SchemaArgs) -> Result<()> {
    if args.list {
        let names: Vec<serde_json::Value> = available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        return emit(&names);
    }
    if args.all {
        return emit(&generate_all_schemas());
    }
    let name = args.name.as_deref().ok_or_else(|| Error::InvalidParameter {
        name: "name",
        message: "pass a type name, --list or --all".to_string(),
    })?;
    let schema = generate_schema(name).ok_or_else(|| Error::InvalidParameter {
        name: "name",
        message: format!("unknown schema type {name:?}"),
    })?;
    emit(&schema)
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_error(err: &Error, ctx: &LogContext) -> ExitCode {
    let code = ExitCode::for_error(err);
    if code.is_internal_error() {
        let message = err.to_string();
        log_event!(
            ctx,
            ERROR,
            event_names::INTERNAL_ERROR,
            Stage::Init,
            "command failed",
            error = message.as_str()
        );
    }

    let stderr = std::io::stderr();
    if stderr.is_terminal() {
        eprintln!("{}", format_error_human(err, true));
    }
    eprintln!("{}", ErrorReport::from(err).to_json());
    code
}
