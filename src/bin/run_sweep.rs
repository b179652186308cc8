use clap::Parser;
use std::path::PathBuf;
use std::process;
use steiner_benchmark_rs::report::OpenMode;
use steiner_benchmark_rs::runlog::RunLog;
use steiner_benchmark_rs::summary::{append_summary, print_summary, summarize};
use steiner_benchmark_rs::sweep::{run_sweep, Actions, SweepConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Runs a generator | solver sweep and collects the logs into reports.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON sweep configuration; defaults apply when omitted.
    config: Option<PathBuf>,

    /// Run the generator and solver pipelines.
    #[arg(long)]
    run: bool,

    /// Parse the point logs into the report.
    #[arg(long)]
    parse: bool,

    /// Print the pipeline command lines.
    #[arg(long)]
    print: bool,

    /// Ask the solver to list its solution and verify it.
    #[arg(long)]
    list_solution: bool,

    /// Keep empty error files.
    #[arg(long)]
    keep_error: bool,

    /// Delete the build's binaries after its sweep.
    #[arg(long)]
    delete_bin: bool,

    #[arg(long, value_enum)]
    report_mode: Option<OpenMode>,

    /// JSON file collecting per-group summaries.
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut SweepConfig) {
        config.list_solution |= self.list_solution;
        config.keep_error |= self.keep_error;
        config.delete_bin |= self.delete_bin;
        if let Some(mode) = self.report_mode {
            config.report_mode = mode;
        }
        if let Some(path) = &self.summary {
            config.summary_file = Some(path.clone());
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = sweep(&cli) {
        error!("{e}");
        process::exit(1);
    }
}

fn sweep(cli: &Cli) -> steiner_benchmark_rs::Result<()> {
    let mut config = match &cli.config {
        Some(path) => SweepConfig::load(path)?,
        None => SweepConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let actions = Actions {
        run: cli.run,
        parse: cli.parse,
        print: cli.print,
    };

    std::fs::create_dir_all(&config.report_dir)?;
    let mut log = RunLog::create(config.report_dir.join("run.log"), config.append_log)?;
    log.system_details();
    let options = serde_json::to_string_pretty(&config).unwrap_or_default();
    log.note(&format!("\nOptions: {options}\nActions: {actions:?}\n"));
    log.column_legend(&config.mode());

    info!(builds = config.build_types.len(), "sweep started");
    let reports = run_sweep(&config, actions, &mut log)?;

    let groups = summarize(&reports);
    print_summary(&groups);
    if let Some(path) = &config.summary_file {
        append_summary(&groups, path)?;
        info!(file = %path.display(), "summary appended");
    }
    if log.error_count() > 0 {
        log.msg(&format!("\n{} error(s), see run.log\n", log.error_count()));
    }
    Ok(())
}
