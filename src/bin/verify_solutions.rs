use clap::Parser;
use std::path::PathBuf;
use std::process;
use steiner_benchmark_rs::testset::{run_testset, TestsetConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Checks solver builds against a directory of `.stp` instances.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding the solver builds.
    #[arg(long, default_value = "../reader")]
    exe_dir: PathBuf,

    /// Working directory for staged builds, logs and outputs.
    #[arg(long, default_value = "verifyDir")]
    verify_dir: PathBuf,

    /// Directory of `<group>/<instance>.stp` files.
    #[arg(long, default_value = "../testset/small-instances")]
    testset_dir: PathBuf,

    #[arg(
        short = 'b',
        long = "build-type",
        num_args = 1..,
        default_values_t = ["READER_BIN_HEAP", "READER_FIB_HEAP", "READER_BIN_HEAP_PAR", "READER_FIB_HEAP_PAR"].map(String::from)
    )]
    build_types: Vec<String>,

    #[arg(
        short = 'c',
        long = "arg-cmd",
        num_args = 1..,
        default_values_t = ["el".to_string()],
        value_parser = ["dw", "el", "erickson"]
    )]
    commands: Vec<String>,

    /// Ask the solver to list its solution and verify it.
    #[arg(long)]
    list: bool,

    /// Print the solver command lines instead of running them.
    #[arg(long)]
    print: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    eprintln!("invoked as: {}\n", std::env::args().collect::<Vec<_>>().join(" "));
    let cli = Cli::parse();
    let config = TestsetConfig {
        exe_dir: cli.exe_dir,
        verify_dir: cli.verify_dir,
        testset_dir: cli.testset_dir,
        build_types: cli.build_types,
        commands: cli.commands,
        list_solution: cli.list,
        print: cli.print,
    };

    match run_testset(&config) {
        Ok(report) if report.passed() => info!(cases = report.cases.len(), "all instances passed"),
        Ok(report) => {
            info!(cases = report.cases.len(), failures = report.failures(), "testset failed");
            process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
