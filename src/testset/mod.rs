//! Correctness run of solver builds over a directory of `.stp` instances.

use crate::error::{HarnessError, Result};
use crate::grammar::GrammarRegistry;
use crate::record::accumulate;
use crate::report::{compare_cost, CommandFamily, CostCheck, ReportMode};
use crate::runlog::{banner, timestamp, RunLog};
use crate::sweep::CommandSpec;
use crate::verify::{verify_record, Verification};
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

/// Judgement of one solver output.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseVerdict {
    Pass,
    /// The output contains `ERROR`.
    SolverError,
    /// The output contains `assert` or `Assert`.
    SolverAssert,
    CostMismatch { declared: i64, computed: i64 },
    /// The listed solution is not a tree spanning the terminals.
    Rejected(Verification),
    /// The output lacks a line needed for judging.
    ParseError(String),
}

impl CaseVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, CaseVerdict::Pass)
    }
}

impl fmt::Display for CaseVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseVerdict::Pass => write!(f, "pass"),
            CaseVerdict::SolverError => write!(f, "\n\n****** error: testing failed ****\n"),
            CaseVerdict::SolverAssert => write!(f, "\n\n****** assert: testing failed ***\n"),
            CaseVerdict::CostMismatch { declared, computed } => {
                write!(f, "fail inCost = {declared} dwCost = {computed}")
            }
            CaseVerdict::Rejected(verdict) => write!(f, "{verdict}"),
            CaseVerdict::ParseError(reason) => write!(f, "fail, unreadable output: {reason}"),
        }
    }
}

/// Judges the combined stdout and stderr of one solver run.
///
/// The solver prints its timing line under the `erickson` prefix whichever
/// command it was run with.
pub fn judge_output(text: &str, list_solution: bool) -> CaseVerdict {
    if text.contains("ERROR") {
        return CaseVerdict::SolverError;
    }
    if text.contains("assert") || text.contains("Assert") {
        return CaseVerdict::SolverAssert;
    }
    check_solution(text, list_solution)
        .unwrap_or_else(|e| CaseVerdict::ParseError(e.to_string()))
}

fn check_solution(text: &str, list_solution: bool) -> Result<CaseVerdict> {
    let mode = ReportMode::new(CommandFamily::SteinerTree, list_solution);
    let registry = GrammarRegistry::standard(&mode);
    let record = accumulate(&registry, text.lines())?;

    if let CostCheck::Mismatch { declared, computed } = compare_cost(&record)? {
        return Ok(CaseVerdict::CostMismatch { declared, computed });
    }
    if list_solution {
        let verdict = verify_record(&record)?;
        if !verdict.passed() {
            return Ok(CaseVerdict::Rejected(verdict));
        }
    }
    Ok(CaseVerdict::Pass)
}

/// Where the builds and instances live, and what to run.
#[derive(Debug, Clone)]
pub struct TestsetConfig {
    /// Directory the builds are taken from.
    pub exe_dir: PathBuf,
    /// Working directory for copied builds, run logs and outputs.
    pub verify_dir: PathBuf,
    /// Holds `<group>/<instance>.stp` files.
    pub testset_dir: PathBuf,
    pub build_types: Vec<String>,
    /// Solver commands, passed as `-<cmd>`.
    pub commands: Vec<String>,
    pub list_solution: bool,
    /// Print the solver command lines instead of running them.
    pub print: bool,
}

impl Default for TestsetConfig {
    fn default() -> Self {
        Self {
            exe_dir: PathBuf::from("../reader"),
            verify_dir: PathBuf::from("verifyDir"),
            testset_dir: PathBuf::from("../testset/small-instances"),
            build_types: ["READER_BIN_HEAP", "READER_FIB_HEAP", "READER_BIN_HEAP_PAR", "READER_FIB_HEAP_PAR"]
                .map(String::from)
                .to_vec(),
            commands: vec!["el".to_string()],
            list_solution: false,
            print: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub build: String,
    pub command: String,
    pub instance: PathBuf,
    pub verdict: CaseVerdict,
}

#[derive(Debug, Clone, Default)]
pub struct TestsetReport {
    pub cases: Vec<CaseResult>,
}

impl TestsetReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|case| case.verdict.passed())
    }

    pub fn failures(&self) -> usize {
        self.cases.iter().filter(|case| !case.verdict.passed()).count()
    }
}

/// Instance files matching `<testset_dir>/*/*.stp`, sorted.
pub fn find_instances(testset_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut instances = Vec::new();
    for group in fs::read_dir(testset_dir)? {
        let group = group?.path();
        if !group.is_dir() {
            continue;
        }
        for entry in fs::read_dir(&group)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "stp") {
                instances.push(path);
            }
        }
    }
    instances.sort();
    Ok(instances)
}

/// Copies `build` from the executable directory into the verify directory.
/// A build already present in the verify directory is used as is.
fn stage_build(config: &TestsetConfig, build: &str) -> Result<PathBuf> {
    fs::create_dir_all(&config.verify_dir)?;
    let staged = config.verify_dir.join(build);
    let source = config.exe_dir.join(build);
    if source.is_file() {
        fs::copy(&source, &staged)?;
    } else if !staged.is_file() {
        return Err(HarnessError::MissingExecutable(source));
    }
    Ok(staged)
}

fn solver_invocation(exe: &Path, instance: &Path, command: &str, list_solution: bool) -> CommandSpec {
    let cmd = CommandSpec::new(exe)
        .arg("-in")
        .arg(instance.display())
        .arg(format!("-{command}"));
    if list_solution {
        cmd.arg("-list")
    } else {
        cmd
    }
}

/// Runs every build and command over every instance, logging verdicts and
/// pass/fail banners. Only a missing build stops the run.
pub fn run_testset(config: &TestsetConfig) -> Result<TestsetReport> {
    let instances = find_instances(&config.testset_dir)?;
    info!(dir = %config.testset_dir.display(), count = instances.len(), "instances found");
    let stamp = timestamp();

    let mut report = TestsetReport::default();
    let mut last_log = None;
    for build in &config.build_types {
        let exe = stage_build(config, build)?;

        for command in &config.commands {
            let log_path = config
                .verify_dir
                .join(format!("run_{build}_{command}_{stamp}.log"));
            let out_path = config
                .verify_dir
                .join(format!("verify_{build}_{command}_{stamp}.out"));
            let mut log = RunLog::create(&log_path, false)?;
            log.system_details();
            log.msg(&format!("cmd-line args:\nbuild: {build}\narg cmd: {command}\n\n"));

            let mut failed = false;
            for instance in &instances {
                let spec = solver_invocation(&exe, instance, command, config.list_solution);
                if config.print {
                    println!("{spec} 1>{0} 2>{0}\n", out_path.display());
                    continue;
                }

                let verdict = run_case(&spec, &out_path, config.list_solution, &mut log)?;
                log.msg(&format!("STP instance: {} ", instance.display()));
                match verdict {
                    CaseVerdict::SolverError | CaseVerdict::SolverAssert => {
                        log.err(&format!("{verdict}\n"))
                    }
                    _ => log.msg(&format!("{verdict}\n")),
                }
                failed |= !verdict.passed();
                report.cases.push(CaseResult {
                    build: build.clone(),
                    command: command.clone(),
                    instance: instance.clone(),
                    verdict,
                });
            }

            if let Err(e) = fs::remove_file(&out_path) {
                debug!(file = %out_path.display(), error = %e, "no output file to remove");
            }
            if failed {
                log.err(&banner(false, false));
            } else {
                log.msg(&banner(true, false));
            }
            last_log = Some(log);
        }
    }

    let mut log = last_log.unwrap_or_else(RunLog::console);
    if report.passed() {
        log.msg(&banner(true, true));
    } else {
        log.err(&banner(false, true));
    }
    Ok(report)
}

fn run_case(
    spec: &CommandSpec,
    out_path: &Path,
    list_solution: bool,
    log: &mut RunLog,
) -> Result<CaseVerdict> {
    let out = File::create(out_path)?;
    let status = spec
        .command()
        .stdin(Stdio::null())
        .stdout(Stdio::from(out.try_clone()?))
        .stderr(Stdio::from(out))
        .status();
    match status {
        Ok(status) if !status.success() => {
            log.err(&format!("{spec} command failed with {status}\n"));
        }
        Ok(_) => {}
        Err(e) => {
            warn!(command = %spec, error = %e, "solver did not start");
            log.err(&format!("{spec} command failed: {e}\n"));
        }
    }
    let text = String::from_utf8_lossy(&fs::read(out_path)?).into_owned();
    Ok(judge_output(&text, list_solution))
}
