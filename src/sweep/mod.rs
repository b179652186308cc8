//! Sweep driver.
//!
//! For every build and every grid point: run the generator | solver
//! pipeline, check the solver's stderr, parse the point log into a report
//! row, compare costs and, when solutions are listed, verify them. Failures
//! are recorded per point; only a missing build directory or executable
//! stops the sweep.

pub mod config;
pub mod pipeline;
pub mod plan;

pub use config::SweepConfig;
pub use pipeline::{CommandSpec, Pipeline, PipelineStatus, ERROR_MARKERS};
pub use plan::{plan, SeedSource, SweepPoint};

use crate::error::{HarnessError, Result};
use crate::grammar::GrammarRegistry;
use crate::record::accumulate;
use crate::report::{assemble, compare_cost, CommandFamily, CostCheck, ReportFile, ReportMode};
use crate::runlog::RunLog;
use crate::verify::{verify_record, Verification};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What the driver should do at each point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actions {
    /// Execute the pipeline.
    pub run: bool,
    /// Parse point logs into the report.
    pub parse: bool,
    /// Print each pipeline's shell command line.
    pub print: bool,
}

/// How one sweep point ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PointOutcome {
    /// A row was written and every check passed.
    Passed,
    /// The logs were left unparsed on request.
    NotParsed,
    /// A row was written but the solver's cost differs from the generator's.
    CostMismatch { declared: i64, computed: i64 },
    /// A row was written but the listed solution is not a valid tree.
    VerificationFailed(Verification),
    /// The solver's stderr carried failure markers; nothing was parsed.
    SubprocessFailed { markers: Vec<String> },
    /// The solver wrote to stderr without a failure marker; nothing was parsed.
    UnexpectedStderr,
    /// The point log could not be turned into a row.
    ParseFailed(String),
}

impl PointOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, PointOutcome::Passed | PointOutcome::NotParsed)
    }
}

#[derive(Debug, Clone)]
pub struct PointReport {
    pub build: String,
    pub point: SweepPoint,
    pub outcome: PointOutcome,
    pub elapsed: Duration,
}

/// Runs the whole sweep described by `config`.
pub fn run_sweep(config: &SweepConfig, actions: Actions, log: &mut RunLog) -> Result<Vec<PointReport>> {
    config.validate()?;
    fs::create_dir_all(&config.report_dir)?;

    let mode = config.mode();
    let registry = GrammarRegistry::standard(&mode);
    let mut reports = Vec::new();

    for build in &config.build_types {
        let dir = config.report_dir.join(config.build_dir_name(build));
        if !dir.is_dir() {
            return Err(HarnessError::MissingExecutable(dir));
        }
        if actions.run {
            log.msg(&format!(
                "directory '{}' exists, deleting contents...\n",
                dir.display()
            ));
            remove_stale(&dir)?;
        }

        let mut report = if actions.parse {
            let path = dir.join(config.report_file_name(build));
            Some(ReportFile::open(path, config.report_mode)?)
        } else {
            None
        };

        let exe = dir.join(build);
        let generator = dir.join(&config.generator);
        for required in [&exe, &generator] {
            if !required.is_file() {
                return Err(HarnessError::MissingExecutable(required.clone()));
            }
        }

        let mut build_sweep = BuildSweep {
            config,
            build,
            dir: &dir,
            exe: &exe,
            mode,
            registry: &registry,
            actions,
            report: report.as_mut(),
        };

        info!(build = %build, dir = %dir.display(), "starting run");
        log.msg("starting run...\n");
        // one seed sequence per build, so every build sees the same graphs
        let mut seeds = SeedSource::new(config.seed);
        for point in plan(config, &mut seeds) {
            reports.push(build_sweep.process(point, log));
        }

        if config.delete_bin {
            for path in [&exe, &generator] {
                remove_if_present(path)?;
            }
        }
    }
    Ok(reports)
}

struct BuildSweep<'a> {
    config: &'a SweepConfig,
    build: &'a str,
    dir: &'a Path,
    exe: &'a Path,
    mode: ReportMode,
    registry: &'a GrammarRegistry,
    actions: Actions,
    report: Option<&'a mut ReportFile>,
}

impl BuildSweep<'_> {
    fn process(&mut self, point: SweepPoint, log: &mut RunLog) -> PointReport {
        log.msg(&format!(
            "\t[ {:>10} {:>6} {:>4} {:>4} {:>4} ] ",
            point.n, point.d, point.k, point.graph, point.run
        ));
        let start = Instant::now();

        let log_path = self.dir.join(point.log_file_name());
        let err_path = self.dir.join(point.err_file_name());
        let pipeline = Pipeline {
            generator: pipeline::generator_command(self.config, self.dir, &point),
            solver: pipeline::solver_command(self.config, self.exe, &point),
            log_path: log_path.clone(),
            err_path: err_path.clone(),
        };

        if self.actions.print {
            log.msg(&format!("{}\n", pipeline.shell_line()));
        }
        if self.actions.run {
            match pipeline.run() {
                Ok(status) if !status.success() => log.err(&format!(
                    "{} command failed (generator {}, solver {})\n",
                    point.stem(),
                    status.generator,
                    status.solver
                )),
                Ok(_) => {}
                Err(e) => log.err(&format!("{} command failed: {e}\n", point.stem())),
            }
        }

        let outcome = self.inspect(&point, &log_path, &err_path, log);

        let elapsed = start.elapsed();
        log.msg(&format!(" {:>10.5} s\n", elapsed.as_secs_f64()));
        PointReport {
            build: self.build.to_string(),
            point,
            outcome,
            elapsed,
        }
    }

    fn inspect(
        &mut self,
        point: &SweepPoint,
        log_path: &Path,
        err_path: &Path,
        log: &mut RunLog,
    ) -> PointOutcome {
        let stderr = match read_stderr(err_path) {
            Ok(text) => text,
            Err(e) => {
                log.err(&format!("cannot read {}: {e}\n", err_path.display()));
                return PointOutcome::ParseFailed(e.to_string());
            }
        };
        if !stderr.is_empty() {
            let markers = pipeline::scan_markers(&stderr, &ERROR_MARKERS);
            if markers.is_empty() {
                warn!(file = %err_path.display(), "solver wrote to stderr, skipping parse");
                return PointOutcome::UnexpectedStderr;
            }
            log.err(&format!(
                "n = {} d = {} k = {} {}\n",
                point.n,
                point.d,
                point.k,
                point.err_file_name()
            ));
            return PointOutcome::SubprocessFailed {
                markers: markers.into_iter().map(str::to_string).collect(),
            };
        }

        let outcome = match self.report.as_deref_mut() {
            Some(report) => parse_point(log_path, &self.mode, self.registry, report, log)
                .unwrap_or_else(|e| {
                    log.err(&format!("parsing failed {}: {e}\n", log_path.display()));
                    PointOutcome::ParseFailed(e.to_string())
                }),
            None => PointOutcome::NotParsed,
        };

        if !self.config.keep_error {
            if let Err(e) = remove_if_present(err_path) {
                warn!(file = %err_path.display(), error = %e, "could not remove error file");
            }
        }
        outcome
    }
}

/// Turns one point log into a report row, then checks the solver's cost
/// and, when listed, its solution.
///
/// The row is written before any check runs; a failed check is logged and
/// reflected in the outcome but never withholds the row.
pub fn parse_point(
    log_path: &Path,
    mode: &ReportMode,
    registry: &GrammarRegistry,
    report: &mut ReportFile,
    log: &mut RunLog,
) -> Result<PointOutcome> {
    let text = String::from_utf8_lossy(&fs::read(log_path)?).into_owned();
    let record = accumulate(registry, text.lines())?;
    let row = assemble(&record, mode)?;
    report.append_row(&row)?;

    if mode.family != CommandFamily::SteinerTree {
        return Ok(PointOutcome::Passed);
    }

    let mut outcome = PointOutcome::Passed;
    if let CostCheck::Mismatch { declared, computed } = compare_cost(&record)? {
        log.err(&format!("inCost = {declared} dwCost = {computed}\n"));
        outcome = PointOutcome::CostMismatch { declared, computed };
    }
    if mode.list_solution {
        match verify_record(&record) {
            Ok(verdict) if !verdict.passed() => {
                log.err(&format!("{verdict}\n"));
                if outcome == PointOutcome::Passed {
                    outcome = PointOutcome::VerificationFailed(verdict);
                }
            }
            Ok(_) => {}
            // the cost mismatch stays the outcome
            Err(e) if outcome != PointOutcome::Passed => {
                log.err(&format!("solution not verified: {e}\n"));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

/// Solver stderr as text. A missing file reads as empty; bytes that are
/// not UTF-8 are replaced so markers around them are still found.
fn read_stderr(err_path: &Path) -> io::Result<String> {
    match fs::read(err_path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Removes point logs, error files and reports left by an earlier run.
fn remove_stale(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let stale = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext, "log" | "report" | "err"));
        if stale {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::field;
    use crate::report::OpenMode;

    const STEINER_LOG: &str = "\
random seed = 5150
gen-unique [regular]: n = 100, m = 500, k = 5, cost = 42, seed = 777
input: n = 100, m = 500, k = 5, cost = 42 [10.00 ms] {peak: 0.01GiB} {curr: 0.01GiB}
terminals: 1 3 4
root build: [zero: 0.10 ms] [pos: 0.20 ms] [adj: 0.30 ms] [term: 0.40 ms] done. [1.00 ms] {peak: 0.02GiB} {curr: 0.02GiB}
erickson: [zero: 0.50 ms] [kernel: 4.00 ms 2.50GiB/s] [traceback: 0.25 ms] done. [5.00 ms] [cost: 42] {peak: 0.03GiB} {curr: 0.02GiB}
solution: [\"1 2\", \"2 3\", \"3 4\"]
command done [6.00 ms]
grand total [16.00 ms] {peak: 0.03GiB}
host: bench-01
build: edge-linear kernel, single thread, binary heap
list solution: true
num threads: 1
compiler: gcc 9.4.0
";

    fn parse(log_text: &str) -> (Result<PointOutcome>, Vec<String>) {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("p.log");
        fs::write(&log_path, log_text).unwrap();
        let mode = ReportMode::new(CommandFamily::SteinerTree, true);
        let registry = GrammarRegistry::standard(&mode);
        let mut report = ReportFile::open(dir.path().join("x.report"), OpenMode::Write).unwrap();
        let mut log = RunLog::console();
        let outcome = parse_point(&log_path, &mode, &registry, &mut report, &mut log);
        (outcome, report.rows().unwrap())
    }

    #[test]
    fn clean_log_passes() {
        let (outcome, rows) = parse(STEINER_LOG);
        assert_eq!(outcome.unwrap(), PointOutcome::Passed);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].ends_with(" 100 500 5 42 777 regular gcc 9.4.0 edge-linear kernel, single thread binary heap"));
    }

    #[test]
    fn cost_mismatch_still_writes_row() {
        let (outcome, rows) = parse(&STEINER_LOG.replace("[cost: 42]", "[cost: 50]"));
        assert_eq!(
            outcome.unwrap(),
            PointOutcome::CostMismatch {
                declared: 42,
                computed: 50
            }
        );
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("       50 "));
    }

    #[test]
    fn bad_solution_is_a_verification_failure() {
        let (outcome, rows) = parse(&STEINER_LOG.replace("\"3 4\"", "\"5 6\""));
        assert_eq!(
            outcome.unwrap(),
            PointOutcome::VerificationFailed(Verification::Disconnected)
        );
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn truncated_log_names_missing_field() {
        let truncated: String = STEINER_LOG
            .lines()
            .filter(|line| !line.starts_with("grand total"))
            .map(|line| format!("{line}\n"))
            .collect();
        let (outcome, rows) = parse(&truncated);
        assert!(matches!(
            outcome,
            Err(HarnessError::MissingField(ref name)) if name == field::GRAND_TOTAL
        ));
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_solution_line_lists_no_edges() {
        let without: String = STEINER_LOG
            .lines()
            .filter(|line| !line.starts_with("solution"))
            .map(|line| format!("{line}\n"))
            .collect();
        let (outcome, rows) = parse(&without);
        assert_eq!(
            outcome.unwrap(),
            PointOutcome::VerificationFailed(Verification::UncoveredTerminal(1))
        );
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn malformed_solution_keeps_cost_mismatch() {
        let log_text = STEINER_LOG
            .replace("[cost: 42]", "[cost: 50]")
            .replace("\"3 4\"", "\"three four\"");
        let (outcome, rows) = parse(&log_text);
        assert_eq!(
            outcome.unwrap(),
            PointOutcome::CostMismatch {
                declared: 42,
                computed: 50
            }
        );
        assert_eq!(rows.len(), 1);

        let (outcome, _) = parse(&STEINER_LOG.replace("\"3 4\"", "\"three four\""));
        assert!(matches!(outcome, Err(HarnessError::MalformedEdge(_))));
    }

    #[test]
    fn shortest_path_row_skips_cost_check() {
        let dijkstra = "dijkstra: [zero: 0.05 ms] [hinsert: 1.00 ms] [visit: 2.00 ms] [total: 9.00 ms 1.25GiB/s] done. [9.50 ms] {peak: 0.75GiB}";
        let log_text: String = STEINER_LOG
            .lines()
            .map(|line| if line.starts_with("erickson") { dijkstra } else { line })
            .map(|line| format!("{line}\n"))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("p.log");
        fs::write(&log_path, log_text).unwrap();
        let mode = ReportMode::new(CommandFamily::ShortestPath, false);
        let registry = GrammarRegistry::standard(&mode);
        let mut report = ReportFile::open(dir.path().join("x.report"), OpenMode::Write).unwrap();
        let mut log = RunLog::console();

        let outcome = parse_point(&log_path, &mode, &registry, &mut report, &mut log).unwrap();
        assert_eq!(outcome, PointOutcome::Passed);
        assert_eq!(log.error_count(), 0);

        let rows = report.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("    1.00    0.02    0.02     9.00     9.50    0.75    16.00"));
    }

    #[test]
    fn stderr_with_invalid_utf8_still_shows_markers() {
        let dir = tempfile::tempdir().unwrap();
        let err_path = dir.path().join("p.err");
        fs::write(&err_path, b"\xff\xfe Assertion x failed\n").unwrap();

        let text = read_stderr(&err_path).unwrap();
        assert_eq!(pipeline::scan_markers(&text, &ERROR_MARKERS), ["Assert"]);
        assert_eq!(read_stderr(&dir.path().join("absent.err")).unwrap(), "");
    }

    #[test]
    fn missing_build_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig {
            report_dir: dir.path().join("Report"),
            ..SweepConfig::default()
        };
        let actions = Actions {
            run: true,
            parse: true,
            print: false,
        };
        let err = run_sweep(&config, actions, &mut RunLog::console()).unwrap_err();
        assert!(matches!(err, HarnessError::MissingExecutable(_)));
    }

    #[test]
    fn stale_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.log", "b.err", "c.report", "READER_DEFAULT"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        remove_stale(dir.path()).unwrap();
        let left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(left, ["READER_DEFAULT"]);
    }
}
