#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use steiner_benchmark_rs::runlog::RunLog;
use steiner_benchmark_rs::sweep::{run_sweep, Actions, PointOutcome, SweepConfig};

const BUILD: &str = "READER_TEST";

const GENERATOR: &str = r#"#!/bin/sh
echo "gen-unique [$1]: n = $2, m = 40, k = $4, cost = 42, seed = $6" >&2
echo "p edge $2 40"
"#;

const SOLVER: &str = r#"#!/bin/sh
cat > /dev/null
cat <<EOF
random seed = $4
input: n = 16, m = 40, k = 4, cost = 42 [0.10 ms] {peak: 0.01GiB} {curr: 0.01GiB}
root build: [zero: 0.01 ms] [pos: 0.02 ms] [adj: 0.03 ms] [term: 0.04 ms] done. [0.10 ms] {peak: 0.01GiB} {curr: 0.01GiB}
erickson: [zero: 0.01 ms] [kernel: 0.20 ms 1.50GiB/s] done. [0.30 ms] [cost: 42] {peak: 0.01GiB} {curr: 0.01GiB}
command done [0.40 ms]
grand total [0.60 ms] {peak: 0.01GiB}
host: sandbox
build: edge-linear kernel, binary heap
compiler: gcc 12.2.0
EOF
"#;

fn install(path: &Path, script: &str) {
    fs::write(path, script).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn setup(solver: &str) -> (tempfile::TempDir, SweepConfig) {
    let root = tempfile::tempdir().unwrap();
    let config = SweepConfig {
        build_types: vec![BUILD.to_string()],
        nodes: vec![16],
        degrees: vec![4],
        terminals: vec![4],
        repeats: 2,
        report_dir: root.path().join("Report"),
        ..SweepConfig::default()
    };
    let dir = config.report_dir.join(config.build_dir_name(BUILD));
    fs::create_dir_all(&dir).unwrap();
    install(&dir.join(&config.generator), GENERATOR);
    install(&dir.join(BUILD), solver);
    (root, config)
}

fn all_actions() -> Actions {
    Actions {
        run: true,
        parse: true,
        print: false,
    }
}

#[test]
fn clean_points_produce_rows() {
    let (_root, config) = setup(SOLVER);
    let reports = run_sweep(&config, all_actions(), &mut RunLog::console()).unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome == PointOutcome::Passed));
    assert_eq!(reports[0].point.gen_seed, reports[1].point.gen_seed);

    let dir = config.report_dir.join(config.build_dir_name(BUILD));
    let report = fs::read_to_string(dir.join(config.report_file_name(BUILD))).unwrap();
    let rows: Vec<&str> = report.lines().collect();
    assert_eq!(rows.len(), 2);
    for (row, point) in rows.iter().zip(&reports) {
        let cells: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(cells[4], point.point.seed.to_string());
        assert!(row.contains(&format!(" 16 40 4 42 {} regular ", point.point.gen_seed)));
    }

    for point in &reports {
        assert!(dir.join(point.point.log_file_name()).is_file());
        assert!(!dir.join(point.point.err_file_name()).exists());
    }
}

#[test]
fn solver_assertion_skips_the_point() {
    let failing = SOLVER.replacen("cat > /dev/null", "cat > /dev/null\necho \"Assertion failed\" >&2", 1);
    let (_root, config) = setup(&failing);
    let mut log = RunLog::console();
    let reports = run_sweep(&config, all_actions(), &mut log).unwrap();

    assert!(reports.iter().all(|r| matches!(
        &r.outcome,
        PointOutcome::SubprocessFailed { markers } if markers == &["Assert".to_string()]
    )));
    assert_eq!(log.error_count(), 2);

    let dir = config.report_dir.join(config.build_dir_name(BUILD));
    let report = fs::read_to_string(dir.join(config.report_file_name(BUILD))).unwrap();
    assert!(report.is_empty());
    assert!(dir.join(reports[0].point.err_file_name()).is_file());
}

#[test]
fn rerun_in_read_mode_refuses_rows() {
    let (_root, mut config) = setup(SOLVER);
    run_sweep(&config, all_actions(), &mut RunLog::console()).unwrap();

    config.report_mode = steiner_benchmark_rs::report::OpenMode::Read;
    let reports = run_sweep(
        &config,
        Actions {
            run: false,
            parse: true,
            print: false,
        },
        &mut RunLog::console(),
    )
    .unwrap();
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, PointOutcome::ParseFailed(_))));
}

#[test]
fn undecodable_stderr_keeps_its_markers() {
    let failing = SOLVER.replacen(
        "cat > /dev/null",
        "cat > /dev/null\nprintf '\\377\\376 Assertion x failed\\n' >&2",
        1,
    );
    let (_root, config) = setup(&failing);
    let reports = run_sweep(&config, all_actions(), &mut RunLog::console()).unwrap();

    let dir = config.report_dir.join(config.build_dir_name(BUILD));
    for report in &reports {
        assert_eq!(
            report.outcome,
            PointOutcome::SubprocessFailed {
                markers: vec!["Assert".to_string()]
            }
        );
        assert!(dir.join(report.point.err_file_name()).is_file());
    }
}
