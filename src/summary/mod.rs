use crate::error::{HarnessError, Result};
use crate::sweep::{PointOutcome, PointReport};
use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Tally of sweep points sharing a build and (n, d, k).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub build: String,
    pub n: u64,
    pub d: u64,
    pub k: u64,
    pub points: usize,
    pub passed: usize,
    pub not_parsed: usize,
    pub cost_mismatches: usize,
    pub verification_failures: usize,
    pub subprocess_failures: usize,
    pub parse_failures: usize,
    pub mean_seconds: f64,
}

impl GroupSummary {
    pub fn failures(&self) -> usize {
        self.cost_mismatches + self.verification_failures + self.subprocess_failures + self.parse_failures
    }
}

/// Groups point reports by build and (n, d, k), in grid order.
pub fn summarize(reports: &[PointReport]) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<(String, u64, u64, u64), GroupSummary> = BTreeMap::new();
    let mut seconds: BTreeMap<(String, u64, u64, u64), f64> = BTreeMap::new();

    for report in reports {
        let p = &report.point;
        let key = (report.build.clone(), p.n, p.d, p.k);
        let group = groups.entry(key.clone()).or_insert_with(|| GroupSummary {
            build: report.build.clone(),
            n: p.n,
            d: p.d,
            k: p.k,
            ..GroupSummary::default()
        });
        group.points += 1;
        match report.outcome {
            PointOutcome::Passed => group.passed += 1,
            PointOutcome::NotParsed => group.not_parsed += 1,
            PointOutcome::CostMismatch { .. } => group.cost_mismatches += 1,
            PointOutcome::VerificationFailed(_) => group.verification_failures += 1,
            PointOutcome::SubprocessFailed { .. } | PointOutcome::UnexpectedStderr => {
                group.subprocess_failures += 1
            }
            PointOutcome::ParseFailed(_) => group.parse_failures += 1,
        }
        *seconds.entry(key).or_default() += report.elapsed.as_secs_f64();
    }

    groups
        .into_iter()
        .map(|(key, mut group)| {
            let total = seconds.get(&key).copied().unwrap_or_default();
            group.mean_seconds = total / group.points as f64;
            group
        })
        .collect()
}

pub fn print_summary(groups: &[GroupSummary]) {
    let mut table = Table::new();
    table.add_row(row![
        "Build",
        "n",
        "d",
        "k",
        "Points",
        "Passed",
        "Cost Mismatch",
        "Verify Fail",
        "Subprocess Fail",
        "Parse Fail",
        "Mean Time (s)"
    ]);
    for g in groups {
        table.add_row(row![
            &g.build,
            g.n,
            g.d,
            g.k,
            g.points,
            g.passed,
            g.cost_mismatches,
            g.verification_failures,
            g.subprocess_failures,
            g.parse_failures,
            format!("{:.5}", g.mean_seconds),
        ]);
    }
    println!("\nSweep summary:");
    table.printstd();
}

/// Appends `groups` to the JSON array stored at `path`, creating it if
/// needed.
pub fn append_summary(groups: &[GroupSummary], path: &Path) -> Result<()> {
    let mut all: Vec<GroupSummary> = if path.exists() {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|source| HarnessError::Results {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        Vec::new()
    };
    all.extend_from_slice(groups);

    let json = serde_json::to_string_pretty(&all).map_err(|source| HarnessError::Results {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json)?;
    Ok(())
}
