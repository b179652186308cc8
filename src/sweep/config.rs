use crate::error::{HarnessError, Result};
use crate::report::{CommandFamily, OpenMode, ReportMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters of a sweep, read from a JSON file.
///
/// Every field is optional in the file; missing ones take the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Solver builds to sweep. Each build's executable is expected under
    /// its report directory with the build's name.
    pub build_types: Vec<String>,
    pub machine_type: String,
    /// Generator executable name, e.g. `gen-unique`.
    pub generator: String,
    pub graph_type: String,
    /// `bin` or `ascii`, passed to both generator and solver as `-<type>`.
    pub graphfile_type: String,
    pub nodes: Vec<u64>,
    pub degrees: Vec<u64>,
    pub terminals: Vec<u64>,
    /// Power-law exponent, only used by the `powlaw` graph type.
    pub alpha: f64,
    pub weight: u64,
    pub edge_weight: u64,
    pub repeats: u32,
    pub graph_repeats: u32,
    pub seed: u64,
    pub report_dir: PathBuf,
    pub command: CommandFamily,
    pub list_solution: bool,
    pub keep_error: bool,
    pub delete_bin: bool,
    /// How each build's `.report` file is opened.
    pub report_mode: OpenMode,
    /// Append to `run.log` instead of truncating it.
    pub append_log: bool,
    /// JSON file that collects per-group sweep summaries.
    pub summary_file: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            build_types: vec!["READER_DEFAULT".to_string()],
            machine_type: "cpu-corei5".to_string(),
            generator: "gen-unique".to_string(),
            graph_type: "regular".to_string(),
            graphfile_type: "bin".to_string(),
            nodes: vec![1024],
            degrees: vec![20],
            terminals: vec![10],
            alpha: -0.5,
            weight: 10000,
            edge_weight: 10000,
            repeats: 1,
            graph_repeats: 1,
            seed: 123456789,
            report_dir: PathBuf::from("Report"),
            command: CommandFamily::SteinerTree,
            list_solution: false,
            keep_error: false,
            delete_bin: false,
            report_mode: OpenMode::Write,
            append_log: false,
            summary_file: None,
        }
    }
}

impl SweepConfig {
    /// Loads a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: SweepConfig =
            serde_json::from_str(&content).map_err(|source| HarnessError::Config {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let empty = [
            ("build_types", self.build_types.is_empty()),
            ("nodes", self.nodes.is_empty()),
            ("degrees", self.degrees.is_empty()),
            ("terminals", self.terminals.is_empty()),
        ];
        if let Some((name, _)) = empty.iter().find(|(_, is_empty)| *is_empty) {
            return Err(HarnessError::InvalidConfig(format!("`{name}` must not be empty")));
        }
        if self.command == CommandFamily::ShortestPath && self.list_solution {
            return Err(HarnessError::InvalidConfig(
                "solution listing is only available for the erickson command".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mode(&self) -> ReportMode {
        ReportMode::new(self.command, self.list_solution)
    }

    /// `KvsDT` when only the terminal count varies, `MvsDT` when only the
    /// graph size varies, empty otherwise.
    pub fn plot_type(&self) -> &'static str {
        match (self.nodes.len(), self.terminals.len()) {
            (1, k) if k != 1 => "KvsDT",
            (n, 1) if n != 1 => "MvsDT",
            _ => "",
        }
    }

    fn report_stem(&self, build: &str) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}",
            build,
            self.machine_type,
            self.graph_type,
            self.plot_type(),
            self.command,
            self.degrees.first().copied().unwrap_or_default()
        )
    }

    /// Directory, relative to `report_dir`, holding one build's binaries,
    /// point logs and report.
    pub fn build_dir_name(&self, build: &str) -> String {
        format!("{}_dir", self.report_stem(build))
    }

    pub fn report_file_name(&self, build: &str) -> String {
        format!("{}.report", self.report_stem(build))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        fs::write(
            &path,
            r#"{ "nodes": [100, 200], "command": "dijkstra", "report_mode": "a" }"#,
        )
        .unwrap();

        let config = SweepConfig::load(&path).unwrap();
        assert_eq!(config.nodes, vec![100, 200]);
        assert_eq!(config.command, CommandFamily::ShortestPath);
        assert_eq!(config.report_mode, OpenMode::Append);
        assert_eq!(config.degrees, vec![20]);
        assert_eq!(config.seed, 123456789);
    }

    #[test]
    fn rejects_empty_grid_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");

        fs::write(&path, r#"{ "terminals": [] }"#).unwrap();
        let err = SweepConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("terminals"));

        fs::write(&path, r#"{ "nodes": "many" }"#).unwrap();
        assert!(matches!(
            SweepConfig::load(&path),
            Err(HarnessError::Config { .. })
        ));
    }

    #[test]
    fn listing_needs_steiner_command() {
        let config = SweepConfig {
            command: CommandFamily::ShortestPath,
            list_solution: true,
            ..SweepConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn report_names() {
        let config = SweepConfig {
            nodes: vec![1024, 2048],
            ..SweepConfig::default()
        };
        assert_eq!(config.plot_type(), "MvsDT");
        assert_eq!(
            config.build_dir_name("READER_DEFAULT"),
            "READER_DEFAULT_cpu-corei5_regular_MvsDT_erickson_20_dir"
        );
        assert_eq!(
            config.report_file_name("READER_DEFAULT"),
            "READER_DEFAULT_cpu-corei5_regular_MvsDT_erickson_20.report"
        );

        let config = SweepConfig {
            terminals: vec![4, 8],
            ..SweepConfig::default()
        };
        assert_eq!(config.plot_type(), "KvsDT");
        assert_eq!(SweepConfig::default().plot_type(), "");
    }
}
