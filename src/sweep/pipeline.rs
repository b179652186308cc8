//! Generator | solver subprocess pair for one sweep point.

use super::config::SweepConfig;
use super::plan::SweepPoint;
use crate::error::Result;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Substrings in a solver's stderr that mark a failed run.
pub const ERROR_MARKERS: [&str; 2] = ["error", "Assert"];

/// Markers from `markers` that occur in `text`.
pub fn scan_markers<'m>(text: &str, markers: &[&'m str]) -> Vec<&'m str> {
    markers
        .iter()
        .copied()
        .filter(|marker| text.contains(marker))
        .collect()
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: ToString>(mut self, arg: S) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Generator invocation for `point`. The `powlaw` graph type takes the
/// exponent and vertex weight before the terminal count.
pub fn generator_command(config: &SweepConfig, dir: &Path, point: &SweepPoint) -> CommandSpec {
    let cmd = CommandSpec::new(dir.join(&config.generator))
        .arg(&config.graph_type)
        .arg(point.n)
        .arg(point.d);
    let cmd = if config.graph_type == "powlaw" {
        cmd.arg(format!("{:.6}", config.alpha))
            .arg(config.weight)
            .arg(point.k)
    } else {
        cmd.arg(point.k)
    };
    cmd.arg(config.edge_weight)
        .arg(point.gen_seed)
        .arg(format!("-{}", config.graphfile_type))
}

/// Solver invocation for `point` with the build's executable `exe`.
pub fn solver_command(config: &SweepConfig, exe: &Path, point: &SweepPoint) -> CommandSpec {
    let cmd = CommandSpec::new(exe)
        .arg(format!("-{}", config.graphfile_type))
        .arg("-oracle")
        .arg("-seed")
        .arg(point.seed)
        .arg(format!("-{}", config.command.arg_cmd()));
    if config.list_solution {
        cmd.arg("-list")
    } else {
        cmd
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineStatus {
    pub generator: ExitStatus,
    pub solver: ExitStatus,
}

impl PipelineStatus {
    pub fn success(&self) -> bool {
        self.generator.success() && self.solver.success()
    }
}

/// `generator | solver`, with generator stderr and solver stdout appended
/// to the point log and solver stderr appended to the point error file.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub generator: CommandSpec,
    pub solver: CommandSpec,
    pub log_path: PathBuf,
    pub err_path: PathBuf,
}

impl Pipeline {
    /// The equivalent shell command line.
    pub fn shell_line(&self) -> String {
        format!(
            "{} 2>>{} | {} 2>>{} >> {}",
            self.generator,
            self.log_path.display(),
            self.solver,
            self.err_path.display(),
            self.log_path.display()
        )
    }

    /// Runs both processes and blocks until they exit.
    pub fn run(&self) -> Result<PipelineStatus> {
        let log = append_to(&self.log_path)?;
        let err = append_to(&self.err_path)?;
        debug!(command = %self.shell_line(), "spawning pipeline");

        let mut generator = self
            .generator
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(log.try_clone()?))
            .spawn()?;

        let spawned = match generator.stdout.take() {
            Some(graph) => self
                .solver
                .command()
                .stdin(Stdio::from(graph))
                .stdout(Stdio::from(log))
                .stderr(Stdio::from(err))
                .spawn(),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "generator stdout was not captured",
            )),
        };
        let mut solver = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = generator.kill();
                let _ = generator.wait();
                return Err(e.into());
            }
        };

        let solver_status = solver.wait()?;
        let generator_status = generator.wait()?;
        Ok(PipelineStatus {
            generator: generator_status,
            solver: solver_status,
        })
    }
}

fn append_to(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
