//! Report rows.
//!
//! Each sweep point becomes one fixed-width line in a `.report` file. The
//! column layout depends on the [`ReportMode`] and is consumed as-is by the
//! gnuplot scripts, so widths and precisions must not drift.

use crate::error::{HarnessError, Result};
use crate::grammar::field::*;
use crate::record::ParsedRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The generator prints this cost when it does not know the optimum.
pub const UNKNOWN_COST: i64 = -1;

/// Which solver command a sweep exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum CommandFamily {
    /// Single-source shortest paths.
    #[serde(rename = "dijkstra")]
    #[value(name = "dijkstra")]
    ShortestPath,
    /// Minimum Steiner tree.
    #[serde(rename = "erickson")]
    #[value(name = "erickson")]
    SteinerTree,
}

impl CommandFamily {
    /// The solver flag (without the dash), which is also the prefix of the
    /// solver's timing line.
    pub fn arg_cmd(self) -> &'static str {
        match self {
            CommandFamily::ShortestPath => "dijkstra",
            CommandFamily::SteinerTree => "erickson",
        }
    }
}

impl fmt::Display for CommandFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.arg_cmd())
    }
}

/// Command family plus whether the solver was asked to list its solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportMode {
    pub family: CommandFamily,
    pub list_solution: bool,
}

impl ReportMode {
    pub fn new(family: CommandFamily, list_solution: bool) -> Self {
        Self {
            family,
            list_solution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Right-justified integer, `width` 0 meaning no padding.
    Int { width: usize },
    /// Right-justified, two decimals.
    Fixed { width: usize },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: &'static str,
    pub kind: ColumnKind,
}

const fn int(field: &'static str, width: usize) -> Column {
    Column {
        field,
        kind: ColumnKind::Int { width },
    }
}

const fn fixed(field: &'static str, width: usize) -> Column {
    Column {
        field,
        kind: ColumnKind::Fixed { width },
    }
}

const fn text(field: &'static str) -> Column {
    Column {
        field,
        kind: ColumnKind::Text,
    }
}

const INPUT_COLUMNS: [Column; 7] = [
    int(N, 8),
    int(M, 10),
    int(K, 2),
    int(IN_COST, 10),
    int(SEED, 10),
    fixed(IN_PEAK, 8),
    fixed(IN_CURR, 8),
];

const ROOT_BUILD_COLUMNS: [Column; 7] = [
    fixed(ROOT_ZERO, 8),
    fixed(ROOT_POS, 8),
    fixed(ROOT_ADJ, 8),
    fixed(ROOT_TERM, 8),
    fixed(ROOT_TOTAL, 8),
    fixed(ROOT_PEAK, 7),
    fixed(ROOT_CURR, 7),
];

const STEINER_COLUMNS: [Column; 7] = [
    fixed(SOLVER_ZERO, 8),
    fixed(KERNEL, 8),
    fixed(KERNEL_BANDWIDTH, 8),
    fixed(SOLVER_TOTAL, 8),
    int(SOLUTION_COST, 8),
    fixed(SOLVER_PEAK, 8),
    fixed(SOLVER_CURR, 8),
];

const SHORTEST_PATH_COLUMNS: [Column; 3] = [
    fixed(DIJKSTRA_TOTAL, 8),
    fixed(DIJKSTRA_DONE, 8),
    fixed(DIJKSTRA_PEAK, 7),
];

const GRAND_TOTAL_COLUMNS: [Column; 2] = [fixed(GRAND_TOTAL, 8), fixed(GRAND_PEAK, 7)];

const GENERATOR_COLUMNS: [Column; 6] = [
    int(GEN_N, 0),
    int(GEN_M, 0),
    int(GEN_K, 0),
    int(GEN_COST, 0),
    int(GEN_SEED, 0),
    text(GEN_TYPE),
];

const BUILD_COLUMNS: [Column; 3] = [text(COMPILER), text(BUILD_THREADS), text(BUILD_HEAP)];

/// Columns of a report row for `mode`, left to right.
pub fn layout(mode: &ReportMode) -> Vec<Column> {
    let solver: &[Column] = match mode.family {
        CommandFamily::ShortestPath => &SHORTEST_PATH_COLUMNS,
        CommandFamily::SteinerTree => &STEINER_COLUMNS,
    };
    [
        &INPUT_COLUMNS[..],
        &ROOT_BUILD_COLUMNS,
        solver,
        &GRAND_TOTAL_COLUMNS,
        &GENERATOR_COLUMNS,
        &BUILD_COLUMNS,
    ]
    .concat()
}

impl Column {
    fn render(&self, record: &ParsedRecord, out: &mut String) -> Result<()> {
        let cell = match self.kind {
            ColumnKind::Int { width } => format!("{:>width$}", record.int(self.field)?),
            ColumnKind::Fixed { width } => format!("{:>width$.2}", record.float(self.field)?),
            ColumnKind::Text => record.text(self.field)?.to_string(),
        };
        out.push_str(&cell);
        Ok(())
    }
}

/// Renders one report row (without the trailing newline).
///
/// Fails on the first column, in layout order, whose field is missing or
/// does not convert to the column's type.
pub fn assemble(record: &ParsedRecord, mode: &ReportMode) -> Result<String> {
    let mut row = String::with_capacity(256);
    for (i, column) in layout(mode).iter().enumerate() {
        if i > 0 {
            row.push(' ');
        }
        column.render(record, &mut row)?;
    }
    Ok(row)
}

/// Result of comparing the generator's declared cost with the solver's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CostCheck {
    Consistent,
    Mismatch { declared: i64, computed: i64 },
}

/// Compares `inCost` with `solutionCost`. An unknown declared cost
/// ([`UNKNOWN_COST`]) always counts as consistent.
pub fn compare_cost(record: &ParsedRecord) -> Result<CostCheck> {
    let declared = record.int(IN_COST)?;
    let computed = record.int(SOLUTION_COST)?;
    if declared != UNKNOWN_COST && declared != computed {
        Ok(CostCheck::Mismatch { declared, computed })
    } else {
        Ok(CostCheck::Consistent)
    }
}

/// How a report file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    #[serde(alias = "w")]
    #[value(alias = "w")]
    Write,
    #[serde(alias = "a")]
    #[value(alias = "a")]
    Append,
    #[serde(alias = "r")]
    #[value(alias = "r")]
    Read,
}

/// An append-only sequence of report rows.
#[derive(Debug)]
pub struct ReportFile {
    path: PathBuf,
    mode: OpenMode,
    file: File,
    rows_written: usize,
}

impl ReportFile {
    /// Opens `path`. `Write` truncates, `Append` keeps prior rows, `Read`
    /// refuses any later [`ReportFile::append_row`].
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            OpenMode::Write => File::create(&path)?,
            OpenMode::Append => OpenOptions::new().create(true).append(true).open(&path)?,
            OpenMode::Read => File::open(&path)?,
        };
        Ok(Self {
            path,
            mode,
            file,
            rows_written: 0,
        })
    }

    pub fn append_row(&mut self, row: &str) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Err(HarnessError::ReadOnlyReport(self.path.clone()));
        }
        writeln!(self.file, "{row}")?;
        self.file.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Every row currently in the file, including rows from earlier runs.
    pub fn rows(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}
