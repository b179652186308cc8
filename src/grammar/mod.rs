//! Line grammar registry.
//!
//! The solver and generator print one diagnostic line per phase, each with
//! its own ad-hoc layout. A [`LineGrammarRule`] pairs a literal line prefix
//! with a regex whose capture groups name the fields carried by that line.
//! Values are kept as trimmed strings; numeric conversion happens where the
//! report layout consumes them.

use crate::error::{HarnessError, Result};
use crate::record::FieldValue;
use crate::report::{CommandFamily, ReportMode};
use regex::{Regex, RegexBuilder};

/// Field names populated by the standard registry.
pub mod field {
    pub const SEED: &str = "seed";

    pub const N: &str = "n";
    pub const M: &str = "m";
    pub const K: &str = "k";
    pub const IN_COST: &str = "inCost";
    pub const IN_TIME: &str = "inTime";
    pub const IN_PEAK: &str = "inPeak";
    pub const IN_CURR: &str = "inCurr";

    pub const ROOT_ZERO: &str = "rootZero";
    pub const ROOT_POS: &str = "rootPos";
    pub const ROOT_ADJ: &str = "rootAdj";
    pub const ROOT_TERM: &str = "rootTerm";
    pub const ROOT_TOTAL: &str = "rootTotal";
    pub const ROOT_PEAK: &str = "rootPeak";
    pub const ROOT_CURR: &str = "rootCurr";

    pub const SOLVER_ZERO: &str = "zero";
    pub const KERNEL: &str = "kernel";
    pub const KERNEL_BANDWIDTH: &str = "kernelBandwidth";
    pub const TRACEBACK: &str = "traceback";
    pub const SOLVER_TOTAL: &str = "solverTotal";
    pub const SOLUTION_COST: &str = "solutionCost";
    pub const SOLVER_PEAK: &str = "solverPeak";
    pub const SOLVER_CURR: &str = "solverCurr";

    pub const DIJKSTRA_ZERO: &str = "dijkstraZero";
    pub const DIJKSTRA_HEAP_INSERT: &str = "dijkstraHeapInsert";
    pub const DIJKSTRA_VISIT: &str = "dijkstraVisit";
    pub const DIJKSTRA_TOTAL: &str = "dijkstraTotal";
    pub const DIJKSTRA_BANDWIDTH: &str = "dijkstraBandwidth";
    pub const DIJKSTRA_DONE: &str = "dijkstraDone";
    pub const DIJKSTRA_PEAK: &str = "dijkstraPeak";

    pub const GEN_TYPE: &str = "genType";
    pub const GEN_N: &str = "genN";
    pub const GEN_M: &str = "genM";
    pub const GEN_K: &str = "genK";
    pub const GEN_COST: &str = "genCost";
    pub const GEN_SEED: &str = "genSeed";

    pub const EDGE_LIST: &str = "edgeList";
    pub const TERMINALS: &str = "terminals";
    pub const COMMAND_TIME: &str = "commandTime";
    pub const GRAND_TOTAL: &str = "grandTotal";
    pub const GRAND_PEAK: &str = "grandPeak";

    pub const HOST: &str = "host";
    pub const BUILD_THREADS: &str = "buildThreads";
    pub const BUILD_HEAP: &str = "buildHeap";
    pub const COMPILER: &str = "compiler";
    pub const LIST_SOLUTION: &str = "listSolution";
    pub const NUM_THREADS: &str = "numThreads";
}

/// How a rule turns its regex into field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    /// One match; group `i` feeds field `i`.
    Groups,
    /// Every match of the single group is collected into one list field.
    Repeated,
}

/// A single line dialect, identified by its literal prefix.
#[derive(Debug, Clone)]
pub struct LineGrammarRule {
    prefix: String,
    ignore_case: bool,
    pattern: Regex,
    fields: Vec<&'static str>,
    capture: Capture,
}

impl LineGrammarRule {
    /// A rule with one capture group per field name.
    pub fn new(prefix: &str, pattern: &str, fields: &[&'static str]) -> Result<Self> {
        Self::build(prefix, pattern, fields, Capture::Groups, false)
    }

    /// Like [`LineGrammarRule::new`], matching both prefix and pattern
    /// without regard to ASCII case.
    pub fn new_ignore_case(prefix: &str, pattern: &str, fields: &[&'static str]) -> Result<Self> {
        Self::build(prefix, pattern, fields, Capture::Groups, true)
    }

    /// A rule whose single capture group may match many times on the line.
    pub fn repeated(prefix: &str, pattern: &str, field: &'static str) -> Result<Self> {
        Self::build(prefix, pattern, &[field], Capture::Repeated, false)
    }

    fn build(
        prefix: &str,
        pattern: &str,
        fields: &[&'static str],
        capture: Capture,
        ignore_case: bool,
    ) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|source| HarnessError::InvalidPattern {
                prefix: prefix.to_string(),
                source,
            })?;

        // captures_len counts the implicit whole-match group
        let groups = pattern.captures_len() - 1;
        if groups != fields.len() {
            return Err(HarnessError::FieldCount {
                prefix: prefix.to_string(),
                groups,
                names: fields.len(),
            });
        }

        Ok(Self {
            prefix: prefix.to_string(),
            ignore_case,
            pattern,
            fields: fields.to_vec(),
            capture,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Returns true if `line` starts with this rule's prefix.
    pub fn accepts(&self, line: &str) -> bool {
        if self.ignore_case {
            line.get(..self.prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&self.prefix))
        } else {
            line.starts_with(&self.prefix)
        }
    }

    /// Extracts this rule's fields from `line`.
    ///
    /// The caller is expected to have checked [`LineGrammarRule::accepts`];
    /// a line that carries the prefix but not the expected body is a
    /// [`HarnessError::GrammarMismatch`].
    pub fn apply(&self, line: &str) -> Result<Vec<(&'static str, FieldValue)>> {
        match self.capture {
            Capture::Groups => {
                let caps = self
                    .pattern
                    .captures(line)
                    .ok_or_else(|| self.mismatch(line))?;
                Ok(self
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(i, &name)| {
                        let value = caps.get(i + 1).map_or("", |m| m.as_str()).trim();
                        (name, FieldValue::Text(value.to_string()))
                    })
                    .collect())
            }
            Capture::Repeated => {
                let values = self
                    .pattern
                    .captures_iter(line)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .collect();
                Ok(vec![(self.fields[0], FieldValue::List(values))])
            }
        }
    }

    fn mismatch(&self, line: &str) -> HarnessError {
        HarnessError::GrammarMismatch {
            prefix: self.prefix.clone(),
            line: line.trim_end().to_string(),
        }
    }
}

/// The outcome of routing one line through the registry.
#[derive(Debug)]
pub struct LineMatch<'r> {
    pub rule: &'r LineGrammarRule,
    pub fields: Vec<(&'static str, FieldValue)>,
}

/// An ordered table of line rules. The first rule whose prefix matches a
/// line owns it.
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    rules: Vec<LineGrammarRule>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compiles and adds a rule with one capture group per field name.
    pub fn register(
        &mut self,
        prefix: &str,
        pattern: &str,
        fields: &[&'static str],
    ) -> Result<&mut Self> {
        let rule = LineGrammarRule::new(prefix, pattern, fields)?;
        Ok(self.push(rule))
    }

    pub fn push(&mut self, rule: LineGrammarRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[LineGrammarRule] {
        &self.rules
    }

    pub fn lookup(&self, line: &str) -> Option<&LineGrammarRule> {
        self.rules.iter().find(|rule| rule.accepts(line))
    }

    /// Routes `line` to its rule. `Ok(None)` means no prefix matched and the
    /// line should be ignored.
    pub fn match_line(&self, line: &str) -> Result<Option<LineMatch<'_>>> {
        let Some(rule) = self.lookup(line) else {
            return Ok(None);
        };
        let fields = rule.apply(line)?;
        Ok(Some(LineMatch { rule, fields }))
    }

    /// The registry for the solver named by the mode's command family.
    pub fn standard(mode: &ReportMode) -> Self {
        Self::for_solver(mode.family.arg_cmd(), mode)
    }

    /// Every dialect the generator and solver print, with the
    /// `<solver>:` line expected in the variant selected by `mode`.
    pub fn for_solver(solver: &str, mode: &ReportMode) -> Self {
        use field::*;

        let mut registry = Self::new();
        let rules = [
            LineGrammarRule::new_ignore_case("random seed", r"random seed = (.*)", &[SEED]),
            LineGrammarRule::new_ignore_case(
                "input",
                r"n = (.*), m = (.*), k = (.*), cost = (.*) \[(.*)ms\] \{peak:(.*)GiB\} \{curr:(.*)GiB\}",
                &[N, M, K, IN_COST, IN_TIME, IN_PEAK, IN_CURR],
            ),
            LineGrammarRule::new(
                "root build",
                r"root build:.*\[zero:(.*)ms\] \[pos:(.*)ms\] \[adj:(.*)ms\] \[term:(.*)ms\] done\. \[(.*)ms\] \{peak:(.*)GiB\} \{curr:(.*)GiB\}",
                &[ROOT_ZERO, ROOT_POS, ROOT_ADJ, ROOT_TERM, ROOT_TOTAL, ROOT_PEAK, ROOT_CURR],
            ),
            LineGrammarRule::new(
                "dijkstra",
                r"dijkstra:.*\[zero:(.*)ms\] \[hinsert:(.*)ms\] \[visit:(.*)ms\] \[total:(.*)ms (.*)GiB/s\] done\. \[(.*)ms\] \{peak:(.*)GiB\}",
                &[
                    DIJKSTRA_ZERO,
                    DIJKSTRA_HEAP_INSERT,
                    DIJKSTRA_VISIT,
                    DIJKSTRA_TOTAL,
                    DIJKSTRA_BANDWIDTH,
                    DIJKSTRA_DONE,
                    DIJKSTRA_PEAK,
                ],
            ),
            LineGrammarRule::new(
                "gen-unique",
                r"gen-unique \[(.*)\]: n = (.*), m = (.*), k = (.*), cost = (.*), seed = (.*)",
                &[GEN_TYPE, GEN_N, GEN_M, GEN_K, GEN_COST, GEN_SEED],
            ),
            LineGrammarRule::repeated("solution", r#""([^"]*)""#, EDGE_LIST),
            LineGrammarRule::new("terminals", r"terminals:(.*)", &[TERMINALS]),
            LineGrammarRule::new("command done", r"command done\.? \[(.*)ms\]", &[COMMAND_TIME]),
            LineGrammarRule::new(
                "grand total",
                r"grand total \[(.*)ms\] \{peak:(.*)GiB\}",
                &[GRAND_TOTAL, GRAND_PEAK],
            ),
            LineGrammarRule::new("host", r"host:(.*)", &[HOST]),
            LineGrammarRule::new("build", r"build:(.*), (.*)", &[BUILD_THREADS, BUILD_HEAP]),
            LineGrammarRule::new("compiler", r"compiler:(.*)", &[COMPILER]),
            LineGrammarRule::new("list solution", r"list solution:(.*)", &[LIST_SOLUTION]),
            LineGrammarRule::new("num threads", r"num threads:(.*)", &[NUM_THREADS]),
        ];
        for rule in rules {
            registry.push(rule.expect("built-in grammar rule must compile"));
        }

        if mode.family == CommandFamily::SteinerTree {
            registry.push(solver_rule(solver, mode.list_solution));
        }
        registry
    }
}

fn solver_rule(solver: &str, list_solution: bool) -> LineGrammarRule {
    use field::*;

    let name = regex::escape(solver);
    let prefix = format!("{solver}:");
    let rule = if list_solution {
        LineGrammarRule::new(
            &prefix,
            &format!(
                r"{name}: \[zero:(.*)ms\] \[kernel:(.*)ms (.*)GiB/s\] \[traceback:(.*)ms\] done\. \[(.*)ms\] \[cost:(.*)\] \{{peak:(.*)GiB\}} \{{curr:(.*)GiB\}}"
            ),
            &[
                SOLVER_ZERO,
                KERNEL,
                KERNEL_BANDWIDTH,
                TRACEBACK,
                SOLVER_TOTAL,
                SOLUTION_COST,
                SOLVER_PEAK,
                SOLVER_CURR,
            ],
        )
    } else {
        LineGrammarRule::new(
            &prefix,
            &format!(
                r"{name}: \[zero:(.*)ms\] \[kernel:(.*)ms (.*)GiB/s\] done\. \[(.*)ms\] \[cost:(.*)\] \{{peak:(.*)GiB\}} \{{curr:(.*)GiB\}}"
            ),
            &[
                SOLVER_ZERO,
                KERNEL,
                KERNEL_BANDWIDTH,
                SOLVER_TOTAL,
                SOLUTION_COST,
                SOLVER_PEAK,
                SOLVER_CURR,
            ],
        )
    };
    rule.expect("solver grammar rule must compile")
}
