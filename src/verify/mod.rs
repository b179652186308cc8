use crate::error::{HarnessError, Result};
use crate::grammar::field;
use crate::record::ParsedRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fmt;

static EDGE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s+(\d+)\b").expect("edge token pattern"));

/// Verdict on a listed solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Disconnected,
    /// First terminal, in input order, that is not a vertex of the solution.
    UncoveredTerminal(u64),
}

impl Verification {
    pub fn passed(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Verified => write!(f, "pass"),
            Verification::Disconnected => write!(f, "fail, graph is disconnected"),
            Verification::UncoveredTerminal(id) => write!(f, "fail, {id} terminal not covered"),
        }
    }
}

/// Undirected graph over the vertices touched by a solution's edges,
/// tracked as a disjoint-set forest.
#[derive(Debug, Default)]
pub struct SolutionGraph {
    index: FxHashMap<u64, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
    components: usize,
    edges: usize,
}

impl SolutionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from `"u v"` tokens as printed in a `solution:` line.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut graph = Self::new();
        for token in tokens {
            let (u, v) = parse_edge(token.as_ref())?;
            graph.add_edge(u, v);
        }
        Ok(graph)
    }

    pub fn add_edge(&mut self, u: u64, v: u64) {
        let a = self.vertex(u);
        let b = self.vertex(v);
        self.union(a, b);
        self.edges += 1;
    }

    pub fn contains(&self, v: u64) -> bool {
        self.index.contains_key(&v)
    }

    pub fn vertex_count(&self) -> usize {
        self.parent.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// True when every vertex lies in one component. An empty graph counts
    /// as connected.
    pub fn is_connected(&self) -> bool {
        self.components <= 1
    }

    fn vertex(&mut self, v: u64) -> usize {
        if let Some(&i) = self.index.get(&v) {
            return i;
        }
        let i = self.parent.len();
        self.index.insert(v, i);
        self.parent.push(i);
        self.rank.push(0);
        self.components += 1;
        i
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        self.components -= 1;
    }
}

fn parse_edge(token: &str) -> Result<(u64, u64)> {
    let caps = EDGE_TOKEN
        .captures(token)
        .ok_or_else(|| HarnessError::MalformedEdge(token.to_string()))?;
    let endpoint = |i: usize| -> Result<u64> {
        caps[i]
            .parse()
            .map_err(|_| HarnessError::MalformedEdge(token.to_string()))
    };
    Ok((endpoint(1)?, endpoint(2)?))
}

/// Parses a space-separated terminal list as printed by the solver.
pub fn parse_terminals(terminals: &str) -> Result<Vec<u64>> {
    terminals
        .split_whitespace()
        .map(|id| {
            id.parse().map_err(|_| HarnessError::InvalidField {
                field: field::TERMINALS.to_string(),
                value: id.to_string(),
                expected: "a vertex id",
            })
        })
        .collect()
}

/// Checks that the listed edges form one connected component that
/// touches every terminal.
///
/// Connectivity is decided first; a disconnected solution is reported as
/// such without looking at the terminals.
pub fn verify<S: AsRef<str>>(edge_list: &[S], terminals: &str) -> Result<Verification> {
    let graph = SolutionGraph::from_tokens(edge_list)?;
    if !graph.is_connected() {
        return Ok(Verification::Disconnected);
    }
    for id in parse_terminals(terminals)? {
        if !graph.contains(id) {
            return Ok(Verification::UncoveredTerminal(id));
        }
    }
    Ok(Verification::Verified)
}

/// Verifies the solution listed in `record`. A log without a `solution`
/// line lists no edges.
pub fn verify_record(record: &ParsedRecord) -> Result<Verification> {
    let edges: &[String] = if record.contains(field::EDGE_LIST) {
        record.list(field::EDGE_LIST)?
    } else {
        &[]
    };
    verify(edges, record.text(field::TERMINALS)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["0 1", "1 2"], "0 2 3", Verification::UncoveredTerminal(3))]
    #[case(&["0 1", "2 3"], "0 2", Verification::Disconnected)]
    #[case(&["0 1", "2 3"], "9", Verification::Disconnected)]
    #[case(&["1 2", "2 3", "3 4"], "4 1", Verification::Verified)]
    #[case(&["1 2", "2 3"], "7 3 5", Verification::UncoveredTerminal(7))]
    #[case(&["5 5"], "5", Verification::Verified)]
    #[case(&[], "", Verification::Verified)]
    #[case(&[], "1", Verification::UncoveredTerminal(1))]
    fn verdicts(#[case] edges: &[&str], #[case] terminals: &str, #[case] expected: Verification) {
        assert_eq!(verify(edges, terminals).unwrap(), expected);
    }

    #[test]
    fn record_without_solution_lists_no_edges() {
        let mut record = ParsedRecord::new();
        record.insert(field::TERMINALS, FieldValue::Text("2 5".into()));
        assert_eq!(
            verify_record(&record).unwrap(),
            Verification::UncoveredTerminal(2)
        );

        record.insert(
            field::EDGE_LIST,
            FieldValue::List(vec!["2 4".into(), "4 5".into()]),
        );
        assert_eq!(verify_record(&record).unwrap(), Verification::Verified);
    }

    #[test]
    fn messages() {
        assert_eq!(Verification::Verified.to_string(), "pass");
        assert_eq!(
            Verification::Disconnected.to_string(),
            "fail, graph is disconnected"
        );
        assert_eq!(
            Verification::UncoveredTerminal(12).to_string(),
            "fail, 12 terminal not covered"
        );
    }

    #[test]
    fn malformed_tokens_are_errors() {
        assert!(matches!(
            verify(&["1-2"], "1"),
            Err(HarnessError::MalformedEdge(ref t)) if t == "1-2"
        ));
        assert!(matches!(
            verify(&["1 2"], "1 x"),
            Err(HarnessError::InvalidField { .. })
        ));
    }

    #[test]
    fn graph_counts() {
        let graph = SolutionGraph::from_tokens(&["1 2", "2 3", "1 3", "8 9"]).unwrap();
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert!(!graph.is_connected());
    }

    proptest! {
        #[test]
        fn paths_cover_their_vertices(len in 1u64..200, probe in 0u64..400) {
            let edges: Vec<String> = (0..len).map(|i| format!("{} {}", i, i + 1)).collect();
            let terminals = format!("0 {len} {probe}");
            let expected = if probe <= len {
                Verification::Verified
            } else {
                Verification::UncoveredTerminal(probe)
            };
            prop_assert_eq!(verify(&edges, &terminals).unwrap(), expected);
        }

        #[test]
        fn split_paths_are_disconnected(len in 1u64..100, gap in 2u64..50) {
            let mut edges: Vec<String> = (0..len).map(|i| format!("{} {}", i, i + 1)).collect();
            let start = len + gap;
            edges.push(format!("{} {}", start, start + 1));
            prop_assert_eq!(verify(&edges, "0").unwrap(), Verification::Disconnected);
        }
    }
}
