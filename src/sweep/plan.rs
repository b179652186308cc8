use super::config::SweepConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Smallest seed handed to the generator or solver.
pub const SEED_MIN: u64 = 512;
/// Largest seed handed to the generator or solver.
pub const SEED_MAX: u64 = 2 << 32;

/// The single pseudo-random sequence behind a sweep's seeds.
///
/// Reproducing a sweep requires drawing from it in exactly the order
/// [`plan`] does.
#[derive(Debug, Clone)]
pub struct SeedSource {
    rng: StdRng,
}

impl SeedSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn draw(&mut self) -> u64 {
        self.rng.gen_range(SEED_MIN..=SEED_MAX)
    }
}

/// One combination of grid parameters and repeat indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepPoint {
    pub n: u64,
    pub d: u64,
    pub k: u64,
    pub graph: u32,
    pub run: u32,
    /// Seed for the generator, shared by all runs of one graph repeat.
    pub gen_seed: u64,
    /// Seed for the solver, fresh for every run.
    pub seed: u64,
}

impl SweepPoint {
    /// File stem for this point's log and error files.
    pub fn stem(&self) -> String {
        format!(
            "n{}-d{}-k{}-g{}-r{}",
            self.n, self.d, self.k, self.graph, self.run
        )
    }

    pub fn log_file_name(&self) -> String {
        format!("{}.log", self.stem())
    }

    pub fn err_file_name(&self) -> String {
        format!("{}.err", self.stem())
    }
}

/// Expands the grid into sweep points in execution order:
/// (n, d, k) outermost, then (graph repeat, run repeat).
///
/// A generator seed is drawn at the first run of every graph repeat, then a
/// solver seed for every run.
pub fn plan(config: &SweepConfig, seeds: &mut SeedSource) -> Vec<SweepPoint> {
    let mut points = Vec::new();
    let mut gen_seed = 0;
    for &n in &config.nodes {
        for &d in &config.degrees {
            for &k in &config.terminals {
                for graph in 0..config.graph_repeats {
                    for run in 0..config.repeats {
                        if run == 0 {
                            gen_seed = seeds.draw();
                        }
                        let seed = seeds.draw();
                        points.push(SweepPoint {
                            n,
                            d,
                            k,
                            graph,
                            run,
                            gen_seed,
                            seed,
                        });
                    }
                }
            }
        }
    }
    points
}
