//! Test harness module
//!
//! Seeded randomized checking of the single-flight controller

pub mod checker;

pub use checker::*;

/// Runs the checker across several seeds
pub struct TestHarness;

impl TestHarness {
    /// Run `config` once per seed in `seeds`
    #[must_use]
    pub fn run_certification(
        config: &HarnessConfig,
        seeds: std::ops::Range<u64>,
    ) -> CertificationReport {
        tracing::info!(seeds = ?seeds, steps = config.total_steps, "Running certification");

        let mut failed_seeds = Vec::new();
        let mut total_violations = 0;
        let mut seeds_tested = 0;

        for seed in seeds {
            let report = run_harness(HarnessConfig {
                seed,
                ..config.clone()
            });
            if !report.passed() {
                failed_seeds.push(seed);
            }
            total_violations += report.violations.len();
            seeds_tested += 1;
        }

        CertificationReport {
            passed: failed_seeds.is_empty(),
            total_violations,
            seeds_tested,
            failed_seeds,
        }
    }
}

/// Report from certification
#[derive(Debug, Clone)]
pub struct CertificationReport {
    /// Every seed passed
    pub passed: bool,
    /// Violations across all seeds
    pub total_violations: usize,
    /// Number of seeds run
    pub seeds_tested: u64,
    /// Seeds with at least one violation
    pub failed_seeds: Vec<u64>,
}
