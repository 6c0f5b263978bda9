//! Randomized checker runs
//!
//! Run with: cargo test --package flight-core --test harness_tests

use flight_core::test_harness::{run_harness, HarnessConfig, StepDistribution, TestHarness};
use flight_core::SimulatorConfig;

#[test]
fn test_checker_passes_with_defaults() {
    let report = run_harness(HarnessConfig {
        total_steps: 5_000,
        ..HarnessConfig::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.stats.total_steps, 5_000);
    assert!(report.generate_text().contains("=== Result: PASS ==="));
}

#[test]
fn test_checker_passes_with_cancellation() {
    let report = run_harness(HarnessConfig {
        seed: 7,
        total_steps: 5_000,
        distribution: StepDistribution {
            submit: 0.5,
            advance: 0.4,
            cancel: 0.1,
        },
        ..HarnessConfig::default()
    });
    assert!(report.passed(), "{}", report.generate_text());
    assert!(report.stats.cancelled > 0);
}

#[test]
fn test_checker_extreme_configs() {
    for simulator in [
        SimulatorConfig::new().with_fixed_delay(0).with_success_probability(1.0),
        SimulatorConfig::new().with_fixed_delay(1500).with_success_probability(0.0),
    ] {
        let report = run_harness(HarnessConfig {
            total_steps: 2_000,
            simulator,
            ..HarnessConfig::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
    }
}

#[test]
fn test_checker_reports_invalid_config() {
    let report = run_harness(HarnessConfig {
        simulator: SimulatorConfig::new().with_success_probability(7.0),
        ..HarnessConfig::default()
    });
    assert!(!report.passed());
    assert!(report.generate_text().contains("FAIL"));
}

#[test]
fn test_certification_over_seeds() {
    let config = HarnessConfig {
        total_steps: 1_000,
        ..HarnessConfig::default()
    };
    let report = TestHarness::run_certification(&config, 0..8);
    assert!(report.passed, "failed seeds: {:?}", report.failed_seeds);
    assert_eq!(report.seeds_tested, 8);
    assert_eq!(report.total_violations, 0);
}
