use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use flight_core::logging::{self, TracingObserver};
use flight_core::observer::Fanout;
use flight_core::ports::{RandomSource, SeededRandom, TokioScheduler, VirtualScheduler};
use flight_core::runtime::{self, Command as LoopCommand};
use flight_core::status::{StatusFormat, StatusReporter};
use flight_core::test_harness::{run_harness, HarnessConfig, StepDistribution, TestHarness};
use flight_core::{OperationRequest, SimulatorConfig, SingleFlightSimulator};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();

    let filter = matches.get_one::<String>("log").map_or("warn", String::as_str);
    logging::init(filter);

    match matches.subcommand() {
        Some(("demo", args)) => demo(args).await,
        Some(("script", args)) => script(args),
        Some(("simulate", args)) => simulate(args),
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn cli() -> Command {
    Command::new("flight-sim")
        .version(flight_core::VERSION)
        .about("Single-flight simulated request controller")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML file with delay range and success probability"),
        )
        .arg(
            Arg::new("min-delay-ms")
                .long("min-delay-ms")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Lower bound of the completion delay"),
        )
        .arg(
            Arg::new("max-delay-ms")
                .long("max-delay-ms")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Upper bound of the completion delay"),
        )
        .arg(
            Arg::new("success-probability")
                .long("success-probability")
                .global(true)
                .value_parser(value_parser!(f64))
                .help("Probability that a completed operation succeeds"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Random seed for reproducibility"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print events as JSON lines"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .help("Log filter when RUST_LOG is unset (default: warn)"),
        )
        .subcommand(
            Command::new("demo")
                .about("Submit operations typed on stdin; `cancel` aborts the in-flight one"),
        )
        .subcommand(
            Command::new("script")
                .about("Replay a timeline on virtual time")
                .arg(
                    Arg::new("at")
                        .long("at")
                        .required(true)
                        .action(ArgAction::Append)
                        .value_parser(parse_timed)
                        .help("Submission as <offset-ms>:<name>, e.g. 500:Soda"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized single-flight checker")
                .arg(
                    Arg::new("steps")
                        .long("steps")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of steps to simulate"),
                )
                .arg(
                    Arg::new("seeds")
                        .long("seeds")
                        .value_parser(value_parser!(u64))
                        .help("Check this many consecutive seeds starting at --seed"),
                )
                .arg(
                    Arg::new("with-cancel")
                        .long("with-cancel")
                        .action(ArgAction::SetTrue)
                        .help("Also generate cancellations"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                ),
        )
}

fn parse_timed(raw: &str) -> Result<(u64, String), String> {
    let (offset, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected <offset-ms>:<name>, got `{raw}`"))?;
    let offset = offset
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid offset `{offset}`: {e}"))?;
    Ok((offset, name.to_string()))
}

fn resolve_config(args: &ArgMatches) -> Result<SimulatorConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    if let Some(&min_ms) = args.get_one::<u64>("min-delay-ms") {
        config.delay.min_ms = min_ms;
    }
    if let Some(&max_ms) = args.get_one::<u64>("max-delay-ms") {
        config.delay.max_ms = max_ms;
    }
    if let Some(&p) = args.get_one::<f64>("success-probability") {
        config.success_probability = p;
    }
    config.validate()?;
    Ok(config)
}

fn random_source(args: &ArgMatches) -> SeededRandom {
    match args.get_one::<u64>("seed") {
        Some(&seed) => SeededRandom::from_seed(seed),
        None => SeededRandom::from_entropy(),
    }
}

fn status_format(args: &ArgMatches) -> StatusFormat {
    if args.get_flag("json") {
        StatusFormat::Json
    } else {
        StatusFormat::Text
    }
}

fn reporter(args: &ArgMatches) -> Fanout<StatusReporter<io::Stdout>, TracingObserver> {
    Fanout(
        StatusReporter::new(io::stdout(), status_format(args)),
        TracingObserver,
    )
}

async fn demo(args: &ArgMatches) -> Result<ExitCode> {
    let config = resolve_config(args)?;
    let sim = SingleFlightSimulator::new(
        config,
        TokioScheduler::new(),
        random_source(args),
        reporter(args),
    )?;

    eprintln!(
        "Type an item name to order it (delay {}-{}ms, success {:.0}%). `cancel` aborts, Ctrl-D exits.",
        config.delay.min_ms,
        config.delay.max_ms,
        config.success_probability * 100.0
    );

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(%err, "Failed to read stdin");
                    break;
                }
            };
            let command = match line.trim() {
                "" => continue,
                "cancel" => LoopCommand::Cancel,
                name => LoopCommand::Submit(name.to_string()),
            };
            if tx.send(command).await.is_err() {
                break;
            }
        }
    });

    runtime::drive(sim, rx).await;
    Ok(ExitCode::SUCCESS)
}

fn script(args: &ArgMatches) -> Result<ExitCode> {
    let config = resolve_config(args)?;
    let mut timeline: Vec<(u64, String)> = args
        .get_many::<(u64, String)>("at")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    timeline.sort_by_key(|(offset, _)| *offset);

    let mut sim = SingleFlightSimulator::new(
        config,
        VirtualScheduler::new(),
        random_source(args),
        reporter(args),
    )?;
    replay(&mut sim, &timeline)?;
    Ok(ExitCode::SUCCESS)
}

fn replay<R, O>(
    sim: &mut SingleFlightSimulator<VirtualScheduler, R, O>,
    timeline: &[(u64, String)],
) -> Result<()>
where
    R: RandomSource,
    O: flight_core::observer::Observer,
{
    for (offset, name) in timeline {
        let at = Duration::from_millis(*offset);
        sim.advance(at.saturating_sub(sim.elapsed()));
        let request = OperationRequest::new(name.as_str())
            .with_context(|| format!("entry at {offset}ms"))?;
        // Rejections are reported through the observer.
        let _ = sim.submit(request);
    }
    sim.run_until_idle();
    Ok(())
}

fn simulate(args: &ArgMatches) -> Result<ExitCode> {
    let simulator = resolve_config(args)?;
    let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
    let total_steps = *args
        .get_one::<u64>("steps")
        .context("missing --steps")?;
    let mut distribution = StepDistribution::default();
    if args.get_flag("with-cancel") {
        distribution.cancel = 0.05;
    }

    let config = HarnessConfig {
        seed,
        total_steps,
        distribution,
        simulator,
        stop_on_first_violation: args.get_flag("stop-on-violation"),
        ..Default::default()
    };

    if let Some(&count) = args.get_one::<u64>("seeds") {
        if count == 0 {
            bail!("--seeds must be at least 1");
        }
        let report = TestHarness::run_certification(&config, seed..seed.saturating_add(count));
        println!("Seeds tested: {}", report.seeds_tested);
        println!("Violations: {}", report.total_violations);
        if !report.failed_seeds.is_empty() {
            println!("Failed seeds: {:?}", report.failed_seeds);
        }
        println!("Result: {}", if report.passed { "PASS" } else { "FAIL" });
        return Ok(if report.passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    println!("Running single-flight checker...");
    println!("Steps: {total_steps}");
    println!("Seed: {seed}");
    println!();

    let report = run_harness(config);
    println!("{}", report.generate_text());

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeline_entries() {
        assert_eq!(parse_timed("500:Soda"), Ok((500, "Soda".to_string())));
        assert!(parse_timed("Soda").is_err());
        assert!(parse_timed("x:Soda").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let matches = cli()
            .try_get_matches_from([
                "flight-sim",
                "script",
                "--at",
                "0:Pizza",
                "--min-delay-ms",
                "1500",
                "--max-delay-ms",
                "1500",
                "--success-probability",
                "1.0",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let config = resolve_config(args).unwrap();
        assert_eq!(config.delay.min_ms, 1500);
        assert_eq!(config.delay.max_ms, 1500);
        assert!((config.success_probability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_flags_are_reported() {
        let matches = cli()
            .try_get_matches_from(["flight-sim", "simulate", "--success-probability", "3"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(resolve_config(args).is_err());
    }

    #[test]
    fn replay_rejects_overlapping_entries() {
        let mut sim = SingleFlightSimulator::new(
            SimulatorConfig::new()
                .with_fixed_delay(1500)
                .with_success_probability(1.0),
            VirtualScheduler::new(),
            SeededRandom::from_seed(0),
            flight_core::observer::RecordingObserver::new(),
        )
        .unwrap();
        let timeline = vec![(0, "Pizza".to_string()), (500, "Soda".to_string())];
        replay(&mut sim, &timeline).unwrap();

        let kinds: Vec<_> = sim.observer().events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["accepted", "rejected", "succeeded"]);
    }
}
