//! Demo entry point: builds synthetic curves from a TOML config or preset,
//! simulates them and prints the metrics report.

use std::path::Path;
use std::process;

use balance_sim::config::DemoConfig;
use balance_sim::io::export::{export_metrics_csv, export_results_csv};
use balance_sim::sim::{simulate, summarize};
use tracing_subscriber::EnvFilter;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    results_out: Option<String>,
    metrics_out: Option<String>,
}

fn print_help() {
    eprintln!("balance-sim: local energy balance simulator");
    eprintln!();
    eprintln!("Usage: balance-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        DemoConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --results-out <path>     Export per-timestep curves to CSV");
    eprintln!("  --metrics-out <path>     Export aggregated metrics to CSV");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Set RUST_LOG=debug to trace each simulation stage.");
}

/// Returns the value following option `args[*i]`, advancing `i`.
fn option_value(args: &[String], i: &mut usize, what: &str) -> String {
    *i += 1;
    match args.get(*i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {} requires {what}", args[*i - 1]);
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        results_out: None,
        metrics_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(option_value(&args, &mut i, "a path argument")),
            "--preset" => cli.preset = Some(option_value(&args, &mut i, "a name argument")),
            "--seed" => {
                let raw = option_value(&args, &mut i, "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--results-out" => cli.results_out = Some(option_value(&args, &mut i, "a path argument")),
            "--metrics-out" => cli.metrics_out = Some(option_value(&args, &mut i, "a path argument")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // --scenario takes priority, then --preset, then the baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        DemoConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        DemoConfig::from_preset(name)
    } else {
        Ok(DemoConfig::baseline())
    };
    let mut demo = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed_override {
        demo.simulation.seed = seed;
    }

    let errors = demo.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let outcome = demo.to_scenario().and_then(|scenario| {
        let results = simulate(&scenario)?;
        let metrics = summarize(&results)?;
        Ok((results, metrics))
    });
    let (results, metrics) = outcome.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("{metrics}");

    if let Some(ref path) = cli.results_out {
        if let Err(e) = export_results_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write results CSV: {e}");
            process::exit(1);
        }
        eprintln!("Results written to {path}");
    }
    if let Some(ref path) = cli.metrics_out {
        if let Err(e) = export_metrics_csv(&metrics, Path::new(path)) {
            eprintln!("error: failed to write metrics CSV: {e}");
            process::exit(1);
        }
        eprintln!("Metrics written to {path}");
    }
}
