//! Top-level application orchestration.
//!
//! `src/main.rs` only maps errors to exit codes; this module is the real main:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - builds a `LambdaEngine`
//! - runs the requested command and prints text or JSON

use clap::Parser;
use serde::Serialize;

use crate::cli::{Cli, Command, EvalArgs, FitArgs, PatternArgs, SelectArgs, SynthArgs};
use crate::data::{ReeTable, SampleSpec};
use crate::domain::{AnomalyFit, ModelScore};
use crate::engine::LambdaEngine;
use crate::error::{AppError, Result};
use crate::report::{
    ElementResidual, compute_residuals, format_fit_summary, format_order_distribution, format_pattern,
};

/// Entry point for the `lambdas` binary.
pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let engine = LambdaEngine::new(cli.engine.config(), ReeTable::default())?;
    log::debug!("engine config: {:?}", engine.solver().config());

    match cli.command {
        Command::Fit(args) => handle_fit(&engine, args, cli.json),
        Command::Select(args) => handle_select(&engine, args, cli.json),
        Command::Eval(args) => handle_eval(&engine, args, cli.json),
        Command::Synth(args) => handle_synth(&engine, args, cli.json),
    }
}

#[derive(Debug, Serialize)]
struct FitReport<'a> {
    pattern: &'a [Option<f64>],
    best: &'a AnomalyFit,
    score: &'a ModelScore,
    residuals: &'a [ElementResidual],
}

#[derive(Debug, Serialize)]
struct PatternReport<'a> {
    elements: &'a [String],
    values: &'a [f64],
}

fn handle_fit(engine: &LambdaEngine, args: FitArgs, json: bool) -> Result<()> {
    let ree = load_pattern(engine, &args.pattern)?;
    let std_dev = args.pattern.std_dev;

    let best = engine.best_fit_anomaly(&ree, args.n, std_dev)?;
    let score = engine.score(&best.fit)?;
    let basis = engine.basis(args.n)?;
    let residuals = compute_residuals(engine.table(), &ree, &best.fit, &basis)?;

    if json {
        let report = FitReport {
            pattern: &ree,
            best: &best,
            score: &score,
            residuals: &residuals,
        };
        print_json(&report)
    } else {
        println!("{}", format_fit_summary(&best, &score, &residuals, std_dev));
        Ok(())
    }
}

fn handle_select(engine: &LambdaEngine, args: SelectArgs, json: bool) -> Result<()> {
    let ree = load_pattern(engine, &args.pattern)?;
    let dist = engine.order_probabilities(&ree, args.min_n, args.max_n, args.pattern.std_dev)?;

    if json {
        print_json(&dist)
    } else {
        println!("{}", format_order_distribution(&dist));
        Ok(())
    }
}

fn handle_eval(engine: &LambdaEngine, args: EvalArgs, json: bool) -> Result<()> {
    let values = engine.evaluate_pattern(&args.lambdas)?;
    print_pattern(engine, &values, json)
}

fn handle_synth(engine: &LambdaEngine, args: SynthArgs, json: bool) -> Result<()> {
    let spec = SampleSpec {
        lambdas: args.lambdas,
        noise_pct: args.noise,
        eu_anomaly: args.eu,
        ce_anomaly: args.ce,
        seed: args.seed,
    };
    let values = engine.synthesize(&spec)?;
    print_pattern(engine, &values, json)
}

/// Pattern values in log chondrite-normalized form.
fn load_pattern(engine: &LambdaEngine, args: &PatternArgs) -> Result<Vec<Option<f64>>> {
    engine.table().check_observation(&args.values)?;
    if args.raw {
        engine.normalize(&args.values)
    } else {
        Ok(args.values.clone())
    }
}

fn print_pattern(engine: &LambdaEngine, values: &[f64], json: bool) -> Result<()> {
    if json {
        print_json(&PatternReport {
            elements: &engine.table().names,
            values,
        })
    } else {
        let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        print!("{}", format_pattern(engine.table(), &present));
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::invalid(format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}
