//! Command-line parsing for the `lambdas` binary.
//!
//! Parsing and dispatch stay separate from the numerical code: this module only
//! describes arguments, `crate::app` turns them into engine calls.

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_MAX_ITER, DEFAULT_TOL, EngineConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lambdas", version, about = "REE pattern shape coefficients (lambdas)")]
pub struct Cli {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print results as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit N lambdas to one pattern, choosing the best Eu/Ce anomaly hypothesis.
    Fit(FitArgs),
    /// Relative probability of each lambda count in a range.
    Select(SelectArgs),
    /// Evaluate a lambda model at the canonical radii.
    Eval(EvalArgs),
    /// Generate a synthetic pattern from known lambdas.
    Synth(SynthArgs),
}

/// Basis solver settings shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Newton convergence tolerance for basis roots.
    #[arg(long, global = true, env = "LAMBDAS_TOL", default_value_t = DEFAULT_TOL)]
    pub tol: f64,

    /// Newton iteration limit per basis degree.
    #[arg(long, global = true, env = "LAMBDAS_MAX_ITER", default_value_t = DEFAULT_MAX_ITER)]
    pub max_iter: usize,

    /// Round basis roots to this many decimals.
    #[arg(long, global = true, env = "LAMBDAS_ROUNDING")]
    pub rounding: Option<u32>,
}

impl EngineArgs {
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            rounding: self.rounding,
            tol: self.tol,
            max_iter: self.max_iter,
        }
    }
}

/// One REE pattern on the command line.
#[derive(Debug, Args, Clone)]
pub struct PatternArgs {
    /// 14 values La..Lu; `na`, `nan` or `-` marks a missing element.
    #[arg(value_name = "VALUE", num_args = 1.., allow_negative_numbers = true, value_parser = parse_value)]
    pub values: Vec<Option<f64>>,

    /// Values are raw concentrations; normalize to CI chondrite first.
    #[arg(long)]
    pub raw: bool,

    /// Analytical uncertainty in percent (chi-squared scale).
    #[arg(long, env = "LAMBDAS_STD_DEV", default_value_t = 2.0)]
    pub std_dev: f64,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub pattern: PatternArgs,

    /// Number of lambdas to fit.
    #[arg(short = 'n', long, default_value_t = 4)]
    pub n: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SelectArgs {
    #[command(flatten)]
    pub pattern: PatternArgs,

    #[arg(long, default_value_t = 1)]
    pub min_n: usize,

    #[arg(long, default_value_t = 7)]
    pub max_n: usize,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Lambdas, lowest order first.
    #[arg(value_name = "LAMBDA", num_args = 1.., allow_negative_numbers = true)]
    pub lambdas: Vec<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Lambdas, lowest order first.
    #[arg(value_name = "LAMBDA", num_args = 1.., allow_negative_numbers = true)]
    pub lambdas: Vec<f64>,

    /// Gaussian noise in percent.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Eu anomaly as ln(Eu/Eu*).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub eu: f64,

    /// Ce anomaly as ln(Ce/Ce*).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub ce: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse one pattern value; missing markers become `None`.
pub fn parse_value(s: &str) -> Result<Option<f64>, String> {
    let t = s.trim();
    if t == "-" || t.eq_ignore_ascii_case("na") || t.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let v: f64 = t.parse().map_err(|_| format!("not a number: {s:?}"))?;
    if !v.is_finite() {
        return Err(format!("value must be finite: {s:?}"));
    }
    Ok(Some(v))
}
