//! Formatted terminal output for fits, order scans and patterns.
//!
//! All output is built as plain `String`s so the binary only has to print and
//! tests can assert on content.

use crate::data::ReeTable;
use crate::domain::{AnomalyFit, ModelScore, OrderDistribution};
use crate::report::ElementResidual;

/// Summary of one best-anomaly fit: candidates, lambdas and residuals.
pub fn format_fit_summary(
    best: &AnomalyFit,
    score: &ModelScore,
    residuals: &[ElementResidual],
    std_dev: f64,
) -> String {
    let mut out = String::new();

    out.push_str("=== lambdas - REE pattern fit ===\n");
    out.push_str(&format!(
        "Lambdas: n={} | std_dev={std_dev}% | dof={}\n",
        best.fit.n(),
        best.fit.dof
    ));

    out.push_str("\nAnomaly hypotheses:\n");
    for c in &best.candidates {
        let chosen = if c.anomaly == best.anomaly { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<10} chi2={:.4} dof={}\n",
            c.anomaly.display_name(),
            c.chi_squared,
            c.dof
        ));
    }

    out.push_str("\nLambdas:\n");
    for (i, (lam, var)) in best
        .fit
        .lambdas
        .iter()
        .zip(best.fit.covariance.diagonal().iter())
        .enumerate()
    {
        out.push_str(&format!("- lambda{i}: {lam:>14.6} +/- {:.6}\n", var.max(0.0).sqrt()));
    }
    out.push_str(&format!(
        "- SSE={:.6} chi2={:.4} ln P={:.4}\n",
        best.fit.sse, best.fit.chi_squared, score.ln_probability
    ));

    if !best.anomalies.is_empty() {
        out.push_str("\nAnomalies (ln observed/modelled):\n");
        for a in &best.anomalies {
            out.push_str(&format!("- {}/{}*: {:.4}\n", a.element, a.element, a.log_ratio));
        }
    }

    out.push('\n');
    out.push_str(&format_residual_table(residuals));
    out
}

/// Order-selection table, most probable order marked.
pub fn format_order_distribution(dist: &OrderDistribution) -> String {
    let mut out = String::new();
    let top = dist.most_probable().map(|e| e.n);

    out.push_str("=== lambdas - order selection ===\n");
    out.push_str(&format!(
        "{:<2}{:>3} {:>12} {:>14} {:>10} {:>10}\n",
        "", "N", "P(N)", "ln P", "chi2", "anomaly"
    ));
    for e in &dist.entries {
        let chosen = if Some(e.n) == top { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:>3} {:>12.6} {:>14.4} {:>10.4} {:>10}\n",
            e.n,
            e.probability,
            e.score.ln_probability,
            e.best.fit.chi_squared,
            e.best.anomaly.display_name()
        ));
    }
    out
}

/// One value per element, missing shown as `-`.
pub fn format_pattern(table: &ReeTable, values: &[Option<f64>]) -> String {
    let mut out = String::new();
    for (i, (radius, v)) in table.radii.iter().zip(values.iter()).enumerate() {
        out.push_str(&format!("{:<3} {:>6.3} {:>10}\n", table.name(i), radius, fmt_opt(*v)));
    }
    out
}

fn format_residual_table(rows: &[ElementResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<3} {:>6} {:>10} {:>10} {:>10}\n",
        "el", "radius", "observed", "fitted", "residual"
    ));
    out.push_str(&format!("{:-<3} {:-<6} {:-<10} {:-<10} {:-<10}\n", "", "", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:<3} {:>6.3} {:>10} {:>10.4} {:>10}\n",
            r.element,
            r.radius,
            fmt_opt(r.observed),
            r.fitted,
            fmt_opt(r.residual)
        ));
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.4}"),
        None => "-".to_string(),
    }
}
