// src/scoring.rs

//! Financial health scoring: three 0-5 scores, anomaly flags and a
//! templated rationale.

use std::collections::BTreeSet;

use crate::heuristics::Signals;
use crate::heuristics::text::format_number;
use crate::model::{FinancialHealth, KpiEntry, KpiLabel, Tone, kpi_value};

pub const FLAG_ELEVATED_DSO: &str = "Elevated DSO";
pub const FLAG_COST_PRESSURE: &str = "Cost pressure";
pub const FLAG_COMPLIANCE: &str = "Compliance/credit risk";
pub const FLAG_NEGATIVE_GROWTH: &str = "Negative growth";

const DSO_ALERT_DAYS: f64 = 50.0;

/// A KPI value, or a sentiment-driven default when the text had none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub value: f64,
    pub assumed: bool,
}

impl Metric {
    fn found_or(found: Option<f64>, default: f64) -> Self {
        match found {
            Some(value) => Self { value, assumed: false },
            None => Self { value: default, assumed: true },
        }
    }
}

/// Growth, margin and liquidity as fed into the scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveMetrics {
    pub growth: Metric,
    pub margin: Metric,
    pub liquidity: Metric,
}

pub fn effective_metrics(kpis: &[KpiEntry], tone: &Tone) -> EffectiveMetrics {
    let growth_default = match tone.net {
        n if n > 0 => 8.0,
        n if n < 0 => -6.0,
        _ => 0.0,
    };
    let upbeat = tone.net > 0;
    EffectiveMetrics {
        growth: Metric::found_or(kpi_value(kpis, KpiLabel::RevenueGrowth), growth_default),
        margin: Metric::found_or(
            kpi_value(kpis, KpiLabel::Margin),
            if upbeat { 20.0 } else { 12.0 },
        ),
        liquidity: Metric::found_or(
            kpi_value(kpis, KpiLabel::LiquidityRatio),
            if upbeat { 1.4 } else { 1.1 },
        ),
    }
}

fn scale(fraction: f64) -> u8 {
    (5.0 * fraction.clamp(0.0, 1.0)).round() as u8
}

pub fn profitability_score(margin: f64) -> u8 {
    scale(margin / 25.0)
}

pub fn liquidity_score(ratio: f64) -> u8 {
    scale(ratio / 2.0)
}

/// Fewer distinct counterparties means more concentration risk.
pub fn concentration_score(parties: usize) -> u8 {
    let risk = match parties {
        0..=2 => 0.7,
        3..=4 => 0.45,
        _ => 0.2,
    };
    scale(risk)
}

fn describe(metric: Metric, suffix: &str) -> String {
    let mut s = format!("{}{suffix}", format_number(metric.value));
    if metric.assumed {
        s.push_str(" (assumed)");
    }
    s
}

/// Fixed-template rationale citing the scored inputs.
pub fn compose_rationale(metrics: &EffectiveMetrics, parties: usize, flags: &BTreeSet<String>) -> String {
    let flags = if flags.is_empty() {
        "none".to_string()
    } else {
        flags.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    format!(
        "Growth {}, margin {}, liquidity {}; {} distinct part{}. Flags: {}.",
        describe(metrics.growth, "%"),
        describe(metrics.margin, "%"),
        describe(metrics.liquidity, "x"),
        parties,
        if parties == 1 { "y" } else { "ies" },
        flags
    )
}

pub fn score_health(kpis: &[KpiEntry], parties: usize, signals: &Signals) -> FinancialHealth {
    let metrics = effective_metrics(kpis, &signals.tone);

    let mut flags = BTreeSet::new();
    if kpi_value(kpis, KpiLabel::Dso).is_some_and(|d| d > DSO_ALERT_DAYS) {
        flags.insert(FLAG_ELEVATED_DSO.to_string());
    }
    if signals.cost_pressure {
        flags.insert(FLAG_COST_PRESSURE.to_string());
    }
    if signals.compliance_issue {
        flags.insert(FLAG_COMPLIANCE.to_string());
    }
    if metrics.growth.value < 0.0 {
        flags.insert(FLAG_NEGATIVE_GROWTH.to_string());
    }

    FinancialHealth {
        profitability_score: profitability_score(metrics.margin.value),
        liquidity_score: liquidity_score(metrics.liquidity.value),
        concentration_risk_score: concentration_score(parties),
        rationale: compose_rationale(&metrics, parties, &flags),
        anomaly_flags: flags,
    }
}
