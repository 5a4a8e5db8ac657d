// src/aggregate.rs

//! Map-reduce merge of per-chunk analyses.
//!
//! Every field merges by union, sum, max or an explicit tie-break, so the
//! result does not depend on which chunk finished first.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::analyzer::currencies_of;
use crate::config::EngineConfig;
use crate::heuristics::kpi::round_to;
use crate::model::{
    ActionEntry, Amount, AmountLabel, Analysis, EntityRoles, FinancialHealth, KeyEntities, KpiEntry, KpiLabel,
    Language, RiskEntry, Role, Tone,
};
use crate::scoring::{compose_rationale, effective_metrics};
use crate::synthesis::synthesize;

/// Keep the larger magnitude; on equal magnitude the larger signed value.
fn wins(candidate: f64, current: f64) -> bool {
    match candidate.abs().total_cmp(&current.abs()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => candidate > current,
        std::cmp::Ordering::Less => false,
    }
}

pub fn merge_amounts<'a>(parts: impl IntoIterator<Item = &'a Amount>, cap: usize) -> Vec<Amount> {
    let mut best: BTreeMap<(AmountLabel, Option<String>), f64> = BTreeMap::new();
    for a in parts {
        let key = (a.label, a.currency.clone());
        match best.get_mut(&key) {
            Some(v) if wins(a.value, *v) => *v = a.value,
            Some(_) => {}
            None => {
                best.insert(key, a.value);
            }
        }
    }
    let mut merged: Vec<Amount> = best
        .into_iter()
        .map(|((label, currency), value)| Amount { label, value, currency })
        .collect();
    // BTreeMap order already gives label/currency; the stable sort keeps it on ties
    merged.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    merged.truncate(cap);
    merged
}

pub fn merge_kpis<'a>(parts: impl IntoIterator<Item = &'a KpiEntry>, cap: usize) -> Vec<KpiEntry> {
    let mut best: BTreeMap<KpiLabel, KpiEntry> = BTreeMap::new();
    for k in parts {
        match best.get_mut(&k.label) {
            Some(cur) if wins(k.value, cur.value) => *cur = k.clone(),
            Some(_) => {}
            None => {
                best.insert(k.label, k.clone());
            }
        }
    }
    best.into_values()
        .map(|mut k| {
            if let Some(unit) = k.label.fixed_unit() {
                k.unit = unit.to_string();
            }
            k
        })
        .take(cap)
        .collect()
}

fn merge_roles<'a>(parts: impl IntoIterator<Item = &'a EntityRoles>, cap: usize) -> EntityRoles {
    let mut merged = EntityRoles::default();
    for roles in parts {
        for role in Role::ALL {
            for name in roles.get(role) {
                merged.push_capped(role, name, cap);
            }
        }
    }
    merged
}

fn union_capped<'a>(parts: impl IntoIterator<Item = &'a String>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for s in parts {
        if out.len() >= cap {
            break;
        }
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}

/// Same-name risks collapse to the most severe one.
fn merge_risks<'a>(parts: impl IntoIterator<Item = &'a RiskEntry>, cap: usize) -> Vec<RiskEntry> {
    let mut out: Vec<RiskEntry> = Vec::new();
    for r in parts {
        match out.iter().position(|o| o.risk == r.risk) {
            Some(i) if r.severity > out[i].severity => out[i] = r.clone(),
            Some(_) => {}
            None if out.len() < cap => out.push(r.clone()),
            None => {}
        }
    }
    out
}

/// First occurrence of each action text, renumbered 1..n.
fn merge_actions<'a>(parts: impl IntoIterator<Item = &'a ActionEntry>, cap: usize) -> Vec<ActionEntry> {
    let mut seen = BTreeSet::new();
    parts
        .into_iter()
        .filter(|a| seen.insert(a.action.as_str()))
        .take(cap)
        .zip(1..)
        .map(|(a, priority)| ActionEntry {
            priority,
            ..a.clone()
        })
        .collect()
}

fn mean_score(scores: impl Iterator<Item = u8>) -> u8 {
    let (sum, n) = scores.fold((0u32, 0u32), |(s, n), v| (s + u32::from(v), n + 1));
    if n == 0 {
        0
    } else {
        (f64::from(sum) / f64::from(n)).round() as u8
    }
}

/// Merge chunk analyses in chunk order. A single partial comes back unchanged.
pub fn aggregate(mut partials: Vec<Analysis>, cfg: &EngineConfig, language_out: Option<Language>) -> Analysis {
    if partials.len() == 1 {
        if let Some(only) = partials.pop() {
            return only;
        }
    }
    let n = partials.len();
    debug!(partials = n, "Merging chunk analyses");

    let detected_language = if partials.iter().any(|p| p.detected_language == Language::Ara) {
        Language::Ara
    } else {
        Language::Eng
    };
    let doc_type = partials
        .iter()
        .map(|p| p.doc_type.as_str())
        .find(|t| *t != "document")
        .unwrap_or("document")
        .to_string();

    let roles = merge_roles(partials.iter().map(|p| &p.key_entities.roles), cfg.max_role_entries);
    let parties = roles.parties(cfg.max_parties);
    let amounts = merge_amounts(partials.iter().flat_map(|p| &p.amounts), cfg.max_amounts);
    let kpis = merge_kpis(partials.iter().flat_map(|p| &p.kpis), cfg.max_kpis_merged);
    let dates = union_capped(partials.iter().flat_map(|p| &p.dates), cfg.max_dates);

    let (positive, negative) = partials
        .iter()
        .fold((0, 0), |(p, q), a| (p + a.tone.positive, q + a.tone.negative));
    let tone = Tone::from_counts(positive, negative);

    let anomaly_flags: BTreeSet<String> = partials
        .iter()
        .flat_map(|p| p.financial_health.anomaly_flags.iter().cloned())
        .collect();
    let metrics = effective_metrics(&kpis, &tone);
    let financial_health = FinancialHealth {
        profitability_score: mean_score(partials.iter().map(|p| p.financial_health.profitability_score)),
        liquidity_score: mean_score(partials.iter().map(|p| p.financial_health.liquidity_score)),
        concentration_risk_score: partials
            .iter()
            .map(|p| p.financial_health.concentration_risk_score)
            .max()
            .unwrap_or(0),
        rationale: format!(
            "Across {n} sections: {}",
            compose_rationale(&metrics, parties.len(), &anomaly_flags)
        ),
        anomaly_flags,
    };

    let confidence = if n == 0 {
        0.0
    } else {
        round_to(partials.iter().map(|p| p.confidence).sum::<f64>() / n as f64, 2)
    };

    let mut merged = Analysis {
        detected_language,
        doc_type,
        summary: String::new(),
        insights: union_capped(partials.iter().flat_map(|p| &p.insights), cfg.max_insights),
        key_entities: KeyEntities {
            currencies: currencies_of(&amounts),
            parties,
            roles,
        },
        dates,
        amounts,
        kpis,
        tone,
        trend_interpretation: Vec::new(),
        financial_health,
        risk_matrix: merge_risks(partials.iter().flat_map(|p| &p.risk_matrix), cfg.max_risks),
        actions: merge_actions(partials.iter().flat_map(|p| &p.actions), cfg.max_actions),
        charts: Default::default(),
        confidence,
    };
    synthesize(&mut merged, language_out.unwrap_or(detected_language));
    merged
}
