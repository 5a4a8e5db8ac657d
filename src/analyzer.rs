// src/analyzer.rs

//! One pass of the extraction/scoring pipeline over a block of text.

use crate::config::EngineConfig;
use crate::findings::{FindingsContext, build_actions, build_insights, build_risks};
use crate::heuristics::kpi::round_to;
use crate::heuristics::text::truncate_chars;
use crate::heuristics::{
    Lexicon, derive_kpis, detect_language, extract_amounts, extract_dates, extract_entities,
    guess_doc_type, scan_signals, split_sentences,
};
use crate::model::{Amount, Analysis, KeyEntities, Language};
use crate::scoring::score_health;
use crate::synthesis::synthesize;

/// Caller hints carried into every pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassHints<'a> {
    pub doc_type: Option<&'a str>,
    pub language_out: Option<Language>,
}

/// Distinct currency codes in first-seen order.
pub fn currencies_of(amounts: &[Amount]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cur in amounts.iter().filter_map(|a| a.currency.as_ref()) {
        if !out.contains(cur) {
            out.push(cur.clone());
        }
    }
    out
}

/// Deterministic confidence from how much structure was found.
pub fn confidence(amounts: usize, kpis: usize, dates: usize, parties: usize, chars: usize) -> f64 {
    let score = 0.35
        + if amounts > 0 { 0.15 } else { 0.0 }
        + 0.05 * kpis.min(4) as f64
        + if dates > 0 { 0.05 } else { 0.0 }
        + if parties > 0 { 0.1 } else { 0.0 }
        + 0.1 * (chars as f64 / 2000.0).min(1.0);
    round_to(score.min(0.95), 2)
}

pub fn analyze_pass(lex: &Lexicon, cfg: &EngineConfig, text: &str, hints: PassHints<'_>) -> Analysis {
    let text = truncate_chars(text, cfg.pass_budget_chars);
    let chars = text.chars().count();

    let detected_language = detect_language(text);
    let doc_type = hints
        .doc_type
        .map(str::to_string)
        .unwrap_or_else(|| guess_doc_type(lex, text).to_string());
    let sentences = split_sentences(text);

    let amounts = extract_amounts(lex, text, cfg.max_amounts);
    let dates = extract_dates(lex, text, cfg.max_dates);
    let roles = extract_entities(lex, text, cfg.max_role_entries);
    let parties = roles.parties(cfg.max_parties);
    let kpis = derive_kpis(lex, text, &amounts, cfg.max_kpis);
    let signals = scan_signals(lex, text);
    let health = score_health(&kpis, parties.len(), &signals);

    let ctx = FindingsContext {
        lexicon: lex,
        sentences: &sentences,
        kpis: &kpis,
        health: &health,
        roles: &roles,
        parties: &parties,
    };
    let risk_matrix = build_risks(&ctx, cfg.max_risks);
    let actions = build_actions(&health, cfg.max_actions);
    let lang = hints.language_out.unwrap_or(detected_language);
    let insights = build_insights(&kpis, &roles, lang, cfg.max_insights);
    let score = confidence(amounts.len(), kpis.len(), dates.len(), parties.len(), chars);

    let mut analysis = Analysis {
        detected_language,
        doc_type,
        summary: String::new(),
        insights,
        key_entities: KeyEntities {
            currencies: currencies_of(&amounts),
            parties,
            roles,
        },
        confidence: score,
        dates,
        amounts,
        kpis,
        tone: signals.tone,
        trend_interpretation: Vec::new(),
        financial_health: health,
        risk_matrix,
        actions,
        charts: Default::default(),
    };
    synthesize(&mut analysis, lang);
    analysis
}
