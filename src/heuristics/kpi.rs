use std::collections::HashSet;

use super::Lexicon;
use super::text::{char_after, char_before, span_gap};
use crate::model::{Amount, AmountLabel, KpiEntry, KpiLabel};

type Span = (usize, usize);

/// Farthest a percentage may sit from a growth keyword and still count.
const GROWTH_PROXIMITY: usize = 160;
/// Farthest a day count may sit from a DSO/receivables keyword.
const DSO_PROXIMITY: usize = 60;

fn captured_number(caps: &regex::Captures<'_>) -> Option<(f64, Span)> {
    let whole = caps.get(0)?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    Some((value, (whole.start(), whole.end())))
}

/// `grew 12%` / `fell 3%`, whichever phrase comes first in the text.
pub fn explicit_growth(lex: &Lexicon, text: &str) -> Option<f64> {
    let up = lex
        .growth_explicit
        .captures(text)
        .and_then(|c| captured_number(&c));
    let down = lex
        .decline_explicit
        .captures(text)
        .and_then(|c| captured_number(&c))
        .map(|(v, span)| (-v, span));

    match (up, down) {
        (Some(u), Some(d)) => Some(if u.1.0 <= d.1.0 { u.0 } else { d.0 }),
        (Some(u), None) => Some(u.0),
        (None, Some(d)) => Some(d.0),
        (None, None) => None,
    }
}

/// The candidate whose span is nearest any anchor span, within `limit`.
/// Ties keep the earlier candidate.
pub fn nearest_to_anchor(candidates: &[(f64, Span)], anchors: &[Span], limit: usize) -> Option<f64> {
    let mut best: Option<(usize, f64)> = None;
    for (value, span) in candidates {
        for anchor in anchors {
            let gap = span_gap(*span, *anchor);
            if gap <= limit && best.is_none_or(|(g, _)| gap < g) {
                best = Some((gap, *value));
            }
        }
    }
    best.map(|(_, v)| v)
}

fn percentages(lex: &Lexicon, text: &str, exclude: Option<Span>) -> Vec<(f64, Span)> {
    lex.percent
        .captures_iter(text)
        .filter_map(|c| captured_number(&c))
        .filter(|(_, span)| exclude.is_none_or(|ex| span_gap(*span, ex) > 0))
        .filter(|(_, span)| !char_before(text, span.0).is_some_and(char::is_alphabetic))
        .collect()
}

/// Explicit phrase wins; otherwise the percentage nearest a growth keyword.
pub fn find_growth(lex: &Lexicon, text: &str, margin_span: Option<Span>) -> Option<f64> {
    if let Some(v) = explicit_growth(lex, text) {
        return Some(v);
    }
    let anchors: Vec<Span> = lex
        .growth_keyword
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    nearest_to_anchor(&percentages(lex, text, margin_span), &anchors, GROWTH_PROXIMITY)
}

pub fn find_margin(lex: &Lexicon, text: &str) -> Option<(f64, Span)> {
    lex.margin_explicit
        .captures(text)
        .and_then(|c| captured_number(&c))
        .or_else(|| lex.margin_loose.captures(text).and_then(|c| captured_number(&c)))
}

pub fn find_liquidity(lex: &Lexicon, text: &str) -> Option<f64> {
    lex.liquidity_explicit
        .captures(text)
        .and_then(|c| captured_number(&c))
        .or_else(|| lex.liquidity_hint.captures(text).and_then(|c| captured_number(&c)))
        .map(|(v, _)| v)
}

fn is_standalone_number(text: &str, span: Span) -> bool {
    let glued = |c: Option<char>| matches!(c, Some(',' | '.'));
    let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    let before = char_before(text, span.0);
    if before.is_some_and(char::is_alphabetic) || (glued(before) && digit(char_before(text, span.0 - 1))) {
        return false;
    }
    let after = char_after(text, span.1);
    if matches!(after, Some('%' | '٪')) || (glued(after) && digit(char_after(text, span.1 + 1))) {
        return false;
    }
    true
}

fn is_money(currencies: &[Span], span: Span) -> bool {
    currencies.iter().any(|c| span_gap(*c, span) <= 1)
}

/// `30 days`, `60 يوم`.
fn has_day_unit(text: &str, span: Span) -> bool {
    let rest = text[span.1..].trim_start_matches([' ', '\t']);
    let unit_end = rest
        .find(|c: char| !c.is_alphabetic())
        .unwrap_or(rest.len());
    matches!(
        rest[..unit_end].to_lowercase().as_str(),
        "day" | "days" | "يوم" | "أيام" | "يوما" | "يومًا"
    )
}

/// Day count nearest a DSO/receivables keyword. Numbers next to a currency
/// are money, not days; a number carrying a day unit beats a bare one.
pub fn find_dso(lex: &Lexicon, text: &str) -> Option<f64> {
    let anchors: Vec<Span> = lex
        .dso_keyword
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    if anchors.is_empty() {
        return None;
    }
    let currencies: Vec<Span> = lex
        .currency_token
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();
    let candidates: Vec<(f64, Span)> = lex
        .small_number
        .captures_iter(text)
        .filter_map(|c| captured_number(&c))
        .filter(|(v, span)| {
            (1.0..=365.0).contains(v) && is_standalone_number(text, *span) && !is_money(&currencies, *span)
        })
        .collect();
    let with_unit: Vec<(f64, Span)> = candidates
        .iter()
        .copied()
        .filter(|(_, span)| has_day_unit(text, *span))
        .collect();
    nearest_to_anchor(&with_unit, &anchors, DSO_PROXIMITY)
        .or_else(|| nearest_to_anchor(&candidates, &anchors, DSO_PROXIMITY))
}

fn largest(amounts: &[Amount], label: AmountLabel) -> Option<&Amount> {
    amounts
        .iter()
        .filter(|a| a.label == label)
        .max_by(|a, b| a.value.abs().total_cmp(&b.value.abs()))
}

fn money_unit(amount: Option<&Amount>) -> String {
    amount
        .and_then(|a| a.currency.clone())
        .unwrap_or_else(|| "UNK".to_string())
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (value * f).round() / f
}

/// Drop later entries whose label (case-insensitive) was already seen.
pub fn dedupe_kpis(kpis: Vec<KpiEntry>, cap: usize) -> Vec<KpiEntry> {
    let mut seen = HashSet::new();
    kpis.into_iter()
        .filter(|k| seen.insert(k.label.as_str().to_lowercase()))
        .take(cap)
        .collect()
}

/// Direct phrase matches first, then backfill from amounts.
pub fn derive_kpis(lex: &Lexicon, text: &str, amounts: &[Amount], cap: usize) -> Vec<KpiEntry> {
    let mut kpis = Vec::new();

    let margin = find_margin(lex, text);
    if let Some(g) = find_growth(lex, text, margin.map(|(_, span)| span)) {
        kpis.push(KpiEntry::new(KpiLabel::RevenueGrowth, g, "%"));
    }
    if let Some((m, _)) = margin {
        kpis.push(KpiEntry::new(KpiLabel::Margin, m, "%"));
    }
    if let Some(l) = find_liquidity(lex, text) {
        kpis.push(KpiEntry::new(KpiLabel::LiquidityRatio, l, "x"));
    }
    if let Some(d) = find_dso(lex, text) {
        kpis.push(KpiEntry::new(KpiLabel::Dso, d, "d"));
    }

    let totals: Vec<&Amount> = amounts
        .iter()
        .filter(|a| a.label == AmountLabel::Total)
        .collect();
    if !totals.is_empty() {
        let sum: f64 = totals.iter().map(|a| a.value).sum();
        let unit = money_unit(totals.iter().copied().find(|a| a.currency.is_some()));
        kpis.push(KpiEntry::new(KpiLabel::Total, round_to(sum, 2), unit));
    }

    let revenue = largest(amounts, AmountLabel::Revenue);
    let cost = largest(amounts, AmountLabel::Cost);
    let profit = largest(amounts, AmountLabel::Profit);
    if let Some(r) = revenue {
        kpis.push(KpiEntry::new(KpiLabel::Revenue, r.value, money_unit(Some(r))));
    }
    if let Some(c) = cost {
        kpis.push(KpiEntry::new(KpiLabel::Cost, c.value, money_unit(Some(c))));
    }
    if margin.is_none() {
        if let (Some(p), Some(r)) = (profit, revenue) {
            if r.value != 0.0 {
                kpis.push(KpiEntry::new(
                    KpiLabel::Margin,
                    round_to(p.value / r.value * 100.0, 1),
                    "%",
                ));
            }
        }
    }

    kpis.sort_by_key(|k| k.label);
    dedupe_kpis(kpis, cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::kpi_value;

    fn lex() -> Lexicon {
        Lexicon::new(&EngineConfig::default()).unwrap()
    }

    fn amt(label: AmountLabel, value: f64, currency: Option<&str>) -> Amount {
        Amount {
            label,
            value,
            currency: currency.map(str::to_string),
        }
    }

    #[test]
    fn test_explicit_growth_and_margin() {
        let text = "Revenue grew 15% to AED 2,500,000 with a 20% margin.";
        let kpis = derive_kpis(&lex(), text, &[], 16);
        assert_eq!(kpi_value(&kpis, KpiLabel::RevenueGrowth), Some(15.0));
        assert_eq!(kpi_value(&kpis, KpiLabel::Margin), Some(20.0));
    }

    #[test]
    fn test_explicit_phrase_beats_proximity() {
        // 4% sits right next to "growth", but the explicit phrase wins
        let text = "Growth 4% in units. Sales increased by 9% overall.";
        assert_eq!(find_growth(&lex(), text, None), Some(9.0));
    }

    #[test]
    fn test_decline_is_negative_growth() {
        assert_eq!(explicit_growth(&lex(), "Revenue fell 7.5% year on year"), Some(-7.5));
    }

    #[test]
    fn test_growth_proximity_fallback() {
        let text = "VAT is 5% on all lines this quarter. Year-on-year growth was 11 %.";
        assert_eq!(find_growth(&lex(), text, None), Some(11.0));
    }

    #[test]
    fn test_margin_loose_and_liquidity() {
        let lex = lex();
        assert_eq!(find_margin(&lex, "Gross margin came in at 18.5%").map(|m| m.0), Some(18.5));
        assert_eq!(find_liquidity(&lex, "The current ratio of 1.6x is adequate"), Some(1.6));
        assert_eq!(find_liquidity(&lex, "liquidity cover stands at 2.1x"), Some(2.1));
        assert_eq!(find_liquidity(&lex, "no ratios here"), None);
    }

    #[test]
    fn test_dso_nearest_keyword() {
        let lex = lex();
        assert_eq!(find_dso(&lex, "In Q3 DSO rose to 62 days from 48."), Some(62.0));
        assert_eq!(find_dso(&lex, "Receivables of AED 2,500,000 outstanding"), None);
        assert_eq!(find_dso(&lex, "We hired 40 people"), None);
    }

    #[test]
    fn test_dso_skips_money_and_prefers_day_unit() {
        let lex = lex();
        assert_eq!(find_dso(&lex, "Receivables of USD 120 are 30 days overdue."), Some(30.0));
        assert_eq!(find_dso(&lex, "Receivables: $250 and 90 EUR still open"), None);
        assert_eq!(find_dso(&lex, "Receivables 12 accounts, aged 75 days on average"), Some(75.0));
        assert_eq!(find_dso(&lex, "DSO 41"), Some(41.0));
    }

    #[test]
    fn test_backfill_from_amounts() {
        let amounts = vec![
            amt(AmountLabel::Revenue, 1_000.0, Some("USD")),
            amt(AmountLabel::Revenue, 4_000.0, Some("USD")),
            amt(AmountLabel::Profit, 600.0, Some("USD")),
            amt(AmountLabel::Cost, 3_400.0, None),
            amt(AmountLabel::Total, 100.0, Some("AED")),
            amt(AmountLabel::Total, 250.0, None),
        ];
        let kpis = derive_kpis(&lex(), "summary", &amounts, 16);
        assert_eq!(
            kpis.iter().map(|k| k.label).collect::<Vec<_>>(),
            vec![KpiLabel::Margin, KpiLabel::Total, KpiLabel::Revenue, KpiLabel::Cost]
        );
        assert_eq!(kpi_value(&kpis, KpiLabel::Margin), Some(15.0));
        assert_eq!(kpi_value(&kpis, KpiLabel::Total), Some(350.0));
        assert_eq!(kpis[1].unit, "AED");
        assert_eq!(kpi_value(&kpis, KpiLabel::Revenue), Some(4_000.0));
        assert_eq!(kpis[3].unit, "UNK");
    }

    #[test]
    fn test_stated_margin_not_overwritten() {
        let amounts = vec![
            amt(AmountLabel::Revenue, 1_000.0, None),
            amt(AmountLabel::Profit, 500.0, None),
        ];
        let kpis = derive_kpis(&lex(), "Net margin of 12%", &amounts, 16);
        assert_eq!(kpi_value(&kpis, KpiLabel::Margin), Some(12.0));
    }

    #[test]
    fn test_dedupe_first_wins() {
        let kpis = dedupe_kpis(
            vec![
                KpiEntry::new(KpiLabel::Margin, 10.0, "%"),
                KpiEntry::new(KpiLabel::Margin, 30.0, "%"),
                KpiEntry::new(KpiLabel::Dso, 40.0, "d"),
            ],
            16,
        );
        assert_eq!(kpis.len(), 2);
        assert_eq!(kpis[0].value, 10.0);
    }
}
