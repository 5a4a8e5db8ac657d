// src/synthesis.rs

//! Chart series, executive summary and trend bullets. Always regenerated
//! from the final amounts/KPIs/health, never merged.

use std::collections::BTreeMap;

use crate::heuristics::kpi::round_to;
use crate::heuristics::text::format_number;
use crate::model::{
    Amount, Analysis, ChartBundle, FinancialHealth, KpiEntry, KpiLabel, LabeledValue, Language,
    LinePoint, kpi_value,
};
use crate::scoring::effective_metrics;

const MAX_BARS: usize = 6;
const LINE_POINTS: usize = 6;
const MAX_PIE: usize = 8;
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn by_magnitude(a: &f64, b: &f64) -> std::cmp::Ordering {
    b.abs().total_cmp(&a.abs())
}

pub fn bar_series(amounts: &[Amount]) -> Vec<LabeledValue> {
    let mut money: Vec<&Amount> = amounts.iter().filter(|a| a.is_money()).collect();
    money.sort_by(|a, b| by_magnitude(&a.value, &b.value));
    money
        .into_iter()
        .take(MAX_BARS)
        .map(|a| LabeledValue {
            label: match &a.currency {
                Some(cur) => format!("{} {cur}", a.label),
                None => a.label.to_string(),
            },
            value: a.value,
        })
        .collect()
}

/// Compounding series seeded from the largest bar; `growth / 5` percent per step.
pub fn line_series(bars: &[LabeledValue], growth: f64) -> Vec<LinePoint> {
    let Some(seed) = bars.iter().map(|b| b.value.abs()).max_by(f64::total_cmp) else {
        return Vec::new();
    };
    let factor = 1.0 + (growth / 5.0) / 100.0;
    (0..LINE_POINTS)
        .map(|i| LinePoint {
            x: MONTHS[i % MONTHS.len()].to_string(),
            y: round_to(seed * factor.powi(i as i32), 2),
        })
        .collect()
}

/// Sum of magnitudes per currency; a revenue/cost/profit split when there
/// is nothing to group.
pub fn pie_series(amounts: &[Amount], margin: f64) -> Vec<LabeledValue> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for a in amounts.iter().filter(|a| a.is_money()) {
        *groups.entry(a.currency.as_deref().unwrap_or("UNK")).or_default() += a.value.abs();
    }
    if groups.is_empty() {
        let m = margin.clamp(0.0, 100.0);
        return vec![
            LabeledValue { label: "Revenue".to_string(), value: 100.0 },
            LabeledValue { label: "Cost".to_string(), value: round_to(100.0 - m, 2) },
            LabeledValue { label: "Profit".to_string(), value: round_to(m, 2) },
        ];
    }
    let mut slices: Vec<LabeledValue> = groups
        .into_iter()
        .map(|(label, value)| LabeledValue {
            label: label.to_string(),
            value: round_to(value, 2),
        })
        .collect();
    slices.sort_by(|a, b| by_magnitude(&a.value, &b.value));
    slices.truncate(MAX_PIE);
    slices
}

pub fn build_charts(amounts: &[Amount], kpis: &[KpiEntry], margin: f64) -> ChartBundle {
    let bars = bar_series(amounts);
    let growth = kpi_value(kpis, KpiLabel::RevenueGrowth).unwrap_or(0.0);
    ChartBundle {
        lines: line_series(&bars, growth),
        pie: pie_series(amounts, margin),
        bars,
    }
}

pub fn build_summary(doc_type: &str, kpis: &[KpiEntry], health: &FinancialHealth, lang: Language) -> String {
    let ara = lang == Language::Ara;
    let mut parts = vec![if ara {
        format!("نوع المستند: {doc_type}.")
    } else {
        format!("Document type: {doc_type}.")
    }];
    if let Some(g) = kpi_value(kpis, KpiLabel::RevenueGrowth) {
        let g = format_number(g);
        parts.push(if ara { format!("نمو الإيرادات {g}%.") } else { format!("Revenue growth {g}%.") });
    }
    if let Some(m) = kpi_value(kpis, KpiLabel::Margin) {
        let m = format_number(m);
        parts.push(if ara { format!("هامش الربح {m}%.") } else { format!("Margin {m}%.") });
    }
    if let Some(l) = kpi_value(kpis, KpiLabel::LiquidityRatio) {
        let l = format_number(l);
        parts.push(if ara { format!("نسبة السيولة {l}x.") } else { format!("Liquidity ratio {l}x.") });
    }
    let (p, q, c) = (
        health.profitability_score,
        health.liquidity_score,
        health.concentration_risk_score,
    );
    parts.push(if ara {
        format!("مؤشرات الصحة المالية: الربحية {p}/5، السيولة {q}/5، مخاطر التركز {c}/5.")
    } else {
        format!("Health scores: profitability {p}/5, liquidity {q}/5, concentration risk {c}/5.")
    });
    parts.join(" ")
}

pub fn build_trend(kpis: &[KpiEntry], charts: &ChartBundle, lang: Language) -> Vec<String> {
    let ara = lang == Language::Ara;
    let mut out = Vec::new();

    out.push(match kpi_value(kpis, KpiLabel::RevenueGrowth) {
        Some(g) if g > 0.0 => {
            let v = format_number(g);
            if ara { format!("اتجاه صاعد للإيرادات (+{v}%).") } else { format!("Upward revenue trend (+{v}%).") }
        }
        Some(g) if g < 0.0 => {
            let v = format_number(g);
            if ara { format!("اتجاه هابط للإيرادات ({v}%).") } else { format!("Downward revenue trend ({v}%).") }
        }
        Some(_) => if ara { "الإيرادات مستقرة.".to_string() } else { "Flat revenue trend.".to_string() },
        None => if ara {
            "لا يوجد معدل نمو صريح في المستند.".to_string()
        } else {
            "No explicit growth rate in the document.".to_string()
        },
    });

    if let Some(m) = kpi_value(kpis, KpiLabel::Margin) {
        let v = format_number(m);
        let line = match (m, ara) {
            (m, false) if m >= 20.0 => format!("Healthy margin of {v}%."),
            (m, false) if m >= 10.0 => format!("Moderate margin of {v}%."),
            (_, false) => format!("Thin margin of {v}%."),
            (m, true) if m >= 20.0 => format!("هامش ربح صحي بنسبة {v}%."),
            (m, true) if m >= 10.0 => format!("هامش ربح معتدل بنسبة {v}%."),
            (_, true) => format!("هامش ربح ضعيف بنسبة {v}%."),
        };
        out.push(line);
    }

    if let Some(last) = charts.lines.last() {
        let v = format_number(last.y);
        let n = charts.lines.len();
        out.push(if ara {
            format!("تنتهي السلسلة المتوقعة عند {v} بعد {n} فترات.")
        } else {
            format!("Projected series ends at {v} after {n} periods.")
        });
    }
    out
}

/// Fill charts, summary and trend bullets from the analysis' own data.
pub fn synthesize(analysis: &mut Analysis, lang: Language) {
    let margin = effective_metrics(&analysis.kpis, &analysis.tone).margin.value;
    analysis.charts = build_charts(&analysis.amounts, &analysis.kpis, margin);
    analysis.summary = build_summary(&analysis.doc_type, &analysis.kpis, &analysis.financial_health, lang);
    analysis.trend_interpretation = build_trend(&analysis.kpis, &analysis.charts, lang);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AmountLabel;
    use pretty_assertions::assert_eq;

    fn amt(label: AmountLabel, value: f64, currency: Option<&str>) -> Amount {
        Amount {
            label,
            value,
            currency: currency.map(str::to_string),
        }
    }

    #[test]
    fn test_bars_top_by_magnitude() {
        let amounts: Vec<Amount> = (1..=8)
            .map(|i| amt(AmountLabel::Amount, i as f64 * 100.0, Some("USD")))
            .chain([amt(AmountLabel::Cost, -5_000.0, None)])
            .collect();
        let bars = bar_series(&amounts);
        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0], LabeledValue { label: "Cost".to_string(), value: -5_000.0 });
        assert_eq!(bars[1].label, "Amount USD");
        assert_eq!(bars[1].value, 800.0);
    }

    #[test]
    fn test_line_series_compounds() {
        let bars = vec![LabeledValue { label: "Revenue AED".to_string(), value: 1_000.0 }];
        let lines = line_series(&bars, 10.0);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], LinePoint { x: "Jan".to_string(), y: 1_000.0 });
        assert_eq!(lines[1].y, 1_020.0);
        assert_eq!(lines[5].x, "Jun");
        assert!(line_series(&[], 10.0).is_empty());
    }

    #[test]
    fn test_pie_grouping_and_fallback() {
        let amounts = vec![
            amt(AmountLabel::Revenue, 2_000.0, Some("AED")),
            amt(AmountLabel::Cost, -500.0, Some("AED")),
            amt(AmountLabel::Total, 4_000.0, Some("USD")),
            amt(AmountLabel::Tax, 75.0, None),
        ];
        let pie = pie_series(&amounts, 20.0);
        let labels: Vec<&str> = pie.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["USD", "AED", "UNK"]);
        assert_eq!(pie[1].value, 2_500.0);

        let fallback = pie_series(&[], 20.0);
        assert_eq!(
            fallback.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![100.0, 80.0, 20.0]
        );
    }

    #[test]
    fn test_summary_template() {
        let kpis = vec![
            KpiEntry::new(KpiLabel::RevenueGrowth, 15.0, "%"),
            KpiEntry::new(KpiLabel::Margin, 20.0, "%"),
        ];
        let health = FinancialHealth {
            profitability_score: 4,
            liquidity_score: 3,
            concentration_risk_score: 4,
            ..Default::default()
        };
        assert_eq!(
            build_summary("invoice", &kpis, &health, Language::Eng),
            "Document type: invoice. Revenue growth 15%. Margin 20%. \
             Health scores: profitability 4/5, liquidity 3/5, concentration risk 4/5."
        );
    }

    #[test]
    fn test_trend_bullets() {
        let kpis = vec![
            KpiEntry::new(KpiLabel::RevenueGrowth, -2.0, "%"),
            KpiEntry::new(KpiLabel::Margin, 8.0, "%"),
        ];
        let charts = ChartBundle::default();
        assert_eq!(
            build_trend(&kpis, &charts, Language::Eng),
            vec!["Downward revenue trend (-2%).", "Thin margin of 8%."]
        );
    }
}
