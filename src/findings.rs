// src/findings.rs

//! Rule tables turning health flags and keyword hits into risks, actions
//! and short narrative bullets.

use crate::heuristics::Lexicon;
use crate::heuristics::text::format_number;
use crate::model::{
    ActionEntry, EntityRoles, FinancialHealth, KpiEntry, KpiLabel, Language, RiskEntry, Severity,
    kpi_value,
};
use crate::scoring::{FLAG_COMPLIANCE, FLAG_COST_PRESSURE, FLAG_ELEVATED_DSO, FLAG_NEGATIVE_GROWTH};

pub const RISK_RECEIVABLES: &str = "Receivables collection delay";
pub const RISK_COST: &str = "Cost inflation";
pub const RISK_COMPLIANCE: &str = "Compliance/credit issues";
pub const RISK_CONCENTRATION: &str = "Counterparty concentration";
pub const RISK_CONTRACTION: &str = "Revenue contraction";

pub const ACTION_CASH_FORECAST: &str = "Build a 13-week cash flow forecast";
pub const ACTION_COLLECTIONS: &str = "Run a collections sprint on overdue receivables";
pub const ACTION_PRICING: &str = "Review pricing and supplier contracts to offset cost increases";
pub const ACTION_DIVERSIFY: &str = "Draft a customer and supplier diversification plan";

const DSO_SEVERE_DAYS: f64 = 75.0;
const CONCENTRATION_ALERT: u8 = 4;

/// Everything the rule tables look at.
pub struct FindingsContext<'a> {
    pub lexicon: &'a Lexicon,
    pub sentences: &'a [String],
    pub kpis: &'a [KpiEntry],
    pub health: &'a FinancialHealth,
    pub roles: &'a EntityRoles,
    pub parties: &'a [String],
}

impl FindingsContext<'_> {
    fn flagged(&self, flag: &str) -> bool {
        self.health.anomaly_flags.contains(flag)
    }

    fn first_sentence(&self, pred: impl Fn(&str) -> bool) -> Option<String> {
        self.sentences.iter().find(|s| pred(s.as_str())).cloned()
    }
}

pub fn build_risks(ctx: &FindingsContext<'_>, cap: usize) -> Vec<RiskEntry> {
    let lex = ctx.lexicon;
    let mut risks = Vec::new();

    if ctx.flagged(FLAG_ELEVATED_DSO) {
        let severe = kpi_value(ctx.kpis, KpiLabel::Dso).is_some_and(|d| d > DSO_SEVERE_DAYS);
        risks.push(RiskEntry {
            risk: RISK_RECEIVABLES.to_string(),
            severity: if severe { Severity::High } else { Severity::Medium },
            evidence: ctx.first_sentence(|s| lex.mentions_dso(s)),
            mitigation: "Tighten credit terms and chase aged receivables weekly.".to_string(),
        });
    }
    if ctx.flagged(FLAG_COST_PRESSURE) {
        risks.push(RiskEntry {
            risk: RISK_COST.to_string(),
            severity: Severity::Medium,
            evidence: ctx.first_sentence(|s| lex.mentions_cost_pressure(s)),
            mitigation: "Renegotiate supplier pricing and pass through cost increases where contracts allow."
                .to_string(),
        });
    }
    if ctx.flagged(FLAG_COMPLIANCE) {
        risks.push(RiskEntry {
            risk: RISK_COMPLIANCE.to_string(),
            severity: Severity::High,
            evidence: ctx.first_sentence(|s| lex.mentions_compliance(s)),
            mitigation: "Escalate overdue items, agree payment plans and document covenant compliance."
                .to_string(),
        });
    }
    let concentration = ctx.health.concentration_risk_score;
    if concentration >= CONCENTRATION_ALERT {
        let evidence = ctx.parties.first().and_then(|party| {
            ctx.first_sentence(|s| s.to_lowercase().contains(&party.to_lowercase()))
        });
        risks.push(RiskEntry {
            risk: RISK_CONCENTRATION.to_string(),
            severity: if concentration >= 5 { Severity::High } else { Severity::Medium },
            evidence,
            mitigation: "Broaden the customer and supplier base to cap single-party exposure.".to_string(),
        });
    }
    // the flag alone may rest on an assumed growth figure
    let stated_decline = kpi_value(ctx.kpis, KpiLabel::RevenueGrowth).is_some_and(|g| g < 0.0);
    if ctx.flagged(FLAG_NEGATIVE_GROWTH) && stated_decline {
        risks.push(RiskEntry {
            risk: RISK_CONTRACTION.to_string(),
            severity: Severity::High,
            evidence: ctx.first_sentence(|s| lex.mentions_growth(s)),
            mitigation: "Review the pipeline and pricing to stabilise the top line.".to_string(),
        });
    }

    risks.truncate(cap);
    risks
}

fn action(priority: u32, text: &str, owner: &str, due_days: u32) -> ActionEntry {
    ActionEntry {
        priority,
        action: text.to_string(),
        owner: Some(owner.to_string()),
        due_days: Some(due_days),
    }
}

/// Baseline forecast first, then one action per triggered rule.
pub fn build_actions(health: &FinancialHealth, cap: usize) -> Vec<ActionEntry> {
    let flagged = |f: &str| health.anomaly_flags.contains(f);
    let mut rules: Vec<(&str, &str, u32)> = vec![(ACTION_CASH_FORECAST, "Finance", 7)];
    if flagged(FLAG_ELEVATED_DSO) || flagged(FLAG_COMPLIANCE) {
        rules.push((ACTION_COLLECTIONS, "Credit Control", 14));
    }
    if flagged(FLAG_COST_PRESSURE) {
        rules.push((ACTION_PRICING, "Procurement", 30));
    }
    if health.concentration_risk_score >= CONCENTRATION_ALERT {
        rules.push((ACTION_DIVERSIFY, "Commercial", 60));
    }

    let mut out: Vec<ActionEntry> = Vec::new();
    for (text, owner, due) in rules {
        if out.len() >= cap {
            break;
        }
        if out.iter().any(|a| a.action == text) {
            continue;
        }
        out.push(action(out.len() as u32 + 1, text, owner, due));
    }
    out
}

fn growth_bullet(g: f64, lang: Language) -> String {
    let v = format_number(g.abs());
    match (lang, g < 0.0) {
        (Language::Eng, false) => format!("Revenue grew {v}%."),
        (Language::Eng, true) => format!("Revenue declined {v}%."),
        (Language::Ara, false) => format!("نمت الإيرادات بنسبة {v}%."),
        (Language::Ara, true) => format!("انخفضت الإيرادات بنسبة {v}%."),
    }
}

/// Templated bullets from values actually found; never from defaults.
pub fn build_insights(kpis: &[KpiEntry], roles: &EntityRoles, lang: Language, cap: usize) -> Vec<String> {
    let ara = lang == Language::Ara;
    let mut out = Vec::new();

    if let Some(g) = kpi_value(kpis, KpiLabel::RevenueGrowth) {
        out.push(growth_bullet(g, lang));
    }
    if let Some(m) = kpi_value(kpis, KpiLabel::Margin) {
        let v = format_number(m);
        out.push(if ara {
            format!("هامش الربح {v}%.")
        } else {
            format!("Margin stands at {v}%.")
        });
    }
    if let Some(l) = kpi_value(kpis, KpiLabel::LiquidityRatio) {
        let v = format_number(l);
        out.push(if ara {
            format!("نسبة السيولة {v}x.")
        } else {
            format!("Liquidity ratio of {v}x.")
        });
    }
    if let Some(d) = kpi_value(kpis, KpiLabel::Dso) {
        let v = format_number(d);
        out.push(if ara {
            format!("متوسط فترة التحصيل {v} يوماً.")
        } else {
            format!("Receivables take about {v} days to collect.")
        });
    }
    if let Some(client) = roles.client.first() {
        out.push(if ara {
            format!("العميل الرئيسي: {client}.")
        } else {
            format!("Key client: {client}.")
        });
    }
    if let Some(supplier) = roles.supplier.first() {
        out.push(if ara {
            format!("المورد الرئيسي: {supplier}.")
        } else {
            format!("Key supplier: {supplier}.")
        });
    }

    if out.is_empty() {
        out.push(if ara {
            "لم يتم العثور على مؤشرات مالية كافية؛ يُرجى مراجعة المستند.".to_string()
        } else {
            "Limited quantitative signal found; review the source document for key figures.".to_string()
        });
    }
    out.truncate(cap);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::collections::BTreeSet;

    fn health(flags: &[&str], concentration: u8) -> FinancialHealth {
        FinancialHealth {
            concentration_risk_score: concentration,
            anomaly_flags: flags.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>(),
            ..Default::default()
        }
    }

    #[test]
    fn test_risks_follow_flags() {
        let lex = Lexicon::new(&EngineConfig::default()).unwrap();
        let sentences = vec![
            "Sales were flat.".to_string(),
            "DSO climbed to 80 days.".to_string(),
            "Two invoices are overdue.".to_string(),
        ];
        let kpis = vec![KpiEntry::new(KpiLabel::Dso, 80.0, "d")];
        let h = health(&[FLAG_ELEVATED_DSO, FLAG_COMPLIANCE], 2);
        let roles = EntityRoles::default();
        let ctx = FindingsContext {
            lexicon: &lex,
            sentences: &sentences,
            kpis: &kpis,
            health: &h,
            roles: &roles,
            parties: &[],
        };
        let risks = build_risks(&ctx, 12);
        assert_eq!(risks.len(), 2);
        assert_eq!(risks[0].risk, RISK_RECEIVABLES);
        assert_eq!(risks[0].severity, Severity::High);
        assert_eq!(risks[0].evidence.as_deref(), Some("DSO climbed to 80 days."));
        assert_eq!(risks[1].risk, RISK_COMPLIANCE);
        assert_eq!(risks[1].evidence.as_deref(), Some("Two invoices are overdue."));
    }

    #[test]
    fn test_contraction_needs_stated_decline() {
        let lex = Lexicon::new(&EngineConfig::default()).unwrap();
        let sentences = vec!["Revenue fell 4% on the year.".to_string()];
        let roles = EntityRoles::default();
        let h = health(&[FLAG_NEGATIVE_GROWTH], 1);
        let assumed = FindingsContext {
            lexicon: &lex,
            sentences: &sentences,
            kpis: &[],
            health: &h,
            roles: &roles,
            parties: &[],
        };
        assert!(build_risks(&assumed, 12).is_empty());

        let kpis = vec![KpiEntry::new(KpiLabel::RevenueGrowth, -4.0, "%")];
        let stated = FindingsContext { kpis: &kpis, ..assumed };
        let risks = build_risks(&stated, 12);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].risk, RISK_CONTRACTION);
        assert_eq!(risks[0].evidence.as_deref(), Some("Revenue fell 4% on the year."));
    }

    #[test]
    fn test_concentration_risk_severity() {
        let lex = Lexicon::new(&EngineConfig::default()).unwrap();
        let sentences = vec!["Client: Acme Corp.".to_string()];
        let parties = vec!["Acme Corp".to_string()];
        let roles = EntityRoles::default();
        let h = health(&[], 5);
        let ctx = FindingsContext {
            lexicon: &lex,
            sentences: &sentences,
            kpis: &[],
            health: &h,
            roles: &roles,
            parties: &parties,
        };
        let risks = build_risks(&ctx, 12);
        assert_eq!(risks[0].risk, RISK_CONCENTRATION);
        assert_eq!(risks[0].severity, Severity::High);
        assert_eq!(risks[0].evidence.as_deref(), Some("Client: Acme Corp."));
    }

    #[test]
    fn test_actions_baseline_and_rules() {
        let quiet = build_actions(&health(&[], 1), 12);
        assert_eq!(quiet.len(), 1);
        assert_eq!(quiet[0].action, ACTION_CASH_FORECAST);
        assert_eq!(quiet[0].priority, 1);
        assert_eq!(quiet[0].owner.as_deref(), Some("Finance"));
        assert_eq!(quiet[0].due_days, Some(7));

        let busy = build_actions(
            &health(&[FLAG_ELEVATED_DSO, FLAG_COMPLIANCE, FLAG_COST_PRESSURE], 4),
            12,
        );
        let texts: Vec<&str> = busy.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(
            texts,
            vec![ACTION_CASH_FORECAST, ACTION_COLLECTIONS, ACTION_PRICING, ACTION_DIVERSIFY]
        );
        assert_eq!(busy.iter().map(|a| a.priority).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(build_actions(&health(&[FLAG_COST_PRESSURE], 5), 2).len(), 2);
    }

    #[test]
    fn test_insights_and_fallback() {
        let kpis = vec![
            KpiEntry::new(KpiLabel::RevenueGrowth, -3.5, "%"),
            KpiEntry::new(KpiLabel::Margin, 18.0, "%"),
        ];
        let roles = EntityRoles {
            client: vec!["Acme Corp".to_string()],
            ..Default::default()
        };
        let bullets = build_insights(&kpis, &roles, Language::Eng, 6);
        assert_eq!(
            bullets,
            vec!["Revenue declined 3.5%.", "Margin stands at 18%.", "Key client: Acme Corp."]
        );

        let empty = build_insights(&[], &EntityRoles::default(), Language::Eng, 6);
        assert_eq!(empty.len(), 1);
        let ara = build_insights(&kpis, &roles, Language::Ara, 1);
        assert_eq!(ara, vec!["انخفضت الإيرادات بنسبة 3.5%."]);
    }
}
