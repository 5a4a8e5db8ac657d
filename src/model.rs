// src/model.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Script-level language of a document, also used for narrative output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Eng,
    Ara,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Eng => "eng",
            Language::Ara => "ara",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "eng" | "en" | "english" => Some(Language::Eng),
            "ara" | "ar" | "arabic" => Some(Language::Ara),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller hands the engine: already-extracted text plus hints.
#[derive(Debug, Clone, Default)]
pub struct DocumentInput {
    pub text: String,
    /// Declared document type; `auto` or empty means "guess".
    pub doc_type_hint: Option<String>,
    /// Language for narrative fields only. Extraction ignores it.
    pub language_out: Option<Language>,
}

impl DocumentInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_doc_type(mut self, hint: &str) -> Self {
        self.doc_type_hint = Some(hint.to_string());
        self
    }

    pub fn with_language_out(mut self, lang: Language) -> Self {
        self.language_out = Some(lang);
        self
    }

    /// The hint, if it actually declares something.
    pub fn declared_doc_type(&self) -> Option<&str> {
        self.doc_type_hint
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.eq_ignore_ascii_case("auto"))
    }
}

/// Label inferred for a monetary amount from its surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AmountLabel {
    Total,
    Revenue,
    Cost,
    Profit,
    Tax,
    Payment,
    Balance,
    Amount,
}

impl AmountLabel {
    pub const ALL: [AmountLabel; 8] = [
        AmountLabel::Total,
        AmountLabel::Revenue,
        AmountLabel::Cost,
        AmountLabel::Profit,
        AmountLabel::Tax,
        AmountLabel::Payment,
        AmountLabel::Balance,
        AmountLabel::Amount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AmountLabel::Total => "Total",
            AmountLabel::Revenue => "Revenue",
            AmountLabel::Cost => "Cost",
            AmountLabel::Profit => "Profit",
            AmountLabel::Tax => "Tax",
            AmountLabel::Payment => "Payment",
            AmountLabel::Balance => "Balance",
            AmountLabel::Amount => "Amount",
        }
    }
}

impl fmt::Display for AmountLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monetary value parsed out of the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub label: AmountLabel,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Amount {
    /// Money-only filter used by charts.
    pub fn is_money(&self) -> bool {
        self.currency.is_some() || self.value.abs() >= 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KpiLabel {
    #[serde(rename = "Revenue Growth %")]
    RevenueGrowth,
    #[serde(rename = "Margin %")]
    Margin,
    #[serde(rename = "Liquidity Ratio")]
    LiquidityRatio,
    #[serde(rename = "DSO (days)")]
    Dso,
    Total,
    Revenue,
    Cost,
}

impl KpiLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KpiLabel::RevenueGrowth => "Revenue Growth %",
            KpiLabel::Margin => "Margin %",
            KpiLabel::LiquidityRatio => "Liquidity Ratio",
            KpiLabel::Dso => "DSO (days)",
            KpiLabel::Total => "Total",
            KpiLabel::Revenue => "Revenue",
            KpiLabel::Cost => "Cost",
        }
    }

    /// Fixed unit for ratio-like KPIs; `None` for currency-valued ones.
    pub fn fixed_unit(&self) -> Option<&'static str> {
        match self {
            KpiLabel::RevenueGrowth | KpiLabel::Margin => Some("%"),
            KpiLabel::LiquidityRatio => Some("x"),
            KpiLabel::Dso => Some("d"),
            KpiLabel::Total | KpiLabel::Revenue | KpiLabel::Cost => None,
        }
    }
}

impl fmt::Display for KpiLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiEntry {
    pub label: KpiLabel,
    pub value: f64,
    pub unit: String,
}

impl KpiEntry {
    pub fn new(label: KpiLabel, value: f64, unit: impl Into<String>) -> Self {
        Self {
            label,
            value,
            unit: unit.into(),
        }
    }
}

/// Look up a KPI value by label.
pub fn kpi_value(kpis: &[KpiEntry], label: KpiLabel) -> Option<f64> {
    kpis.iter().find(|k| k.label == label).map(|k| k.value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Supplier,
    Bank,
    Investor,
    Regulator,
    Other,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Client,
        Role::Supplier,
        Role::Bank,
        Role::Investor,
        Role::Regulator,
        Role::Other,
    ];
}

/// Names matched per counterparty role, each list deduplicated and capped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRoles {
    pub client: Vec<String>,
    pub supplier: Vec<String>,
    pub bank: Vec<String>,
    pub investor: Vec<String>,
    pub regulator: Vec<String>,
    pub other: Vec<String>,
}

impl EntityRoles {
    pub fn get(&self, role: Role) -> &[String] {
        match role {
            Role::Client => &self.client,
            Role::Supplier => &self.supplier,
            Role::Bank => &self.bank,
            Role::Investor => &self.investor,
            Role::Regulator => &self.regulator,
            Role::Other => &self.other,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut Vec<String> {
        match role {
            Role::Client => &mut self.client,
            Role::Supplier => &mut self.supplier,
            Role::Bank => &mut self.bank,
            Role::Investor => &mut self.investor,
            Role::Regulator => &mut self.regulator,
            Role::Other => &mut self.other,
        }
    }

    /// True if `name` is already listed under any role (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        Role::ALL
            .iter()
            .any(|r| self.get(*r).iter().any(|n| n.eq_ignore_ascii_case(name)))
    }

    /// Append `name` to `role` unless present or the role is full.
    pub fn push_capped(&mut self, role: Role, name: &str, cap: usize) {
        let list = self.get_mut(role);
        if list.len() < cap && !list.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            list.push(name.to_string());
        }
    }

    /// Client + supplier + other, deduplicated, capped.
    pub fn parties(&self, cap: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.client.iter().chain(&self.supplier).chain(&self.other) {
            if out.len() >= cap {
                break;
            }
            if !out.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                out.push(name.clone());
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyEntities {
    pub parties: Vec<String>,
    pub roles: EntityRoles,
    pub currencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneLabel {
    Positive,
    Negative,
    #[default]
    Mixed,
}

/// Sentiment word counts. Kept raw so chunk results can be summed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tone {
    pub positive: u32,
    pub negative: u32,
    pub net: i64,
    pub label: ToneLabel,
}

impl Tone {
    pub fn from_counts(positive: u32, negative: u32) -> Self {
        let net = positive as i64 - negative as i64;
        let label = if net > 1 {
            ToneLabel::Positive
        } else if net < -1 {
            ToneLabel::Negative
        } else {
            ToneLabel::Mixed
        };
        Self {
            positive,
            negative,
            net,
            label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialHealth {
    pub profitability_score: u8,
    pub liquidity_score: u8,
    pub concentration_risk_score: u8,
    pub anomaly_flags: BTreeSet<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub risk: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEntry {
    pub priority: u32,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub x: String,
    pub y: f64,
}

/// Chart-ready series. Money only: ratios and day counts never land here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartBundle {
    pub bars: Vec<LabeledValue>,
    pub lines: Vec<LinePoint>,
    pub pie: Vec<LabeledValue>,
}

/// The engine's sole output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub detected_language: Language,
    pub doc_type: String,
    pub summary: String,
    pub insights: Vec<String>,
    pub key_entities: KeyEntities,
    pub dates: Vec<String>,
    pub amounts: Vec<Amount>,
    pub kpis: Vec<KpiEntry>,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub trend_interpretation: Vec<String>,
    pub financial_health: FinancialHealth,
    pub risk_matrix: Vec<RiskEntry>,
    pub actions: Vec<ActionEntry>,
    pub charts: ChartBundle,
    pub confidence: f64,
}
