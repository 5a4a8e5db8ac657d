// src/heuristics/mod.rs

//! Lexical extractors: keyword-anchored regex patterns and local-window
//! classifiers over raw document text.
//!
//! All patterns are compiled once into a [`Lexicon`] and shared read-only by
//! every pass, including parallel chunk passes.

pub mod amounts;
pub mod dates;
pub mod entities;
pub mod kpi;
pub mod signals;
pub mod text;

use regex::Regex;
use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{AmountLabel, Role};

pub use amounts::{classify_amount, extract_amounts};
pub use dates::extract_dates;
pub use entities::extract_entities;
pub use kpi::derive_kpis;
pub use signals::{Signals, scan_signals};
pub use text::{detect_language, guess_doc_type, split_sentences};

/// Compiled pattern tables for one engine configuration.
pub struct Lexicon {
    doc_types: Vec<(&'static str, Regex)>,

    amount: Regex,
    finance_context: Regex,
    time_context: Regex,
    amount_labels: Vec<(AmountLabel, Regex)>,

    roles: Vec<(Role, Regex)>,
    caps_phrase: Regex,
    stop_words: HashSet<String>,

    dates: Vec<Regex>,

    positive: Regex,
    negative: Regex,
    cost_pressure: Regex,
    compliance: Regex,

    growth_explicit: Regex,
    decline_explicit: Regex,
    growth_keyword: Regex,
    percent: Regex,
    margin_explicit: Regex,
    margin_loose: Regex,
    liquidity_explicit: Regex,
    liquidity_hint: Regex,
    dso_keyword: Regex,
    small_number: Regex,

    currency_token: Regex,
}

// Name phrase: capitalized (or Arabic) words, optionally joined by & / and / of.
const NAME: &str = r"([A-Z\p{Arabic}][\p{L}\p{N}&'\-]*(?:[ \t]+(?:&|and|of|[A-Z\p{Arabic}][\p{L}\p{N}&'\-]*))*)";

const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

fn role_pattern(english: &str, arabic: &str) -> String {
    format!(r"(?:(?i:\b(?:{english})\b)|{arabic})[ \t]*[:\-–]?\s*(?:is[ \t]+|was[ \t]+)?{NAME}")
}

impl Lexicon {
    pub fn new(cfg: &EngineConfig) -> Result<Self> {
        let doc_types = vec![
            (
                "invoice",
                Regex::new(r"(?i)\b(?:tax invoice|invoice(?:\s+(?:no|number|#))?|bill to)\b|فاتورة")?,
            ),
            (
                "receipt",
                Regex::new(r"(?i)\b(?:receipt|received with thanks|paid in full)\b|إيصال|سند قبض")?,
            ),
            (
                "purchase_order",
                Regex::new(r"(?i)\b(?:purchase order|p\.?o\.?\s*(?:no|number|#))\b|أمر شراء")?,
            ),
            (
                "financials",
                Regex::new(
                    r"(?i)\b(?:balance sheet|income statement|cash flow statement|profit and loss|statement of financial position|p&l|ebitda)\b|الميزانية|قائمة الدخل",
                )?,
            ),
            (
                "contract",
                Regex::new(
                    r"(?i)\b(?:agreement|contract|hereinafter|terms and conditions|the parties agree)\b|عقد|اتفاقية",
                )?,
            ),
        ];

        let amount = Regex::new(
            r"(?P<cur>(?i:\bUS\$|\b(?:AED|USD|EUR|GBP|SAR))|\$|€|£|د\.إ|درهم|ريال|ر\.س)?[ \t]?(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:[ \t]?(?P<suf>(?i:(?:AED|USD|EUR|GBP|SAR|dirhams?|riyals?)\b)|درهم|ريال))?",
        )?;

        let finance_context = Regex::new(
            r"(?i)\b(?:total|revenues?|sales|costs?|tax|vat|profits?|payments?|paid|balance|amount|price|fees?|invoice|due|income|expenses?|ebitda|earnings)\b",
        )?;
        let time_context =
            Regex::new(r"(?i)\b(?:days?|weeks?|months?|quarters?|years?|yrs?|dso)\b|يوم|أيام|شهر")?;

        let amount_labels = vec![
            (
                AmountLabel::Total,
                Regex::new(r"(?i)\b(?:grand total|sub-?total|total(?: due)?|amount due|sum)\b|الإجمالي|المجموع")?,
            ),
            (
                AmountLabel::Revenue,
                Regex::new(r"(?i)\b(?:revenues?|sales|turnover|top line)\b|الإيرادات|المبيعات")?,
            ),
            (
                AmountLabel::Cost,
                Regex::new(r"(?i)\b(?:costs?|expenses?|expenditure|cogs|opex|capex|spend(?:ing)?)\b|التكاليف|المصروفات")?,
            ),
            (
                AmountLabel::Profit,
                Regex::new(r"(?i)\b(?:profits?|net income|operating income|earnings|ebitda|ebit|surplus)\b|الأرباح|الربح")?,
            ),
            (
                AmountLabel::Tax,
                Regex::new(r"(?i)\b(?:tax|vat|withholding|zakat)\b|الضريبة")?,
            ),
            (
                AmountLabel::Payment,
                Regex::new(r"(?i)\b(?:payments?|paid|remit(?:ted|tance)?|deposit|instal(?:l)?ments?)\b|دفعة|الدفع")?,
            ),
            (
                AmountLabel::Balance,
                Regex::new(r"(?i)\b(?:balance|outstanding|owed|receivables?|payables?)\b|الرصيد")?,
            ),
        ];

        let roles = vec![
            (
                Role::Client,
                Regex::new(&role_pattern(
                    "client|customer|buyer|bill(?:ed)? to|sold to",
                    "العميل|الزبون",
                ))?,
            ),
            (
                Role::Supplier,
                Regex::new(&role_pattern(
                    "supplier|vendor|seller|contractor|service provider|supplied by|provided by",
                    "المورد|البائع",
                ))?,
            ),
            (
                Role::Bank,
                Regex::new(&role_pattern(
                    "bank|banker|lender|financed by|facility with",
                    "البنك|المصرف",
                ))?,
            ),
            (
                Role::Investor,
                Regex::new(&role_pattern(
                    "investors?|shareholders?|backed by|funded by",
                    "المستثمر",
                ))?,
            ),
            (
                Role::Regulator,
                Regex::new(&role_pattern(
                    "regulators?|regulated by|supervised by|licensed by",
                    "الجهة التنظيمية|الهيئة",
                ))?,
            ),
        ];

        let caps_phrase = Regex::new(r"\b([A-Z][A-Z&\-]+(?:[ \t]+[A-Z][A-Z&\-]+){1,4})\b")?;

        let stop_words = cfg
            .stop_words
            .iter()
            .map(|w| w.trim().to_uppercase())
            .filter(|w| !w.is_empty())
            .collect();

        let dates = vec![
            Regex::new(r"\b\d{4}-\d{1,2}-\d{1,2}\b")?,
            Regex::new(r"\b\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}\b")?,
            Regex::new(&format!(r"(?i)\b(?:{MONTHS})\.?\s+(?:\d{{1,2}},?\s+)?\d{{4}}\b"))?,
        ];

        let positive = Regex::new(
            r"(?i)\b(?:growth|grew|growing|increased?|increases|improved?|improvement|strong(?:er)?|profitable|record|exceed(?:ed|s)?|robust|gains?|expand(?:ed)?|expansion|healthy|stable|resilient|upside|outperform(?:ed)?)\b|نمو|ارتفاع|تحسن",
        )?;
        let negative = Regex::new(
            r"(?i)\b(?:declines?|declined|decreased?|decreases|loss(?:es)?|overdue|default(?:ed|s)?|penalt(?:y|ies)|delay(?:ed|s)?|weak(?:er|ness)?|shortfall|deficit|disputes?|inflation|pressure|late|risks?|impairment|downturn|contraction)\b|انخفاض|خسارة|متأخر",
        )?;
        let cost_pressure = Regex::new(
            r"(?i)\b(?:cost (?:increases?|pressures?|overruns?|inflation)|rising (?:costs?|prices)|higher (?:input )?(?:costs?|prices)|inflation(?:ary)?|price increases?|margin (?:pressure|squeeze))\b|التضخم|ارتفاع التكاليف",
        )?;
        let compliance = Regex::new(
            r"(?i)\b(?:overdue|default(?:ed|s)?|penalt(?:y|ies)|late payments?|breach(?:es|ed)?|non-?compliance|arrears)\b|متأخر|غرامة",
        )?;

        let growth_explicit = Regex::new(
            r"(?i)\b(?:grew|grown|growth of|increased|increase of|rose|risen|up)\s+(?:by\s+)?(?:about\s+|approximately\s+|nearly\s+)?(\d+(?:\.\d+)?)\s?%",
        )?;
        let decline_explicit = Regex::new(
            r"(?i)\b(?:declined|decreased|fell|fallen|dropped|down|contracted)\s+(?:by\s+)?(?:about\s+|approximately\s+|nearly\s+)?(\d+(?:\.\d+)?)\s?%",
        )?;
        let growth_keyword = Regex::new(
            r"(?i)\b(?:growth|grew|increase[ds]?|rose|yoy|y/y|year[- ]on[- ]year|year[- ]over[- ]year|cagr)\b|نمو",
        )?;
        let percent = Regex::new(r"(\d+(?:\.\d+)?)\s?[%٪]")?;
        let margin_explicit =
            Regex::new(r"(?i)(\d+(?:\.\d+)?)\s?%\s+(?:[a-z\-]+\s+){0,3}?margins?\b")?;
        let margin_loose = Regex::new(r"(?i)\bmargins?\b[^%\d\n]{0,40}?(\d+(?:\.\d+)?)\s?%")?;
        let liquidity_explicit = Regex::new(
            r"(?i)\b(?:current|quick)\s+ratio\s*(?:of|is|was|at|stood at|:|=)?\s*(\d+(?:\.\d+)?)\s?x?",
        )?;
        let liquidity_hint = Regex::new(r"(?i)\bliquidity\b[^\d\n]{0,40}?(\d+(?:\.\d+)?)\s?x\b")?;
        let dso_keyword = Regex::new(
            r"(?i)\b(?:dso|days sales outstanding|receivable days|debtor days|receivables?)\b",
        )?;
        let small_number = Regex::new(r"\b(\d{1,3}(?:\.\d+)?)\b")?;

        let currency_token =
            Regex::new(r"(?i)\b(?:AED|USD|EUR|GBP|SAR)\b|US\$|\$|€|£|د\.إ|درهم|ريال|ر\.س")?;

        Ok(Self {
            doc_types,
            amount,
            finance_context,
            time_context,
            amount_labels,
            roles,
            caps_phrase,
            stop_words,
            dates,
            positive,
            negative,
            cost_pressure,
            compliance,
            growth_explicit,
            decline_explicit,
            growth_keyword,
            percent,
            margin_explicit,
            margin_loose,
            liquidity_explicit,
            liquidity_hint,
            dso_keyword,
            small_number,
            currency_token,
        })
    }

    /// Whether every word of `phrase` is a stop word (acronyms, finance terms).
    pub fn is_stop_phrase(&self, phrase: &str) -> bool {
        phrase
            .split_whitespace()
            .all(|w| self.stop_words.contains(&w.trim_matches(|c: char| !c.is_alphanumeric()).to_uppercase()))
    }

    /// Signal density used to rank evidence sentences.
    pub fn signal_score(&self, sentence: &str) -> usize {
        self.finance_context.find_iter(sentence).count() * 2
            + self.currency_token.find_iter(sentence).count() * 3
            + self.percent.find_iter(sentence).count() * 2
            + self.compliance.find_iter(sentence).count() * 2
            + self.cost_pressure.find_iter(sentence).count() * 2
            + self.dso_keyword.find_iter(sentence).count()
    }

    pub fn mentions_dso(&self, sentence: &str) -> bool {
        self.dso_keyword.is_match(sentence)
    }

    pub fn mentions_cost_pressure(&self, sentence: &str) -> bool {
        self.cost_pressure.is_match(sentence)
    }

    pub fn mentions_compliance(&self, sentence: &str) -> bool {
        self.compliance.is_match(sentence)
    }

    pub fn mentions_growth(&self, sentence: &str) -> bool {
        self.growth_keyword.is_match(sentence) || self.decline_explicit.is_match(sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lexicon_compiles() {
        assert!(Lexicon::new(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_stop_phrase() {
        let lex = Lexicon::new(&EngineConfig::default()).unwrap();
        assert!(lex.is_stop_phrase("DSO"));
        assert!(lex.is_stop_phrase("TOTAL AED"));
        assert!(lex.is_stop_phrase("Q3"));
        assert!(!lex.is_stop_phrase("ACME TRADING"));
    }
}
