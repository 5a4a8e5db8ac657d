use super::Lexicon;
use crate::model::Tone;

/// Keyword hits that feed tone, health flags and risk rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signals {
    pub tone: Tone,
    pub cost_pressure: bool,
    pub compliance_issue: bool,
}

pub fn scan_signals(lex: &Lexicon, text: &str) -> Signals {
    let positive = lex.positive.find_iter(text).count() as u32;
    let negative = lex.negative.find_iter(text).count() as u32;
    Signals {
        tone: Tone::from_counts(positive, negative),
        cost_pressure: lex.cost_pressure.is_match(text),
        compliance_issue: lex.compliance.is_match(text),
    }
}
