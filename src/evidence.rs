// src/evidence.rs

use crate::heuristics::text::truncate_chars;
use crate::heuristics::{Lexicon, split_sentences};

fn number_count(sentence: &str) -> usize {
    sentence
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .count()
}

/// Highest-signal sentences up to `budget` characters, in document order.
///
/// Text that already fits is returned as is. Sentences with no finance,
/// currency, percentage or number signal are never picked.
pub fn build_evidence(lex: &Lexicon, text: &str, budget: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let sentences = split_sentences(text);
    let mut ranked: Vec<(usize, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| (i, lex.signal_score(s) + number_count(s)))
        .filter(|(_, score)| *score > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut picked: Vec<usize> = Vec::new();
    let mut used = 0;
    for (i, _) in ranked {
        let len = sentences[i].chars().count();
        let sep = usize::from(!picked.is_empty());
        if used + sep + len <= budget {
            used += sep + len;
            picked.push(i);
        }
    }

    if picked.is_empty() {
        return truncate_chars(text, budget).to_string();
    }
    picked.sort_unstable();
    picked
        .into_iter()
        .map(|i| sentences[i].as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn lex() -> Lexicon {
        Lexicon::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_short_text_passes_through() {
        assert_eq!(build_evidence(&lex(), "  Total AED 500.  ", 100), "Total AED 500.");
    }

    #[test]
    fn test_best_sentences_in_document_order() {
        let text = "The weather was pleasant. Revenue reached AED 2,500,000 this year. \
                    We hosted a picnic. Payment of USD 4,000 is overdue.";
        let evidence = build_evidence(&lex(), text, 90);
        assert_eq!(
            evidence,
            "Revenue reached AED 2,500,000 this year.\nPayment of USD 4,000 is overdue."
        );
    }

    #[test]
    fn test_budget_respected_on_large_input() {
        let text = "Total cost was AED 1,000 for the quarter. ".repeat(1_000);
        let evidence = build_evidence(&lex(), &text, 6_000);
        assert!(evidence.chars().count() <= 6_000);
        assert!(!evidence.is_empty());
    }

    #[test]
    fn test_signal_free_text_is_truncated() {
        let text = "words ".repeat(100);
        assert_eq!(build_evidence(&lex(), &text, 20).chars().count(), 20);
    }
}
