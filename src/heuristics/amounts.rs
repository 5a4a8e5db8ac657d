use super::Lexicon;
use super::text::{char_after, char_before, span_gap, window};
use crate::model::{Amount, AmountLabel};

// Byte windows around a candidate number.
const LABEL_BEFORE: usize = 48;
const LABEL_AFTER: usize = 24;
const FINANCE_BEFORE: usize = 40;
const FINANCE_AFTER: usize = 24;
const TIME_BEFORE: usize = 16;
const TIME_AFTER: usize = 12;

/// Map a symbol, code or Arabic token onto the closed currency set.
pub fn normalize_currency(token: &str) -> Option<&'static str> {
    match token.trim().to_uppercase().as_str() {
        "AED" | "DIRHAM" | "DIRHAMS" | "د.إ" | "درهم" => Some("AED"),
        "USD" | "US$" | "$" => Some("USD"),
        "EUR" | "€" => Some("EUR"),
        "GBP" | "£" => Some("GBP"),
        "SAR" | "RIYAL" | "RIYALS" | "ريال" | "ر.س" => Some("SAR"),
        _ => None,
    }
}

/// Label for the amount spanning `start..end`: the label whose keyword sits
/// nearest to the span inside a fixed window. Ties go to the earlier label in
/// [`AmountLabel::ALL`] order.
pub fn classify_amount(lex: &Lexicon, text: &str, start: usize, end: usize) -> AmountLabel {
    let (ws, we) = window(text, start, end, LABEL_BEFORE, LABEL_AFTER);
    let slice = &text[ws..we];

    let mut best: Option<(usize, AmountLabel)> = None;
    for (label, re) in &lex.amount_labels {
        for m in re.find_iter(slice) {
            let gap = span_gap((ws + m.start(), ws + m.end()), (start, end));
            if best.is_none_or(|(g, _)| gap < g) {
                best = Some((gap, *label));
            }
        }
    }
    best.map(|(_, label)| label).unwrap_or(AmountLabel::Amount)
}

/// Number directly after `idx`, allowing one space: `12%`, `12 %`, `1.6x`.
fn is_ratio_suffix(text: &str, idx: usize) -> bool {
    let is_marker = |c: char| matches!(c, '%' | '٪' | 'x' | 'X');
    match char_after(text, idx) {
        Some(c) if is_marker(c) => true,
        Some(' ') => char_after(text, idx + 1) == Some('%'),
        _ => false,
    }
}

fn is_date_fragment(text: &str, lead: usize, end: usize) -> bool {
    let sep = |c: Option<char>| matches!(c, Some('/' | '-' | '.' | ':'));
    let digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    (sep(char_before(text, lead)) && digit(char_before(text, lead - 1)))
        || (sep(char_after(text, end)) && digit(char_after(text, end + 1)))
}

fn is_negative(text: &str, lead: usize, match_end: usize) -> bool {
    match char_before(text, lead) {
        Some(c @ ('-' | '−')) => {
            !char_before(text, lead - c.len_utf8()).is_some_and(|p| p.is_alphanumeric())
        }
        Some('(') => char_after(text, match_end) == Some(')'),
        _ => false,
    }
}

/// Pull monetary amounts out of `text`.
///
/// A candidate is rejected outright when it is glued to a letter (`Q2`,
/// `FY2025`), carries a ratio suffix (`12%`, `1.6x`), is part of a date, is a
/// bare year, or sits in a time-unit context without a currency. Otherwise it
/// needs a currency, thousands grouping, magnitude >= 1000, or a nearby
/// finance keyword with magnitude >= 10.
pub fn extract_amounts(lex: &Lexicon, text: &str, cap: usize) -> Vec<Amount> {
    let mut out: Vec<Amount> = Vec::new();

    for caps in lex.amount.captures_iter(text) {
        if out.len() >= cap {
            break;
        }
        let Some(num) = caps.name("num") else {
            continue;
        };
        let prefix = caps.name("cur");
        let currency = prefix
            .or_else(|| caps.name("suf"))
            .and_then(|m| normalize_currency(m.as_str()));
        let lead = prefix.map_or(num.start(), |m| m.start());
        let match_end = caps.get(0).map_or(num.end(), |m| m.end());

        if char_before(text, lead).is_some_and(char::is_alphabetic) {
            continue;
        }
        if is_ratio_suffix(text, num.end()) || is_date_fragment(text, lead, num.end()) {
            continue;
        }

        let raw = num.as_str();
        let Ok(magnitude) = raw.replace(',', "").parse::<f64>() else {
            continue;
        };
        let grouped = raw.contains(',');
        let has_currency = currency.is_some();

        if !has_currency && !grouped && !raw.contains('.') && (1900.0..=2100.0).contains(&magnitude) {
            continue;
        }

        let (ts, te) = window(text, lead, num.end(), TIME_BEFORE, TIME_AFTER);
        if !has_currency && lex.time_context.is_match(&text[ts..te]) {
            continue;
        }

        let near_finance = {
            let (fs, fe) = window(text, lead, num.end(), FINANCE_BEFORE, FINANCE_AFTER);
            lex.finance_context.is_match(&text[fs..fe])
        };
        let accepted =
            has_currency || grouped || magnitude >= 1000.0 || (near_finance && magnitude >= 10.0);
        if !accepted {
            continue;
        }

        let value = if is_negative(text, lead, match_end) {
            -magnitude
        } else {
            magnitude
        };
        let amount = Amount {
            label: classify_amount(lex, text, lead, num.end()),
            value,
            currency: currency.map(str::to_string),
        };
        if !out.contains(&amount) {
            out.push(amount);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use pretty_assertions::assert_eq;

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
    fn test_quarter_and_percent_are_not_amounts() {
        let found = extract_amounts(&lex(), "Q2 growth was 12% on revenue of AED 45,000", 40);
        assert_eq!(found, vec![amt(AmountLabel::Revenue, 45_000.0, Some("AED"))]);
    }

    #[test]
    fn test_ratio_and_day_counts_rejected() {
        let found = extract_amounts(
            &lex(),
            "Current ratio 1.6x. DSO of 62 days. Net 30 days terms. FY2025 plan.",
            40,
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_time_context_allowed_with_currency() {
        let found = extract_amounts(&lex(), "Monthly fee of USD 250 per month", 40);
        assert_eq!(found, vec![amt(AmountLabel::Amount, 250.0, Some("USD"))]);
    }

    #[test]
    fn test_dates_and_years_rejected() {
        let found = extract_amounts(&lex(), "Issued 2025-03-31, due 15/04/2025 for March 2025", 40);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_acceptance_rules() {
        let lex = lex();
        // small number next to a finance keyword
        assert_eq!(
            extract_amounts(&lex, "Tax: 75", 40),
            vec![amt(AmountLabel::Tax, 75.0, None)]
        );
        // small number with no context
        assert!(extract_amounts(&lex, "We shipped 75 boxes", 40).is_empty());
        // large bare number
        assert_eq!(
            extract_amounts(&lex, "Grand total 12500", 40),
            vec![amt(AmountLabel::Total, 12_500.0, None)]
        );
    }

    #[test]
    fn test_symbols_suffixes_and_arabic() {
        let lex = lex();
        assert_eq!(
            extract_amounts(&lex, "Payment of $1,200.50 received", 40),
            vec![amt(AmountLabel::Payment, 1_200.5, Some("USD"))]
        );
        assert_eq!(
            extract_amounts(&lex, "Cost 900 EUR", 40),
            vec![amt(AmountLabel::Cost, 900.0, Some("EUR"))]
        );
        assert_eq!(
            extract_amounts(&lex, "الإجمالي 5,000 درهم", 40),
            vec![amt(AmountLabel::Total, 5_000.0, Some("AED"))]
        );
    }

    #[test]
    fn test_currency_codes_inside_words() {
        let lex = lex();
        assert_eq!(
            extract_amounts(
                &lex,
                "Consulting fee paid to Raed 5,000 for the audit. Bonus to Caesar 2,500.",
                40
            ),
            vec![
                amt(AmountLabel::Payment, 5_000.0, None),
                amt(AmountLabel::Amount, 2_500.0, None),
            ]
        );
        assert_eq!(
            extract_amounts(&lex, "Total 5,000 European units", 40),
            vec![amt(AmountLabel::Total, 5_000.0, None)]
        );
        assert_eq!(
            extract_amounts(&lex, "Total 5,000 dirhams", 40),
            vec![amt(AmountLabel::Total, 5_000.0, Some("AED"))]
        );
    }

    #[test]
    fn test_negative_values() {
        let lex = lex();
        assert_eq!(
            extract_amounts(&lex, "Net profit (AED 1,200)", 40),
            vec![amt(AmountLabel::Profit, -1_200.0, Some("AED"))]
        );
        assert_eq!(
            extract_amounts(&lex, "Balance: -5,000", 40),
            vec![amt(AmountLabel::Balance, -5_000.0, None)]
        );
    }

    #[test]
    fn test_classify_prefers_nearest_keyword() {
        let lex = lex();
        let text = "Total cost for the year was AED 9,000";
        let start = text.find("AED").unwrap();
        assert_eq!(classify_amount(&lex, text, start, text.len()), AmountLabel::Cost);
        let text = "Revenue AED 10,000 and tax AED 500";
        let start = text.rfind("AED").unwrap();
        assert_eq!(classify_amount(&lex, text, start, text.len()), AmountLabel::Tax);
    }

    #[test]
    fn test_cap_and_duplicates() {
        let text = "Total AED 1,000. Total AED 1,000. Revenue AED 2,000. Cost AED 3,000.";
        let found = extract_amounts(&lex(), text, 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], amt(AmountLabel::Total, 1_000.0, Some("AED")));
        assert_eq!(found[1], amt(AmountLabel::Revenue, 2_000.0, Some("AED")));
    }
}
