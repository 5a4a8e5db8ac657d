use super::Lexicon;

/// ISO, DD/MM/YYYY and `Month [DD,] YYYY` shapes in document order.
/// Overlapping hits keep the earliest (then longest) one.
pub fn extract_dates(lex: &Lexicon, text: &str, cap: usize) -> Vec<String> {
    let mut hits: Vec<(usize, usize)> = lex
        .dates
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| (m.start(), m.end())))
        .collect();
    hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut out: Vec<String> = Vec::new();
    let mut last_end = 0;
    for (start, end) in hits {
        if start < last_end {
            continue;
        }
        last_end = end;
        let date = text[start..end].trim().to_string();
        if !out.contains(&date) {
            out.push(date);
        }
        if out.len() >= cap {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_extract_dates() {
        let lex = Lexicon::new(&EngineConfig::default()).unwrap();
        let text = "Issued 2025-03-31, due 15/04/2025. Covers March 2025 and Jan 5, 2026. Again 2025-03-31.";
        assert_eq!(
            extract_dates(&lex, text, 12),
            vec!["2025-03-31", "15/04/2025", "March 2025", "Jan 5, 2026"]
        );
        assert_eq!(extract_dates(&lex, text, 2).len(), 2);
    }
}
