use super::Lexicon;
use crate::model::Language;

pub fn is_arabic(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{08A0}'..='\u{08FF}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

/// Any Arabic-script codepoint makes the document Arabic.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_arabic) {
        Language::Ara
    } else {
        Language::Eng
    }
}

/// Ordered keyword checks; first match wins.
pub fn guess_doc_type(lex: &Lexicon, text: &str) -> &'static str {
    lex.doc_types
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
        .unwrap_or("document")
}

fn starts_sentence(c: char) -> bool {
    c.is_ascii_uppercase() || (is_arabic(c) && c.is_alphabetic())
}

/// Split on `.`/`!`/`?` + whitespace + uppercase (Latin or Arabic) letter.
///
/// Abbreviation-heavy text tends to come out as one giant sentence, so with
/// fewer than two sentences we split on newlines instead.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if matches!(c, '.' | '!' | '?') {
            let mut k = i + 1;
            while k < chars.len() && chars[k].1.is_whitespace() {
                k += 1;
            }
            if k > i + 1 && k < chars.len() && starts_sentence(chars[k].1) {
                let end = pos + c.len_utf8();
                push_trimmed(&mut sentences, &text[start..end]);
                start = chars[k].0;
                i = k;
                continue;
            }
        }
        i += 1;
    }
    push_trimmed(&mut sentences, &text[start..]);

    if sentences.len() < 2 {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if lines.len() > sentences.len() {
            return lines;
        }
    }
    sentences
}

fn push_trimmed(out: &mut Vec<String>, s: &str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
}

pub(crate) fn floor_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

pub(crate) fn ceil_boundary(text: &str, mut i: usize) -> usize {
    if i >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Byte range `[start - before, end + after]`, snapped to char boundaries.
pub(crate) fn window(text: &str, start: usize, end: usize, before: usize, after: usize) -> (usize, usize) {
    (
        floor_boundary(text, start.saturating_sub(before)),
        ceil_boundary(text, end.saturating_add(after)),
    )
}

pub(crate) fn char_before(text: &str, idx: usize) -> Option<char> {
    text[..idx].chars().next_back()
}

pub(crate) fn char_after(text: &str, idx: usize) -> Option<char> {
    text[idx..].chars().next()
}

/// Characters between two spans; zero when they overlap.
pub(crate) fn span_gap(a: (usize, usize), b: (usize, usize)) -> usize {
    if a.1 <= b.0 {
        b.0 - a.1
    } else if b.1 <= a.0 {
        a.0 - b.1
    } else {
        0
    }
}

/// First `max_chars` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `15` for whole numbers, `18.5` / `1.25` otherwise.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
