use super::Lexicon;
use crate::model::{EntityRoles, Role};

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 60;

/// Collapse whitespace, drop dangling connectors, keep whole words up to the
/// length limit.
fn clean_name(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    let mut len = 0;
    for w in raw.split_whitespace() {
        let added = w.chars().count() + usize::from(!words.is_empty());
        if len + added > MAX_NAME_CHARS {
            break;
        }
        len += added;
        words.push(w);
    }
    while words
        .last()
        .is_some_and(|w| matches!(*w, "&" | "and" | "of" | "-"))
    {
        words.pop();
    }
    let name = words.join(" ");
    let name = name.trim_matches(|c: char| c == '-' || c == '\'').to_string();
    (name.chars().count() >= MIN_NAME_CHARS).then_some(name)
}

/// Keyword-anchored role capture, plus an all-caps phrase scan that feeds
/// `other` only when no role keyword matched anything.
pub fn extract_entities(lex: &Lexicon, text: &str, cap: usize) -> EntityRoles {
    let mut roles = EntityRoles::default();

    for (role, re) in &lex.roles {
        for caps in re.captures_iter(text) {
            let Some(name) = caps.get(1).and_then(|m| clean_name(m.as_str())) else {
                continue;
            };
            if lex.is_stop_phrase(&name) {
                continue;
            }
            roles.push_capped(*role, &name, cap);
        }
    }

    let any_named = Role::ALL.iter().any(|r| !roles.get(*r).is_empty());
    if !any_named {
        for caps in lex.caps_phrase.captures_iter(text) {
            let Some(name) = caps.get(1).and_then(|m| clean_name(m.as_str())) else {
                continue;
            };
            if name.chars().count() < 3 || lex.is_stop_phrase(&name) || roles.contains(&name) {
                continue;
            }
            roles.push_capped(Role::Other, &name, cap);
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn lex() -> Lexicon {
        Lexicon::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_role_capture() {
        let roles = extract_entities(
            &lex(),
            "Client: Acme Corp. Payment overdue. Supplier is Gulf Steel & Wire Trading. Bank: Emirates NBD.",
            6,
        );
        assert_eq!(roles.client, vec!["Acme Corp"]);
        assert_eq!(roles.supplier, vec!["Gulf Steel & Wire Trading"]);
        assert_eq!(roles.bank, vec!["Emirates NBD"]);
        assert!(roles.other.is_empty());
    }

    #[test]
    fn test_lowercase_followers_ignored() {
        let roles = extract_entities(&lex(), "Our customer base grew and the vendor list shrank.", 6);
        assert_eq!(roles, EntityRoles::default());
    }

    #[test]
    fn test_dedup_and_cap() {
        let text = "Client: Alpha. client: ALPHA. Client: Beta. Client: Gamma.";
        let roles = extract_entities(&lex(), text, 2);
        assert_eq!(roles.client, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_stop_words_rejected() {
        let roles = extract_entities(&lex(), "Customer: DSO review. Vendor: VAT", 6);
        assert!(roles.client.iter().all(|n| n != "DSO"));
        assert!(roles.supplier.is_empty());
    }

    #[test]
    fn test_caps_fallback_feeds_other() {
        let roles = extract_entities(&lex(), "ACME TRADING LLC\nTOTAL AED 5,000\nINVOICE NO 7", 6);
        assert_eq!(roles.other, vec!["ACME TRADING LLC"]);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("Acme   Holdings and").as_deref(), Some("Acme Holdings"));
        assert_eq!(clean_name("A"), None);
        let long = "Alpha ".repeat(20);
        assert!(clean_name(&long).unwrap().chars().count() <= MAX_NAME_CHARS);
    }
}
