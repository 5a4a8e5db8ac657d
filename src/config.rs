use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    #[serde(rename = "llm")]
    pub refiner: LlmSection,
}

/// Budgets, caps and word lists for the analysis pipeline, read from the
/// `[engine]` TOML section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Characters analyzed in one pass; longer text is chunked.
    pub pass_budget_chars: usize,
    /// Hard cap on chunks; trailing text beyond it is dropped.
    pub max_chunks: usize,
    pub max_amounts: usize,
    pub max_dates: usize,
    pub max_role_entries: usize,
    pub max_parties: usize,
    pub max_kpis: usize,
    pub max_kpis_merged: usize,
    pub max_insights: usize,
    pub max_risks: usize,
    pub max_actions: usize,
    /// Characters of source text handed to the refiner.
    pub evidence_budget_chars: usize,
    /// Trimmed inputs shorter than this are rejected before analysis.
    pub min_text_chars: usize,
    /// Acronyms and finance words that must never be read as entity names.
    pub stop_words: Vec<String>,
}

fn default_stop_words() -> Vec<String> {
    [
        "DSO", "AED", "USD", "EUR", "GBP", "SAR", "VAT", "PO", "Q1", "Q2", "Q3", "Q4", "KPI",
        "ROI", "IRR", "FY", "YOY", "YTD", "EBITDA", "CAGR", "TOTAL", "INVOICE", "DATE", "NO",
        "QTY", "TAX", "AMOUNT", "BALANCE", "PAYMENT", "DUE", "CEO", "CFO", "THE", "AND", "OF",
        "LTD", "LLC", "INC", "PDF", "PAGE", "N/A",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pass_budget_chars: 80_000,
            max_chunks: 24,
            max_amounts: 40,
            max_dates: 12,
            max_role_entries: 6,
            max_parties: 8,
            max_kpis: 16,
            max_kpis_merged: 24,
            max_insights: 6,
            max_risks: 12,
            max_actions: 12,
            evidence_budget_chars: 6_000,
            min_text_chars: 5,
            stop_words: default_stop_words(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Rule-based draft only, no refinement call.
    #[default]
    Heuristics,
    Ollama,
    Cliproxy,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmEndpoint {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub backend: LlmBackend,
    pub ollama: LlmEndpoint,
    pub cliproxy: LlmEndpoint,
    pub remote: LlmEndpoint,
    /// Budget for the whole refinement (both passes).
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Heuristics,
            ollama: LlmEndpoint {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "qwen3:8b".to_string(),
            },
            cliproxy: LlmEndpoint {
                base_url: "http://localhost:8317/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            remote: LlmEndpoint {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
            },
            timeout_secs: 18,
        }
    }
}

impl LlmSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn active_model(&self) -> Option<&str> {
        match self.backend {
            LlmBackend::Heuristics => None,
            LlmBackend::Ollama => Some(&self.ollama.model),
            LlmBackend::Cliproxy => Some(&self.cliproxy.model),
            LlmBackend::Remote => Some(&self.remote.model),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.engine, EngineConfig::default());
        assert_eq!(cfg.refiner.backend, LlmBackend::Heuristics);
        assert_eq!(cfg.refiner.active_model(), None);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = Config::parse(
            r#"
            [engine]
            pass_budget_chars = 5000
            max_chunks = 3

            [llm]
            backend = "ollama"
            timeout_secs = 5

            [llm.ollama]
            base_url = "http://127.0.0.1:11434/v1"
            model = "llama3"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.engine.pass_budget_chars, 5000);
        assert_eq!(cfg.engine.max_chunks, 3);
        assert_eq!(cfg.engine.max_amounts, 40);
        assert_eq!(cfg.refiner.backend, LlmBackend::Ollama);
        assert_eq!(cfg.refiner.active_model(), Some("llama3"));
        assert_eq!(cfg.refiner.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_bad_backend_is_config_error() {
        let err = Config::parse("[llm]\nbackend = \"carrier-pigeon\"\n").unwrap_err();
        assert!(matches!(err, crate::error::AnalyzeError::Config(_)));
    }
}
