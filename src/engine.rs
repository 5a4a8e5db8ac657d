// src/engine.rs

use std::time::Duration;

use rayon::prelude::*;
use tracing::{info, info_span};

use crate::aggregate::aggregate;
use crate::analyzer::{PassHints, analyze_pass};
use crate::chunking::chunk_text;
use crate::config::EngineConfig;
use crate::error::{AnalyzeError, Result};
use crate::evidence::build_evidence;
use crate::heuristics::Lexicon;
use crate::model::{Analysis, DocumentInput};
use crate::refine::{Refiner, refine_or_draft};

/// Compiled, immutable analysis engine. Cheap to share across threads.
pub struct Engine {
    config: EngineConfig,
    lexicon: Lexicon,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let lexicon = Lexicon::new(&config)?;
        Ok(Self { config, lexicon })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a document, chunking it when it exceeds the per-pass budget.
    ///
    /// The only failure is input too short to analyze.
    pub fn analyze(&self, input: &DocumentInput) -> Result<Analysis> {
        let len = input.text.trim().chars().count();
        if len < self.config.min_text_chars {
            return Err(AnalyzeError::InputTooShort {
                len,
                min: self.config.min_text_chars,
            });
        }

        let hints = PassHints {
            doc_type: input.declared_doc_type(),
            language_out: input.language_out,
        };
        let chars = input.text.chars().count();
        if chars <= self.config.pass_budget_chars {
            return Ok(self.analyze_single(&input.text, hints));
        }

        let chunks = chunk_text(&input.text, self.config.pass_budget_chars, self.config.max_chunks);
        info!(chars, chunks = chunks.len(), "Analyzing oversized document in chunks");
        let partials: Vec<Analysis> = chunks
            .par_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let _span = info_span!("chunk", idx).entered();
                self.analyze_single(chunk, hints)
            })
            .collect();
        Ok(aggregate(partials, &self.config, input.language_out))
    }

    /// One pass over `text`, truncated to the per-pass budget.
    pub fn analyze_single(&self, text: &str, hints: PassHints<'_>) -> Analysis {
        analyze_pass(&self.lexicon, &self.config, text, hints)
    }

    /// Highest-signal excerpt of `text` for the refiner.
    pub fn evidence(&self, text: &str) -> String {
        build_evidence(&self.lexicon, text, self.config.evidence_budget_chars)
    }

    /// Analyze, then let `refiner` improve the draft within `timeout`.
    /// Refiner failures of any kind return the draft.
    pub async fn analyze_and_refine(
        &self,
        input: &DocumentInput,
        refiner: &dyn Refiner,
        timeout: Duration,
    ) -> Result<Analysis> {
        let draft = self.analyze(input)?;
        let evidence = self.evidence(&input.text);
        info!(
            refiner = refiner.name(),
            evidence_chars = evidence.chars().count(),
            "Handing draft to refiner"
        );
        Ok(refine_or_draft(refiner, &evidence, draft, timeout).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_rejected() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let err = engine.analyze(&DocumentInput::new("  hi  ")).unwrap_err();
        assert!(matches!(err, AnalyzeError::InputTooShort { len: 2, min: 5 }));
    }

    #[test]
    fn test_doc_type_hint_overrides_guess() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let input = DocumentInput::new("Tax invoice total AED 1,000").with_doc_type("receipt");
        assert_eq!(engine.analyze(&input).unwrap().doc_type, "receipt");
        let auto = DocumentInput::new("Tax invoice total AED 1,000").with_doc_type("auto");
        assert_eq!(engine.analyze(&auto).unwrap().doc_type, "invoice");
    }
}
