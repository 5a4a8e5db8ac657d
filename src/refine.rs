// src/refine.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, info_span, warn};

use crate::config::{LlmBackend, LlmSection};
use crate::error::RefineError;
use crate::model::Analysis;

/// Optional second opinion on a draft analysis.
///
/// Implementations may fail in any way; callers go through
/// [`refine_or_draft`], which falls back to the draft.
#[async_trait]
pub trait Refiner: Send + Sync {
    fn name(&self) -> &str;

    async fn refine(&self, evidence: &str, draft: &Analysis) -> Result<Analysis, RefineError>;
}

/// Returns the draft untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRefiner;

#[async_trait]
impl Refiner for PassthroughRefiner {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn refine(&self, _evidence: &str, draft: &Analysis) -> Result<Analysis, RefineError> {
        Ok(draft.clone())
    }
}

/// Run `refiner` under a hard timeout; any failure yields the draft.
pub async fn refine_or_draft(
    refiner: &dyn Refiner,
    evidence: &str,
    draft: Analysis,
    timeout: Duration,
) -> Analysis {
    let span = info_span!("refine", refiner = refiner.name());
    async move {
        let outcome = tokio::time::timeout(timeout, refiner.refine(evidence, &draft)).await;
        let error = match outcome {
            Ok(Ok(refined)) => {
                info!(summary_len = refined.summary.len(), "Refined analysis accepted");
                return refined;
            }
            Ok(Err(e)) => e,
            Err(_) => RefineError::Timeout(timeout),
        };
        warn!(error = %error, "Refinement failed, keeping draft");
        draft
    }
    .instrument(span)
    .await
}

const CRITIQUE_PROMPT: &str = r#"You review a machine-generated business document analysis.
You receive an evidence excerpt from the document and a draft analysis as JSON.
Correct the draft where the evidence contradicts it and return ONLY the corrected JSON,
with exactly the same fields and field names as the draft.

Rules:
- charts contain money values only; never put percentages, ratios or day counts there.
- "Revenue Growth %" is a percentage, not an amount.
- "DSO (days)" is a day count, never money.
- Keep scores as integers from 0 to 5.
- Return ONLY the JSON object, no markdown fences, no commentary."#;

const FROM_EVIDENCE_PROMPT: &str = r#"You analyze business documents.
Using ONLY the evidence excerpt, fill in the analysis JSON skeleton you are given.
Keep every field name and type of the skeleton. Use empty arrays when nothing applies.
Scores are integers from 0 to 5. Charts contain money values only.
Return ONLY the JSON object, no markdown fences, no commentary."#;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Resolved endpoint configuration ready to make API calls.
#[derive(Clone)]
pub struct ResolvedEndpoint {
    pub base_url: String,
    pub model: String,
    api_key: String,
}

/// Resolve the LLM config section into a concrete endpoint.
pub fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, RefineError> {
    let (endpoint, api_key) = match llm.backend {
        LlmBackend::Ollama => (&llm.ollama, "ollama".to_string()),
        LlmBackend::Cliproxy => (&llm.cliproxy, "cliproxy".to_string()),
        LlmBackend::Remote => {
            let key = std::env::var("LLM_API_KEY").map_err(|_| {
                RefineError::Disabled("LLM_API_KEY env var required for remote backend".to_string())
            })?;
            (&llm.remote, key)
        }
        LlmBackend::Heuristics => {
            return Err(RefineError::Disabled(
                "heuristics backend selected, no LLM refinement".to_string(),
            ));
        }
    };
    info!(
        backend = ?llm.backend,
        url = %endpoint.base_url,
        model = %endpoint.model,
        "Resolved LLM endpoint"
    );
    Ok(ResolvedEndpoint {
        base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        model: endpoint.model.clone(),
        api_key,
    })
}

/// Extract the outermost JSON object from a string that may contain
/// surrounding text (e.g. thinking tokens).
pub fn extract_json_object(s: &str) -> Result<&str, RefineError> {
    let s = s
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let start = s
        .find('{')
        .ok_or_else(|| RefineError::Malformed("no '{' in response".to_string()))?;
    let end = s
        .rfind('}')
        .ok_or_else(|| RefineError::Malformed("no '}' in response".to_string()))?;
    if end <= start {
        return Err(RefineError::Malformed("unbalanced JSON object".to_string()));
    }
    Ok(&s[start..=end])
}

/// Parse a model reply into an [`Analysis`], rejecting summary-less results.
pub fn parse_analysis(content: &str) -> Result<Analysis, RefineError> {
    let json = extract_json_object(content)?;
    let analysis: Analysis = serde_json::from_str(json)?;
    if analysis.summary.trim().is_empty() {
        return Err(RefineError::Malformed("refined analysis has no summary".to_string()));
    }
    Ok(analysis)
}

/// OpenAI-compatible chat completions refiner.
///
/// Pass 1 critiques the draft against the evidence; if that fails, pass 2
/// rebuilds the analysis from the evidence alone.
pub struct LlmRefiner {
    client: Client,
    endpoint: ResolvedEndpoint,
    health_check: bool,
}

impl LlmRefiner {
    pub fn from_config(llm: &LlmSection) -> Result<Self, RefineError> {
        Ok(Self {
            client: Client::new(),
            endpoint: resolve_endpoint(llm)?,
            health_check: llm.backend == LlmBackend::Ollama,
        })
    }

    /// Check if the Ollama server is reachable.
    async fn check_ollama_health(&self) -> bool {
        // Ollama's health endpoint is at the root (not under /v1)
        let health_url = self.endpoint.base_url.trim_end_matches("/v1");
        match self
            .client
            .get(health_url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "Ollama server returned non-OK status");
                false
            }
            Err(e) => {
                warn!(error = %e, "Ollama server not reachable");
                false
            }
        }
    }

    async fn chat(&self, system: &str, user: String) -> Result<Analysis, RefineError> {
        let request = ChatRequest {
            model: self.endpoint.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.endpoint.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.endpoint.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RefineError::Status { status, body });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| RefineError::Malformed("empty choices".to_string()))?;
        parse_analysis(content)
    }
}

#[async_trait]
impl Refiner for LlmRefiner {
    fn name(&self) -> &str {
        &self.endpoint.model
    }

    async fn refine(&self, evidence: &str, draft: &Analysis) -> Result<Analysis, RefineError> {
        if self.health_check && !self.check_ollama_health().await {
            return Err(RefineError::Disabled(format!(
                "Ollama is not running at {}",
                self.endpoint.base_url
            )));
        }
        let draft_json = serde_json::to_string(draft)?;

        let critique = format!("EVIDENCE:\n{evidence}\n\nDRAFT:\n{draft_json}");
        match self
            .chat(CRITIQUE_PROMPT, critique)
            .instrument(info_span!("pass", n = 1))
            .await
        {
            Ok(refined) => return Ok(refined),
            Err(e) => warn!(error = %e, "Critique pass failed, trying evidence-only pass"),
        }

        let rebuild = format!("EVIDENCE:\n{evidence}\n\nSKELETON:\n{draft_json}");
        self.chat(FROM_EVIDENCE_PROMPT, rebuild)
            .instrument(info_span!("pass", n = 2))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object() {
        let raw = "<think>hmm</think>\n```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_object(raw).unwrap(), "{\"a\": {\"b\": 1}}");
        assert!(matches!(extract_json_object("no json"), Err(RefineError::Malformed(_))));
        assert!(matches!(extract_json_object("} {"), Err(RefineError::Malformed(_))));
    }

    #[test]
    fn test_heuristics_backend_disables_llm() {
        let llm = LlmSection::default();
        assert!(matches!(resolve_endpoint(&llm), Err(RefineError::Disabled(_))));
    }

    #[test]
    fn test_ollama_endpoint_resolves() {
        let llm = LlmSection {
            backend: LlmBackend::Ollama,
            ..Default::default()
        };
        let endpoint = resolve_endpoint(&llm).unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert_eq!(endpoint.model, "qwen3:8b");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_analysis("{\"summary\": 3}"), Err(RefineError::Parse(_))));
    }
}
