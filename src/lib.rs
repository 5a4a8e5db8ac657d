//! Rule-based business document analysis.
//!
//! Text goes in, a structured [`Analysis`] comes out: amounts, dates,
//! counterparties, KPIs, health scores, risks, actions, chart series and a
//! templated summary. Oversized documents are chunked and merged; an
//! optional [`Refiner`] may improve the draft, with fallback on any failure.

pub mod aggregate;
pub mod analyzer;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod findings;
pub mod heuristics;
pub mod model;
pub mod refine;
pub mod scoring;
pub mod synthesis;

pub use config::{Config, EngineConfig, LlmBackend, LlmSection};
pub use engine::Engine;
pub use error::{AnalyzeError, RefineError, Result};
pub use model::{Analysis, DocumentInput, Language};
pub use refine::{LlmRefiner, PassthroughRefiner, Refiner};
