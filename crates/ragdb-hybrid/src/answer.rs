//! Query answering: retrieval, citations and an optional generated answer.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ragdb_core::traits::Generator;
use ragdb_core::types::{GraphContext, GraphParams, TextUnit};
use ragdb_core::{Error, Result};

use crate::retriever::HybridRetriever;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    None,
    Transformers,
    Ollama,
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "transformers" => Ok(Self::Transformers),
            "ollama" => Ok(Self::Ollama),
            _ => Err(Error::invalid("provider", s)),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Transformers => "transformers",
            Self::Ollama => "ollama",
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub mode: Option<String>,
    pub provider: Option<String>,
    pub graph: bool,
    pub graph_params: Option<GraphParams>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self { Self { query: query.into(), ..Self::default() } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrieverScores {
    pub semantic: Option<f64>,
    pub lexical: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    pub text: String,
    pub rank: usize,
    pub file_id: Option<String>,
    pub page: Option<u32>,
    pub span: Option<(usize, usize)>,
    pub scores: RetrieverScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub file_id: Option<String>,
    pub page: Option<u32>,
    pub span: Option<(usize, usize)>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub results: Vec<RankedDocument>,
    pub graph_context: Option<GraphContext>,
}

pub fn build_prompt<'a>(query: &str, units: impl IntoIterator<Item = &'a TextUnit>) -> String {
    let context: Vec<&str> = units.into_iter().map(|u| u.text.as_str()).collect();
    format!("Context:\n{}\n\nQuestion: {query}\nAnswer:", context.join("\n\n"))
}

pub struct QueryService {
    retriever: Arc<HybridRetriever>,
    generators: HashMap<Provider, Arc<dyn Generator>>,
}

impl QueryService {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self { Self { retriever, generators: HashMap::new() } }

    pub fn with_generator(mut self, provider: Provider, generator: Arc<dyn Generator>) -> Self {
        self.generators.insert(provider, generator);
        self
    }

    pub fn retriever(&self) -> &Arc<HybridRetriever> { &self.retriever }

    pub async fn query(&self, req: QueryRequest) -> Result<QueryResponse> {
        let config = *self.retriever.config();
        let mode = match req.mode.as_deref() {
            Some(m) => m.parse()?,
            None => config.default_mode,
        };
        let provider: Provider = req.provider.as_deref().map(str::parse::<Provider>).transpose()?.unwrap_or_default();
        let generator = match provider {
            Provider::None => None,
            other => Some(
                self.generators
                    .get(&other)
                    .cloned()
                    .ok_or_else(|| Error::collaborator("generator", format!("no generator registered for {other}")))?,
            ),
        };
        let graph = req.graph.then(|| req.graph_params.unwrap_or_default());
        let top_k = req.top_k.unwrap_or(config.default_top_k);

        let retrieval = self.retriever.retrieve(&req.query, top_k, mode, graph).await?;

        let answer = match generator {
            Some(generator) => {
                let prompt = build_prompt(&req.query, retrieval.units());
                debug!(%provider, prompt_chars = prompt.len(), "generating answer");
                generator.generate(&prompt).await?
            }
            None => String::new(),
        };

        let mut results = Vec::with_capacity(retrieval.results.len());
        let mut citations = Vec::with_capacity(retrieval.results.len());
        for r in &retrieval.results {
            let (file_id, page, span) = (r.unit.file_id().map(str::to_string), r.unit.page(), r.unit.span());
            results.push(RankedDocument {
                text: r.unit.text.clone(),
                rank: r.rank,
                file_id: file_id.clone(),
                page,
                span,
                scores: RetrieverScores { semantic: r.semantic_score, lexical: r.lexical_score },
            });
            citations.push(Citation { file_id, page, span, text: r.unit.text.clone() });
        }
        Ok(QueryResponse { query: req.query, answer, citations, results, graph_context: retrieval.graph })
    }
}
