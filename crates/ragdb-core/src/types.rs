//! Domain types shared by the lexical, semantic, graph and fusion layers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content;
use crate::error::{Error, Result};

/// Free-form provenance attached to a text unit.
pub type Tags = BTreeMap<String, Value>;

pub const FILE_ID_TAG: &str = "file_id";
pub const PAGE_TAG: &str = "page";
pub const SPAN_TAG: &str = "span";

/// A unit of text that is independently indexed and retrieved.
///
/// - `id`: point identifier derived from `text` (see [`content::point_id`])
/// - `text`: the payload that is embedded and tokenized
/// - `tags`: provenance such as `file_id`, `page` and `span`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tags: Tags,
}

impl TextUnit {
    pub fn new(text: impl Into<String>) -> Self { Self::with_tags(text, Tags::new()) }

    pub fn with_tags(text: impl Into<String>, tags: Tags) -> Self {
        let text = text.into();
        Self { id: content::point_id(&text), text, tags }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn file_id(&self) -> Option<&str> { self.tags.get(FILE_ID_TAG).and_then(Value::as_str) }

    pub fn page(&self) -> Option<u32> {
        self.tags.get(PAGE_TAG).and_then(Value::as_u64).and_then(|p| u32::try_from(p).ok())
    }

    /// `[start, end]` character offsets within the source document.
    pub fn span(&self) -> Option<(usize, usize)> {
        let pair = self.tags.get(SPAN_TAG)?.as_array()?;
        match pair.as_slice() {
            [start, end] => Some((usize::try_from(start.as_u64()?).ok()?, usize::try_from(end.as_u64()?).ok()?)),
            _ => None,
        }
    }
}

/// Indicates which sub-index produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Semantic,
    Lexical,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Lexical => f.write_str("lexical"),
        }
    }
}

/// A candidate returned by one sub-index for one query. Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub unit: TextUnit,
    pub score: f64,
    pub source: Source,
}

/// A unit after rank fusion. `rank` is 1-based and dense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedResult {
    pub unit: TextUnit,
    pub rank: usize,
    pub fused_score: f64,
    pub semantic_score: Option<f64>,
    pub lexical_score: Option<f64>,
}

/// Which sub-indices a query consults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Semantic,
    Lexical,
    #[default]
    Hybrid,
}

impl FromStr for RetrievalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "lexical" => Ok(Self::Lexical),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(Error::invalid("retrieval mode", s)),
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Lexical => f.write_str("lexical"),
            Self::Hybrid => f.write_str("hybrid"),
        }
    }
}

/// Bounds for graph expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphParams {
    /// Max neighbours kept per entity.
    pub neighbors: usize,
    /// Traversal depth in hops.
    pub depth: usize,
}

impl Default for GraphParams {
    fn default() -> Self { Self { neighbors: 5, depth: 1 } }
}

impl GraphParams {
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(Error::invalid("graph neighbors", "0"));
        }
        if self.depth == 0 {
            return Err(Error::invalid("graph depth", "0"));
        }
        Ok(())
    }
}

/// Nodes and edges reachable from one entity, as reported by a graph backend.
///
/// `nodes` excludes the entity itself and is ordered closest hop first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// Graph context attached to a query response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphContext {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<(String, String)>,
}

impl GraphContext {
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
}

/// Persisted mapping from an uploaded file's digest to its ingestion job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub content_hash: String,
    pub job_id: String,
}

/// One span of text produced by a document parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpan {
    pub text: String,
    pub page: Option<u32>,
    /// Character offsets of `text` within the whole document.
    pub span: Option<(usize, usize)>,
}

/// Payload stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    #[serde(default)]
    pub tags: Tags,
    /// Full content digest of `text`.
    pub hash: String,
}

impl PointPayload {
    pub fn into_unit(self, id: String) -> TextUnit { TextUnit { id, text: self.text, tags: self.tags } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// A point returned by a nearest-neighbour search, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub payload: PointPayload,
    /// Store-specific similarity; only its order is meaningful.
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_id_follows_text() {
        let a = TextUnit::new("alpha beta").tag(FILE_ID_TAG, "f1");
        let b = TextUnit::new("alpha beta").tag(FILE_ID_TAG, "f2");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), content::POINT_ID_LEN);
    }

    #[test]
    fn provenance_accessors() {
        let unit = TextUnit::new("x").tag(FILE_ID_TAG, "job-1").tag(PAGE_TAG, 3).tag(SPAN_TAG, json!([4, 9]));
        assert_eq!(unit.file_id(), Some("job-1"));
        assert_eq!(unit.page(), Some(3));
        assert_eq!(unit.span(), Some((4, 9)));
        assert_eq!(TextUnit::new("y").span(), None);
    }

    #[test]
    fn mode_parsing_rejects_unknown() {
        assert_eq!("Hybrid".parse::<RetrievalMode>().ok(), Some(RetrievalMode::Hybrid));
        assert_eq!("lexical".parse::<RetrievalMode>().ok(), Some(RetrievalMode::Lexical));
        let err = "fuzzy".parse::<RetrievalMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { what: "retrieval mode", .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn graph_params_defaults_and_validation() {
        let params = GraphParams::default();
        assert_eq!((params.neighbors, params.depth), (5, 1));
        assert!(params.validate().is_ok());
        assert!(GraphParams { neighbors: 0, depth: 1 }.validate().is_err());
        assert!(GraphParams { neighbors: 1, depth: 0 }.validate().is_err());
    }
}
