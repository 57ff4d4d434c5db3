use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use ragdb_core::traits::{EntityExtractor, GraphBackend};
use ragdb_core::types::{GraphContext, GraphParams, TextUnit};
use ragdb_core::{Error, Result};

/// Augments a result set with the graph neighbourhood of the entities it
/// mentions. Works against any [`GraphBackend`].
#[derive(Clone)]
pub struct GraphExpander {
    extractor: Arc<dyn EntityExtractor>,
    backend: Arc<dyn GraphBackend>,
}

impl GraphExpander {
    pub fn new(extractor: Arc<dyn EntityExtractor>, backend: Arc<dyn GraphBackend>) -> Self { Self { extractor, backend } }

    /// `Ok(None)` when no extracted entity has a neighbour in the graph.
    pub async fn expand(&self, units: &[TextUnit], params: GraphParams) -> Result<Option<GraphContext>> {
        params.validate()?;
        let mut entities: Vec<String> = Vec::new();
        for unit in units {
            for entity in self.extractor.extract(&unit.text).map_err(|e| Error::collaborator("entity extractor", e))? {
                if !entities.contains(&entity) {
                    entities.push(entity);
                }
            }
        }

        let mut context = GraphContext::default();
        for entity in &entities {
            let Some(hood) = self.backend.neighbors(entity, params.depth).await? else { continue };
            if hood.nodes.is_empty() {
                continue;
            }
            let kept: BTreeSet<&str> =
                hood.nodes.iter().take(params.neighbors).map(String::as_str).chain([entity.as_str()]).collect();
            context.nodes.extend(kept.iter().map(|n| n.to_string()));
            context.edges.extend(
                hood.edges.iter().filter(|(s, t)| kept.contains(s.as_str()) && kept.contains(t.as_str())).cloned(),
            );
        }
        debug!(entities = entities.len(), nodes = context.nodes.len(), edges = context.edges.len(), "graph expansion");
        Ok((!context.is_empty()).then_some(context))
    }
}
