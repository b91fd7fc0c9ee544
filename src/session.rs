//! Scrape session: selector evaluation with fingerprint auto-save and
//! adaptive relocation
//!
//! A session ties one [`FingerprintStore`] to one validated policy. Sessions
//! share nothing with each other; several can run side by side in one
//! process.

use std::sync::Arc;

use dom_snapshot::{DocumentTree, MarkupParser, NodeId, Selector, SelectorEvaluator};
use element_relocator::{
    DefaultCandidateGenerator, Fingerprint, FingerprintExtractor, MatchResult, RelocationError,
    RelocationPolicy, RelocationResolver, ResolvedMatch, SimilarityScorer,
};
use fingerprint_store::{ElementKey, FingerprintStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::config::DriftproofConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Store a fresh fingerprint of a relocated node so the next relocation
    /// starts from the page as it looks now.
    pub reanchor: bool,
    /// Refresh the stored fingerprint whenever the selector still matches in
    /// adaptive mode.
    pub refresh_on_match: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reanchor: true,
            refresh_on_match: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Evaluate the selector, nothing else
    Static,
    /// Evaluate and fingerprint the first match
    AutoSave,
    /// Evaluate; relocate from the stored fingerprint when nothing matches
    Adaptive,
}

impl SelectMode {
    pub fn name(&self) -> &'static str {
        match self {
            SelectMode::Static => "static",
            SelectMode::AutoSave => "auto-save",
            SelectMode::Adaptive => "adaptive",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub nodes: Vec<NodeId>,
    /// Set when `nodes` came from relocation rather than the selector
    pub relocated: Option<ResolvedMatch>,
}

impl Selection {
    fn direct(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            relocated: None,
        }
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_relocated(&self) -> bool {
        self.relocated.is_some()
    }
}

pub struct ScrapeSession {
    id: Uuid,
    store: FingerprintStore,
    policy: RelocationPolicy,
    options: SessionOptions,
    extractor: FingerprintExtractor,
    evaluator: Arc<dyn SelectorEvaluator>,
    resolver: RelocationResolver<DefaultCandidateGenerator>,
}

impl ScrapeSession {
    pub fn new(config: &DriftproofConfig, evaluator: Arc<dyn SelectorEvaluator>) -> Self {
        let extractor = FingerprintExtractor::new(config.extractor.clone());
        let resolver = RelocationResolver::new(
            DefaultCandidateGenerator::new(Arc::clone(&evaluator), extractor.clone()),
            SimilarityScorer::new(extractor.clone()),
        );
        let id = Uuid::new_v4();
        debug!(session = %id, capacity = config.store.capacity, "scrape session created");
        Self {
            id,
            store: FingerprintStore::with_config(&config.store),
            policy: config.policy.clone(),
            options: config.session.clone(),
            extractor,
            evaluator,
            resolver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    pub fn policy(&self) -> &RelocationPolicy {
        &self.policy
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn extractor(&self) -> &FingerprintExtractor {
        &self.extractor
    }

    /// Parser failures come back verbatim as [`RelocationError::ParseInput`].
    pub fn load_document(
        &self,
        parser: &dyn MarkupParser,
        raw: &str,
    ) -> Result<DocumentTree, RelocationError> {
        Ok(parser.parse(raw)?)
    }

    /// Fingerprint `node` (found via `selector`) and store it under `key`.
    pub fn remember(
        &self,
        tree: &DocumentTree,
        key: ElementKey,
        node: NodeId,
        selector: &Selector,
    ) -> Result<Fingerprint, RelocationError> {
        let node_ref = tree.get(node).ok_or(RelocationError::DanglingNode(node))?;
        let fingerprint = self
            .extractor
            .extract_with_selector(node_ref, selector.clone());
        debug!(session = %self.id, key = %key, %node, "fingerprint stored");
        self.store.put(key, fingerprint.clone());
        Ok(fingerprint)
    }

    /// Raw verdict for the fingerprint stored under `key`.
    pub fn locate(
        &self,
        tree: &DocumentTree,
        key: &ElementKey,
    ) -> Result<MatchResult, RelocationError> {
        let fingerprint = self
            .store
            .get(key)
            .ok_or_else(|| RelocationError::UnknownKey(key.to_string()))?;
        Ok(self.resolver.locate(tree, &fingerprint, &self.policy))
    }

    pub fn select(
        &self,
        tree: &DocumentTree,
        key: &ElementKey,
        selector: &Selector,
        mode: SelectMode,
    ) -> Result<Selection, RelocationError> {
        let span = info_span!("select", session = %self.id, key = %key, mode = mode.name());
        let _guard = span.enter();

        let nodes = self.evaluator.evaluate(tree, selector)?;
        match mode {
            SelectMode::Static => Ok(Selection::direct(nodes)),
            SelectMode::AutoSave => {
                if let Some(&first) = nodes.first() {
                    self.remember(tree, key.clone(), first, selector)?;
                }
                Ok(Selection::direct(nodes))
            }
            SelectMode::Adaptive => {
                if let Some(&first) = nodes.first() {
                    if self.options.refresh_on_match {
                        self.remember(tree, key.clone(), first, selector)?;
                    }
                    return Ok(Selection::direct(nodes));
                }
                self.relocate(tree, key, selector)
            }
        }
    }

    fn relocate(
        &self,
        tree: &DocumentTree,
        key: &ElementKey,
        selector: &Selector,
    ) -> Result<Selection, RelocationError> {
        let Some(fingerprint) = self.store.get(key) else {
            debug!(selector = %selector, "selector empty and nothing stored to relocate from");
            return Ok(Selection::default());
        };

        let found = self
            .resolver
            .locate(tree, &fingerprint, &self.policy)
            .into_result()?;
        info!(
            selector = %selector,
            node = %found.node,
            confidence = found.confidence,
            "selector relocated"
        );

        if self.options.reanchor {
            // keep the selector the element was first stored with
            let original = fingerprint.selector().unwrap_or(selector);
            self.remember(tree, key.clone(), found.node, original)?;
        }

        Ok(Selection {
            nodes: vec![found.node],
            relocated: Some(found),
        })
    }
}

impl std::fmt::Debug for ScrapeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeSession")
            .field("id", &self.id)
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("options", &self.options)
            .finish()
    }
}
