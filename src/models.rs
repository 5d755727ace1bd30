//! Model selection.
//!
//! A session talks to exactly one [`ModelTarget`] at a time.  Catalog
//! identifiers are checked against what the chat engine needs before they
//! are accepted; opaque references (inference profiles, deployment ARNs and
//! the like) are taken as given.

use std::fmt;
use std::sync::Arc;

use crate::chat::InputSource;
use crate::error::{Error, Result};
use crate::observability::SESSION_MODEL_SWAPS;
use crate::render::Renderer;
use crate::service::ModelCatalog;
use crate::types::{ModelInfo, ModelListParams};

/// Page size used when browsing the catalog.
const BROWSE_PAGE_SIZE: u32 = 20;

/// Upper bound on catalog pages fetched for one browse.
const BROWSE_MAX_PAGES: usize = 10;

/// Something a model must support to be used for chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Produces text output.
    TextOutput,
    /// Streams its response.
    Streaming,
}

impl Capability {
    /// Every capability a chat model needs.
    pub const REQUIRED: [Capability; 2] = [Capability::TextOutput, Capability::Streaming];

    /// True when `model` advertises this capability.
    pub fn satisfied_by(&self, model: &ModelInfo) -> bool {
        match self {
            Capability::TextOutput => model.outputs_text(),
            Capability::Streaming => model.supports_streaming(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::TextOutput => write!(f, "text output"),
            Capability::Streaming => write!(f, "response streaming"),
        }
    }
}

/// The model requests are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelTarget {
    /// A catalog identifier that passed capability validation.
    Catalog(String),
    /// An opaque reference accepted without validation.
    Reference(String),
}

impl ModelTarget {
    /// Wraps a catalog identifier.
    pub fn catalog(id: impl Into<String>) -> Self {
        ModelTarget::Catalog(id.into())
    }

    /// Wraps an opaque reference.
    pub fn reference(reference: impl Into<String>) -> Self {
        ModelTarget::Reference(reference.into())
    }

    /// The identifier sent on the wire.
    pub fn model_id(&self) -> &str {
        match self {
            ModelTarget::Catalog(id) => id,
            ModelTarget::Reference(reference) => reference,
        }
    }

    /// True for opaque references.
    pub fn is_reference(&self) -> bool {
        matches!(self, ModelTarget::Reference(_))
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTarget::Catalog(id) => write!(f, "{id}"),
            ModelTarget::Reference(reference) => write!(f, "{reference} (reference)"),
        }
    }
}

/// Checks the first unmet requirement, if any.
pub fn check_capabilities(model: &ModelInfo) -> Result<()> {
    match Capability::REQUIRED
        .iter()
        .find(|capability| !capability.satisfied_by(model))
    {
        Some(missing) => Err(Error::capability(&model.id, *missing)),
        None => Ok(()),
    }
}

/// Resolves, validates and swaps the active model.
pub struct ModelSelector {
    catalog: Arc<dyn ModelCatalog>,
    active: ModelTarget,
}

impl ModelSelector {
    /// Creates a selector with an already-resolved target.
    pub fn new(catalog: Arc<dyn ModelCatalog>, active: ModelTarget) -> Self {
        Self { catalog, active }
    }

    /// Resolves the configured identifiers and builds a selector for them.
    pub async fn resolve(
        catalog: Arc<dyn ModelCatalog>,
        catalog_id: &str,
        opaque_ref: Option<&str>,
    ) -> Result<Self> {
        let active = validate_and_resolve(catalog.as_ref(), catalog_id, opaque_ref).await?;
        Ok(Self::new(catalog, active))
    }

    /// The target every request goes to.
    pub fn active(&self) -> &ModelTarget {
        &self.active
    }

    /// Validates a candidate against the catalog this selector uses.
    pub async fn validate_and_resolve(
        &self,
        catalog_id: &str,
        opaque_ref: Option<&str>,
    ) -> Result<ModelTarget> {
        validate_and_resolve(self.catalog.as_ref(), catalog_id, opaque_ref).await
    }

    /// Replaces the active target.  The transcript is untouched.
    pub fn swap(&mut self, target: ModelTarget) {
        if target != self.active {
            tracing::info!(from = %self.active, to = %target, "switching model");
            SESSION_MODEL_SWAPS.click();
        }
        self.active = target;
    }

    /// Lists the models usable for chat, following catalog pages.
    pub async fn usable_models(&self) -> Result<Vec<ModelInfo>> {
        let mut usable = Vec::new();
        let mut params = ModelListParams::new().with_limit(BROWSE_PAGE_SIZE);
        for _ in 0..BROWSE_MAX_PAGES {
            let page = self.catalog.list_models(Some(params.clone())).await?;
            usable.extend(
                page.models()
                    .iter()
                    .filter(|model| check_capabilities(model).is_ok())
                    .cloned(),
            );
            match page.last_id() {
                Some(last) if page.has_more() => {
                    params = ModelListParams::new()
                        .with_limit(BROWSE_PAGE_SIZE)
                        .with_after_id(last);
                }
                _ => break,
            }
        }
        Ok(usable)
    }

    /// Lists usable models, lets the user pick one and swaps to it.
    ///
    /// Returns the new target, or `None` when the selection was blank,
    /// out of range, or the input ended.
    pub async fn browse(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<ModelTarget>> {
        let models = self.usable_models().await?;
        if models.is_empty() {
            renderer.info("No models in the catalog support streaming text output.");
            return Ok(None);
        }

        renderer.info(&format!("Current model: {}", self.active));
        for (i, model) in models.iter().enumerate() {
            renderer.info(&format!("  {:>2}. {} ({})", i + 1, model.display_name, model.id));
        }

        let Some(line) = input.read_line("Select a model (blank to keep current): ")? else {
            return Ok(None);
        };
        let choice = line.trim();
        if choice.is_empty() {
            return Ok(None);
        }
        let picked = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| models.get(i));
        match picked {
            Some(model) => {
                let target = ModelTarget::catalog(&model.id);
                self.swap(target.clone());
                renderer.info(&format!("Model changed to: {}", model.id));
                Ok(Some(target))
            }
            None => {
                renderer.info(&format!("No model numbered {choice}; keeping {}", self.active));
                Ok(None)
            }
        }
    }
}

/// Resolves configured identifiers into a target.
///
/// A non-empty opaque reference wins and is accepted without a catalog
/// call.  Otherwise the catalog identifier must be non-empty and name a model
/// that produces text and streams.
pub async fn validate_and_resolve(
    catalog: &dyn ModelCatalog,
    catalog_id: &str,
    opaque_ref: Option<&str>,
) -> Result<ModelTarget> {
    if let Some(reference) = opaque_ref.map(str::trim).filter(|r| !r.is_empty()) {
        return Ok(ModelTarget::reference(reference));
    }
    let catalog_id = catalog_id.trim();
    if catalog_id.is_empty() {
        return Err(Error::validation(
            "a model identifier is required",
            Some("model".to_string()),
        ));
    }
    let info = catalog.get_model(catalog_id).await?;
    check_capabilities(&info)?;
    Ok(ModelTarget::catalog(catalog_id))
}
