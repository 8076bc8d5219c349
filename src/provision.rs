//! Provisioning orchestrator — template + existing labels → new firewall.
//!
//! DESIGN
//! ======
//! One `provision` call runs a fixed pipeline:
//!
//! ```text
//! progress(0)
//!   ├── fetch_templates ─┐   (fetch_template(slug) when a slug is preferred)
//!   └── fetch_existing  ─┴─ join
//! progress(50)
//!   allocate label
//! progress(80)
//!   create firewall
//! ```
//!
//! The two fetches have no ordering dependency and are joined; the first
//! failure aborts the attempt. Creation is the final step, so a failure
//! anywhere earlier leaves nothing behind on the account. Progress values
//! are fixed milestones, not a measure of remaining work.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::{
    ApiError, CreateFirewallPayload, ExistingResourceSource, Firewall, FirewallTemplate, ResourceCreator,
    TemplateSource,
};
use crate::error::ErrorCode;
use crate::label::{self, DEFAULT_MAX_LABEL_LENGTH, LabelError};

pub const PROGRESS_STARTED: u8 = 0;
pub const PROGRESS_FETCHED: u8 = 50;
pub const PROGRESS_LABELED: u8 = 80;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    #[error("No firewall templates are available.")]
    NoTemplatesAvailable,

    #[error("Firewall template '{0}' is not available.")]
    TemplateNotFound(String),

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ErrorCode for ProvisionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoTemplatesAvailable => "E_NO_TEMPLATES",
            Self::TemplateNotFound(_) => "E_TEMPLATE_NOT_FOUND",
            Self::Label(e) => e.error_code(),
            Self::Api(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            // A template may be published later.
            Self::NoTemplatesAvailable | Self::TemplateNotFound(_) => true,
            Self::Label(e) => e.retryable(),
            Self::Api(e) => e.retryable(),
        }
    }
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Preferred template slug. `None` takes the first template returned.
    pub template_slug: Option<String>,
    pub max_label_length: usize,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self { template_slug: None, max_label_length: DEFAULT_MAX_LABEL_LENGTH }
    }
}

/// Composes the three API adapters into a single provisioning operation.
#[derive(Clone)]
pub struct Provisioner {
    templates: Arc<dyn TemplateSource>,
    existing: Arc<dyn ExistingResourceSource>,
    creator: Arc<dyn ResourceCreator>,
    options: ProvisionOptions,
}

impl Provisioner {
    #[must_use]
    pub fn new(
        templates: Arc<dyn TemplateSource>,
        existing: Arc<dyn ExistingResourceSource>,
        creator: Arc<dyn ResourceCreator>,
    ) -> Self {
        Self { templates, existing, creator, options: ProvisionOptions::default() }
    }

    /// Build from a single client implementing all three adapters.
    #[must_use]
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: TemplateSource + ExistingResourceSource + ResourceCreator + 'static,
    {
        Self::new(client.clone(), client.clone(), client)
    }

    #[must_use]
    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    /// Run one provisioning attempt, reporting milestones through `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any step, unchanged.
    pub async fn provision<F>(&self, on_progress: F) -> Result<Firewall, ProvisionError>
    where
        F: Fn(u8) + Send + Sync,
    {
        let result = self.run(&on_progress).await;
        if let Err(e) = &result {
            warn!(error = %e, code = e.error_code(), "provision: attempt failed");
        }
        result
    }

    async fn run<F>(&self, on_progress: &F) -> Result<Firewall, ProvisionError>
    where
        F: Fn(u8) + Send + Sync,
    {
        on_progress(PROGRESS_STARTED);

        let (template, existing) = match self.options.template_slug.as_deref() {
            Some(slug) => {
                let (found, existing) =
                    tokio::try_join!(self.templates.fetch_template(slug), self.existing.fetch_existing())?;
                let template = found.ok_or_else(|| ProvisionError::TemplateNotFound(slug.to_string()))?;
                (template, existing)
            }
            None => {
                let (templates, existing) =
                    tokio::try_join!(self.templates.fetch_templates(), self.existing.fetch_existing())?;
                debug!(templates = templates.len(), "provision: templates listed");
                (first_template(templates)?, existing)
            }
        };
        debug!(slug = %template.slug, existing = existing.len(), "provision: sources fetched");
        on_progress(PROGRESS_FETCHED);

        let taken: HashSet<String> = existing.into_iter().map(|fw| fw.label).collect();
        let label = label::allocate(&template.slug, &taken, self.options.max_label_length)?;
        info!(slug = %template.slug, %label, "provision: label allocated");
        on_progress(PROGRESS_LABELED);

        let payload = CreateFirewallPayload { label, rules: template.rules };
        let firewall = self.creator.create(&payload).await?;
        info!(id = firewall.id, label = %firewall.label, "provision: firewall created");

        Ok(firewall)
    }
}

/// The first template the source returned.
fn first_template(templates: Vec<FirewallTemplate>) -> Result<FirewallTemplate, ProvisionError> {
    templates.into_iter().next().ok_or(ProvisionError::NoTemplatesAvailable)
}

#[cfg(test)]
#[path = "provision_test.rs"]
mod tests;
