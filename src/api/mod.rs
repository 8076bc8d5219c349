//! Firewall API — adapter traits and the HTTP implementation.
//!
//! DESIGN
//! ======
//! The provisioning workflow only ever talks to three narrow async traits:
//! list (or look up) templates, list existing firewalls, create a firewall. `ApiClient`
//! implements all three over the REST API; tests substitute in-memory
//! mocks. Adapters never retry on their own; retry is a user action.

pub mod client;
pub mod config;
pub mod types;

pub use client::ApiClient;
pub use types::{ApiError, CreateFirewallPayload, Firewall, FirewallRules, FirewallTemplate};

// =============================================================================
// ADAPTER TRAITS
// =============================================================================

/// Source of available firewall templates.
#[async_trait::async_trait]
pub trait TemplateSource: Send + Sync {
    /// Fetch every template the account can use.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the response is malformed.
    async fn fetch_templates(&self) -> Result<Vec<FirewallTemplate>, ApiError>;

    /// Look up one template by slug; `Ok(None)` when no such template exists.
    ///
    /// The default scans [`fetch_templates`](Self::fetch_templates); sources
    /// with a by-slug endpoint should override it.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the response is malformed.
    async fn fetch_template(&self, slug: &str) -> Result<Option<FirewallTemplate>, ApiError> {
        Ok(self.fetch_templates().await?.into_iter().find(|t| t.slug == slug))
    }
}

/// Source of already-provisioned firewalls, used for label collisions.
#[async_trait::async_trait]
pub trait ExistingResourceSource: Send + Sync {
    /// Fetch every firewall on the account.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or the response is malformed.
    async fn fetch_existing(&self) -> Result<Vec<Firewall>, ApiError>;
}

/// Creates a firewall from a resolved label and rule set.
#[async_trait::async_trait]
pub trait ResourceCreator: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the API rejects the payload or is unreachable.
    async fn create(&self, payload: &CreateFirewallPayload) -> Result<Firewall, ApiError>;
}
