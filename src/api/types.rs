//! Firewall API types — templates, rules, firewalls, and errors.
//!
//! Rule sets are carried verbatim from a template into the create payload,
//! so they round-trip through serde without interpretation.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by the firewall API adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("{0}")]
    Network(String),

    /// The API answered with a non-success status. `message` is the first
    /// reason from the error body, shown to the user as-is.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A success response body could not be deserialized.
    #[error("unexpected API response: {0}")]
    Decode(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Api { .. } => "E_API",
            Self::Decode(_) => "E_API_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api { .. })
    }
}

/// Error body returned by the API on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorReason {
    pub reason: String,
    #[serde(default)]
    pub field: Option<String>,
}

// =============================================================================
// RULES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    Accept,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleProtocol {
    Tcp,
    Udp,
    Icmp,
    Ipencap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<Vec<String>>,
}

/// A single inbound or outbound rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub action: RuleAction,
    pub protocol: RuleProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<RuleAddresses>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Complete rule set of a firewall or template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRules {
    #[serde(default)]
    pub inbound: Vec<FirewallRule>,
    #[serde(default)]
    pub outbound: Vec<FirewallRule>,
    pub inbound_policy: RuleAction,
    pub outbound_policy: RuleAction,
}

impl Default for FirewallRules {
    fn default() -> Self {
        Self {
            inbound: Vec::new(),
            outbound: Vec::new(),
            inbound_policy: RuleAction::Drop,
            outbound_policy: RuleAction::Accept,
        }
    }
}

// =============================================================================
// TEMPLATES AND FIREWALLS
// =============================================================================

/// Server-provided blueprint used to seed a new firewall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallTemplate {
    pub slug: String,
    pub rules: FirewallRules,
}

/// A provisioned firewall. Only `label` matters for allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub rules: Option<FirewallRules>,
}

/// Body of the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateFirewallPayload {
    pub label: String,
    pub rules: FirewallRules,
}

/// One page of a paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub pages: u32,
    #[serde(default)]
    pub results: u32,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
