//! fwgen — generate a Cloud Firewall from a server-provided template.
//!
//! DESIGN
//! ======
//! Layers, leaves first:
//! - `label`: pure unique-label allocation.
//! - `api`: adapter traits plus the REST client and its config.
//! - `provision`: joins the two fetches, allocates, creates.
//! - `dialog`: the `Prompt → Progress → Success | Error` state machine
//!   a UI renders from.

pub mod api;
pub mod dialog;
pub mod error;
pub mod label;
pub mod provision;

#[cfg(test)]
pub mod test_helpers;

pub use dialog::{DialogCallbacks, DialogController, DialogError, DialogKind, DialogState};
pub use error::ErrorCode;
pub use provision::{ProvisionError, ProvisionOptions, Provisioner};
