//! Product add-ons.
//!
//! Contains add-on definitions, the raw form values submitted with an
//! add-to-cart, and the priced selections that end up on cart lines.

mod config;
mod definition;
mod resolve;
mod selection;

pub use config::{config_fingerprint, config_to_wire, AddonConfig, AddonConfigValue};
pub use definition::{AddonDefinition, AddonKind, AddonOption, AddonPrice, ProductAddons};
pub use resolve::resolve_selections;
pub use selection::AddonSelection;
