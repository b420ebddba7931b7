//! Notification router
//!
//! Fans records out to registered listeners:
//! - **Key index:** listeners register for record keys (or the wildcard) per domain
//! - **Tiers:** lower tiers finish before higher tiers start; `Delayed` runs last
//! - **Subsets:** each listener receives only its keys unless subset mode is off
//! - **Nesting:** embedded records are dispatched at the same tier, depth-first

mod config;
mod core;
mod definition;
mod error;
mod owner;
mod record;
mod registration;
mod registry;
mod tier;

pub use config::RouterConfig;
pub use core::{DispatchReport, Router, RouterMetrics, UnregisterFilter};
pub use definition::{ListenerDefinition, ListenerFile};
pub use error::RouterError;
pub use owner::{OwnerHandle, OwnerId};
pub use record::{FieldSet, Record};
pub use registration::{Delivery, Handler, KeySelector, Listener, ListenerId, Registration};
pub use tier::Tier;
