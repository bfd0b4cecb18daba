//! platform
//!
//! Abstraction over the hosting service's resource API.
//!
//! # Architecture
//!
//! The `Platform` trait defines one method per resource operation the
//! reconciler needs. Commands use the [`create_platform`] factory function
//! rather than constructing an implementation directly.
//!
//! - Every operation is a single remote call; no local state is kept
//! - "Not found" is an ordinary result that drives create-vs-update
//! - Failures are scoped to the resource they concern
//!
//! # Modules
//!
//! - `traits`: Core `Platform` trait and request/response types
//! - [`gitlab`]: GitLab implementation over the REST v4 API
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: URL normalization and client creation
//!
//! # Example
//!
//! ```ignore
//! use baseliner::platform::{create_platform, Platform};
//!
//! let platform = create_platform("https://gitlab.example.com", &token)?;
//! let session = platform.authenticate().await?;
//! let groups = platform.find_groups("team").await?;
//! ```

mod factory;
pub mod gitlab;
pub mod mock;
mod traits;

pub use factory::{api_base_from_url, create_platform};
pub use traits::*;
