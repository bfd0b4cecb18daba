//! core
//!
//! Core domain types and configuration for baseliner.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Group, Project, PushRule, etc.
//! - [`naming`] - Path segment normalization
//! - [`config`] - Baseline definition and configuration loading
//!
//! # Design Principles
//!
//! - Strong typing rejects an invalid baseline before any remote call
//! - Nothing in this layer performs I/O against the platform

pub mod config;
pub mod naming;
pub mod types;
