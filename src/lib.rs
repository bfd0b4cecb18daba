//! baseliner - Reconcile GitLab groups and projects against a declared baseline
//!
//! baseliner is a single-binary tool that brings a set of projects under one
//! group in line with a desired state: the group exists, every project exists,
//! each project has the managed branches, the chosen default branch, a push
//! rule, merge settings and protected-branch rules.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, assembles config, delegates to engine)
//! - [`engine`] - Group resolution, project reconciliation and per-project configuration
//! - [`core`] - Domain types, name normalization and the baseline definition
//! - [`platform`] - Abstraction over the hosting platform (GitLab REST v4, in-memory mock)
//! - [`ui`] - Prompts and output rendering
//!
//! # Guarantees
//!
//! 1. Nothing is written to the platform before the token is verified
//! 2. Existing projects are only modified with confirmation
//! 3. Re-running against an already-reconciled project issues no writes
//! 4. A failure in one project never stops the others

pub mod cli;
pub mod core;
pub mod engine;
pub mod platform;
pub mod ui;
