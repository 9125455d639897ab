//! # cibkit
//!
//! Pure Rust library for reconciling a Pacemaker cluster's CIB.
//!
//! This crate provides functionality for:
//! - Reading the CIB through a cached, explicitly reset snapshot
//! - Listing, creating, updating and removing order and colocation constraints
//! - Reading primitive state, locations and cluster properties
//! - Waiting for the cluster or a primitive to converge, with retries
//! - Reconciling declared constraints and properties as [`declarative`] resources
//!
//! ## Example
//!
//! ```no_run
//! use cibkit::backend::cli::CliRunner;
//! use cibkit::provider::{ConstraintProvider, DeclaredConstraint};
//! use cibkit::{CibStore, ConstraintKind, Options, Score};
//! use std::sync::Arc;
//!
//! let mut store = CibStore::new(Arc::new(CliRunner::new()), Options::default());
//!
//! // What is configured right now
//! for (id, order) in store.all_constraints(ConstraintKind::Order).unwrap() {
//!     println!("{id}: {:?} -> {:?}", order.first, order.second);
//! }
//!
//! // Declare a constraint and write it
//! let declared = DeclaredConstraint::new("vip-before-web", "vip", "webserver", Score::Infinity);
//! let mut provider = ConstraintProvider::new(ConstraintKind::Order, declared);
//! if !provider.exists(&mut store).unwrap() {
//!     provider.create();
//!     provider.flush(&mut store).unwrap();
//! }
//! ```
//!
//! ## Retry Logic
//!
//! Cluster commands fail transiently while the cluster is busy. Every
//! mutation runs inside the retry engine configured by [`Options`], and
//! the [`wait`] module polls convergence predicates the same way.
//!
//! ```no_run
//! use cibkit::backend::cli::CliRunner;
//! use cibkit::{CibStore, Options, wait};
//! use std::sync::Arc;
//!
//! let options = Options { retry_count: 10, retry_step: 2, ..Options::default() };
//! let mut store = CibStore::new(Arc::new(CliRunner::new()), options);
//! if wait::wait_for_start(&mut store, "vip", None).unwrap() {
//!     println!("vip is running");
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod cib;
pub mod constraint;
pub mod error;
pub mod property;
pub mod provider;
pub mod report;
pub mod retry;
pub mod status;
pub mod types;
pub mod wait;
pub mod xml;

pub use cib::{CibStore, Snapshot};
pub use constraint::{ConstraintFields, ConstraintMap};
pub use declarative::Ensure;
pub use error::{Error, ErrorCategory, Result};
pub use status::{ClusterStatus, PrimitiveStatus};
pub use types::{ConstraintKind, Options, RetryPolicy, Score};
