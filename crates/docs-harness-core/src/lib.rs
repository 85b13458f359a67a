//! # Docs Harness Core
//!
//! Shared, I/O-free logic for Docs Harness: document normalization,
//! canonical identity, heading-bounded chunking, lexical scoring and
//! ranking, confidence signals, and the storage abstraction.
//!
//! This crate contains no tokio runtime, filesystem, or network access.
//! Every function here operates on in-memory data; the calling
//! application reads files, owns configuration, and persists results.
//!
//! ## Pipeline
//!
//! ```text
//! file ─▶ normalize ─▶ (frontmatter, first heading, text) ─▶ chunk ─▶ Store
//!   └───▶ identity (canonical id, route, hash)                          │
//!                                                                       ▼
//! query ─▶ tokenize ─▶ rank (score per passage) ─▶ top-K ─▶ confidence
//! ```

pub mod anchor;
pub mod chunk;
pub mod confidence;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod search;
pub mod store;
pub mod tokenize;
