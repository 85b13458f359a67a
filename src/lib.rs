//! # Docs Harness
//!
//! Ingests a routed documentation corpus and a path-addressed knowledge
//! base, splits them into heading-bounded passages, ranks passages with a
//! deterministic lexical scorer, and reports how confident the top results
//! are.
//!
//! The algorithms live in [`docs_harness_core`]; this crate is the caller
//! side: it reads configuration and files, drives ingestion into a store,
//! and prints results for the `dh` binary.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ Corpus roots│──▶│ prepare + apply  │──▶│ InMemoryStore │
//! │ docs / kb   │   │ normalize, chunk │   │  docs + chunks│
//! └─────────────┘   └──────────────────┘   └──────┬────────┘
//!                                                 │
//!                query ─▶ tokenize ─▶ rank ◀──────┘
//!                                       │
//!                                       ▼
//!                                  confidence
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dh sync                              # ingest and print counts
//! dh search "webhook retries"          # ranked passages + confidence
//! dh chunks app/guides/page.mdx        # inspect one file's chunks
//! dh tokenize '"rate limit" errors'    # show query terms
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`connector_fs`] | Corpus root scanning |
//! | [`ingest`] | Sync orchestration and reporting |
//! | [`search`] | Search and tokenize commands |
//! | [`chunks`] | Single-file chunk inspection |
//! | [`logging`] | Tracing subscriber setup |

pub mod chunks;
pub mod config;
pub mod connector_fs;
pub mod ingest;
pub mod logging;
pub mod search;
