//! # Knowledge Garden
//!
//! A local, single-user keyword search over exported AI-assistant chat
//! histories.
//!
//! An export file (JSON, in any of several shapes the platform has used over
//! the years) is normalized into a flat, ordered corpus of
//! [`CanonicalMessage`](models::CanonicalMessage)s. Every query is a linear,
//! case-insensitive, all-terms-must-match scan of that corpus.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │    loader    │──▶│    export    │──▶│   session    │
//! │ file → text  │   │ extract +    │   │ corpus +     │
//! └──────────────┘   │ normalize    │   │ history      │
//!                    └──────────────┘   └──────┬───────┘
//!                                              │
//!                    ┌──────────────┐   ┌──────▼───────┐
//!                    │   debounce   │──▶│    search    │──▶ render
//!                    │ (kg shell)   │   │ + filters    │
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! kg load conversations.json           # normalize and report counts
//! kg search conversations.json "borrow checker"
//! kg search conversations.json rust --speaker assistant --format html
//! kg recent conversations.json --limit 5
//! kg shell conversations.json          # live search, one query per line
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Canonical message and speaker types |
//! | [`fields`] | Candidate field lists and presence rules for raw JSON |
//! | [`extract`] | Locating a conversation's messages in any layout |
//! | [`normalize`] | One raw message → canonical message |
//! | [`export`] | Whole-file normalization |
//! | [`traits`] | `Normalizer` trait and registry |
//! | [`loader`] | Reading export files as text |
//! | [`search`] | Keyword matching and filters |
//! | [`session`] | Corpus ownership, search history, guidance |
//! | [`debounce`] | Latest-wins scheduling for live search |
//! | [`render`] | Text, HTML and JSON output |
//! | [`stats`] | Corpus statistics |
//! | [`summary`] | Per-conversation summaries |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Library error types |

pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod extract;
pub mod fields;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod render;
pub mod search;
pub mod session;
pub mod stats;
pub mod summary;
pub mod traits;
