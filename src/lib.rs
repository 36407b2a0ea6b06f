//! # Policy MCP
//!
//! Retrieval layer for policy documents stored in a Qdrant collection.
//!
//! A natural-language query is embedded, turned into a filtered similarity
//! search against the vector index, and the loosely-typed results are
//! normalized into a stable [`models::PolicyChunk`] shape. Callers (an MCP
//! tool server and a debug HTTP surface) only ever see `search` and
//! `get_by_id`, so churn in the backend's API across versions stays
//! contained in [`invoker`] and [`backend`].
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────┐   ┌──────────────┐
//!   │ MCP tools│   │ /debug HTTP  │
//!   └────┬─────┘   └──────┬───────┘
//!        └───────┬────────┘
//!                ▼
//!         ┌────────────┐
//!         │ Repository │
//!         └─────┬──────┘
//!   ┌───────────┼────────────┬──────────────┐
//!   ▼           ▼            ▼              ▼
//! Embedder  FilterBuilder  SearchInvoker  Normalizer
//! (OpenAI)                 (Qdrant REST)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-driven configuration |
//! | [`error`] | Error taxonomy |
//! | [`models`] | `PolicyChunk`, `PointId`, `SearchRequest`, responses |
//! | [`embedding`] | Embedder trait and OpenAI implementation |
//! | [`filter`] | Facets → conjunctive backend filter |
//! | [`backend`] | Vector backend trait, Qdrant REST and in-memory backends |
//! | [`invoker`] | Version-tolerant search strategies |
//! | [`normalize`] | Raw record → `PolicyChunk` |
//! | [`repository`] | Composition root |
//! | [`mcp`] | MCP tool server |
//! | [`server`] | Debug HTTP server + MCP mount |

pub mod backend;
pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod invoker;
pub mod mcp;
pub mod models;
pub mod normalize;
pub mod repository;
pub mod server;
