//! Local report API
//!
//! - `rest`: router and handlers
//! - `server`: listener lifecycle
//! - `client`: one-shot client for the query modes

pub mod client;
pub mod rest;
pub mod server;

pub use client::{normalize_body, ReportClient, ReportKind};
pub use rest::RestRouter;
pub use server::ApiServer;
