//! Async client for a stack orchestration service.
//!
//! # Overview
//! Authenticates once, then reads cluster topology, teams and stacks, creates
//! and updates stacks, and rewrites the access control attached to a stack.
//!
//! # Design
//! - `StackClient` owns a base URL normalised to the API root, a `Session`
//!   holding the bearer token, and a `Transport` that performs the I/O.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), joined by one internal `send` that
//!   attaches the token and turns every failure into an `ApiError`.
//! - Local types (`types`) and service wire shapes (`wire`) are kept apart;
//!   field names are translated explicitly in both directions.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
mod wire;

pub use client::{Session, StackClient};
pub use config::{ClientConfig, API_ROOT};
pub use error::{
    ApiError, ErrorStatus, Result, DETAILS_PLACEHOLDER, MESSAGE_PLACEHOLDER, STATUS_PLACEHOLDER,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::{
    InputResourceControl, InputStack, PatchStack, ResourceControl, Stack, StackVars, Swarm, Team,
};
