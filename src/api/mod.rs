pub mod auth;
pub mod client;
pub mod paginator;

pub use auth::TokenManager;
pub use client::ApiClient;
pub use paginator::{FetchOutcome, PageFetch, PageSource, Paginator};
