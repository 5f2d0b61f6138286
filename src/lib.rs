pub mod api;
pub mod config;
pub mod dates;
pub mod error;
pub mod export;
pub mod jobs;

pub use api::{ApiClient, Paginator, TokenManager};
pub use config::Config;
pub use error::{Error, Result};
pub use jobs::{JobKind, RunOptions};
