pub mod catalog;
pub mod runner;

pub use catalog::{JobKind, JobSpec};
pub use runner::{run, RunOptions};
