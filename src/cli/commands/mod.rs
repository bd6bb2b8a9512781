//! CLI command implementations.

mod ask;
mod build;
mod serve;

pub use ask::run_ask;
pub use build::run_build;
pub use serve::{router, run_serve};
