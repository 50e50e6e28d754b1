pub mod clean;
pub mod config;
pub mod error;
pub mod frame;
pub mod loader;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod postprocess;
pub mod quality;
pub mod schema;
pub mod transform;

pub use config::PipelineConfig;
pub use error::{EtlError, Result};
pub use pipeline::{run, PipelineOutput};
