//! Pipeline driver: per-file corpus loop, match collection, Slovenian
//! voicing postprocessing, and the post-loop dispersion/representation/
//! statistics/output passes (spec §5-§6 "Pipeline"), grounded on
//! `original_source/cordex/pipeline/core.py::Pipeline`.

pub mod config;
pub mod pipeline;
pub mod postprocess;

pub use config::PipelineConfig;
pub use pipeline::Pipeline;
