pub mod config;
pub mod crs;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod reproject;
pub mod template;
pub mod workspace;

pub use pipeline::{ConversionPipeline, ConversionRequest, ConversionResult};
