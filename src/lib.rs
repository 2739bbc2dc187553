// Library exports for chartpipe

pub mod csv_reader;
pub mod data;
pub mod error;
pub mod loader;
pub mod record;

// Pipeline stages
pub mod aggregate;
pub mod chart;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod presets;
pub mod stack;

// Drawing and interaction
pub mod dashboard;
pub mod debounce;
pub mod palette;
pub mod render;
pub mod scale;
pub mod selection;
pub mod view;

pub use error::{PipelineError, Result};
pub use pipeline::ChartPipeline;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}
