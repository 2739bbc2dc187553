// Chart pipeline DSL parser module

pub mod ast;
pub mod chart;
pub mod labels;
pub mod lexer;
pub mod pipeline;
pub mod stages;

pub use ast::{BarOrder, BarStage, BarY, ChartStage, Labels, PipelineSpec};

use crate::error::{PipelineError, Result};

/// Parse a pipeline description, requiring the whole input to be consumed.
pub fn parse_pipeline(input: &str) -> Result<PipelineSpec> {
    match pipeline::parse_pipeline_spec(input) {
        Ok((_, spec)) => Ok(spec),
        Err(e) => Err(PipelineError::Parse(format!("{:?}", e))),
    }
}
