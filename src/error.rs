use thiserror::Error;

/// Errors surfaced by the load/normalize/aggregate/render pipeline.
///
/// Row-level invalidity and allow-list rejection are not errors: those rows
/// are dropped silently. Only whole-chart failures end up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read data source: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid JSON table: {0}")]
    JsonShape(String),
    #[error("pipeline parse error: {0}")]
    Parse(String),
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("load cancelled")]
    Cancelled,
    #[error("no data to render")]
    EmptyData,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
