use crate::csv_reader;
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::record::{Record, Schema};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Where a chart's data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Stdin,
    /// CSV text already in memory
    Inline(String),
}

impl Source {
    fn describe(&self) -> String {
        match self {
            Source::Path(p) => p.display().to_string(),
            Source::Stdin => "<stdin>".to_string(),
            Source::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// Fetch and parse a source into a raw table.
///
/// Files ending in `.json` are read as a JSON array of objects; everything
/// else is CSV with a header row.
pub fn fetch(source: &Source) -> Result<Table> {
    fetch_cancellable(source, None)
}

fn fetch_cancellable(source: &Source, abort: Option<&AtomicBool>) -> Result<Table> {
    let table = match source {
        Source::Path(path) if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) => {
            let file = File::open(path)?;
            let value: serde_json::Value = serde_json::from_reader(io::BufReader::new(file))?;
            Table::from_json(&value)?
        }
        Source::Path(path) => csv_reader::read_csv_cancellable(File::open(path)?, abort)?,
        Source::Stdin => csv_reader::read_csv_cancellable(io::stdin().lock(), abort)?,
        Source::Inline(text) => csv_reader::read_csv_cancellable(text.as_bytes(), abort)?,
    };
    debug!(source = %source.describe(), rows = table.rows.len(), "fetched table");
    Ok(table)
}

/// Fetch a source and coerce it through `schema`.
pub fn load(source: &Source, schema: &Schema) -> Result<Vec<Record>> {
    let table = fetch(source)?;
    Ok(schema.coerce(&table))
}

/// A fetch running on a background thread.
///
/// Dropping the task (or calling [`LoadTask::cancel`]) raises the abort flag;
/// the reader stops at the next record boundary and the result is discarded.
pub struct LoadTask {
    abort: Arc<AtomicBool>,
    rx: Receiver<Result<Table>>,
    handle: Option<JoinHandle<()>>,
}

impl LoadTask {
    pub fn spawn(source: Source) -> Self {
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let flag = Arc::clone(&abort);

        let handle = thread::spawn(move || {
            let result = fetch_cancellable(&source, Some(&flag));
            if flag.load(Ordering::Relaxed) {
                debug!(source = %source.describe(), "load finished after cancellation; dropping result");
                return;
            }
            // Receiver gone means the owner was torn down.
            let _ = tx.send(result);
        });

        Self { abort, rx, handle: Some(handle) }
    }

    pub fn cancel(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Non-blocking check. `None` while the load is still running.
    pub fn try_take(&mut self) -> Option<Result<Table>> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(PipelineError::Cancelled))
            }
        }
    }

    /// Block until the load completes.
    pub fn wait(mut self) -> Result<Table> {
        let result = self.rx.recv().unwrap_or(Err(PipelineError::Cancelled));
        self.join();
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("load thread panicked");
            }
        }
    }
}

impl Drop for LoadTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldSpec;
    use std::io::Write;

    #[test]
    fn test_load_inline() {
        let source = Source::Inline("color,sellingprice\nred,10\nblue,x\n".into());
        let schema = Schema::new(vec![FieldSpec::category("color"), FieldSpec::number("sellingprice")]);
        let records = load(&source, &schema).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"color": "red", "sellingprice": 5}}]"#).unwrap();
        let table = fetch(&Source::Path(file.path().to_path_buf())).unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_missing_file_surfaces_error() {
        let result = fetch(&Source::Path("/no/such/file.csv".into()));
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_task_wait() {
        let task = LoadTask::spawn(Source::Inline("a,b\n1,2\n".into()));
        let table = task.wait().unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
    }

    #[test]
    fn test_cancelled_task_reports_cancelled() {
        let big: String = std::iter::once("a\n".to_string())
            .chain((0..50_000).map(|i| format!("{}\n", i)))
            .collect();
        let task = LoadTask::spawn(Source::Inline(big));
        task.cancel();
        assert!(task.is_cancelled());
        assert!(matches!(task.wait(), Err(PipelineError::Cancelled)));
    }
}
