use crate::chart::{ChartBody, ChartData};
use crate::data::Table;
use crate::debounce::Debouncer;
use crate::error::PipelineError;
use crate::loader::{LoadTask, Source};
use crate::pipeline::ChartPipeline;
use crate::render::{render, Rendered};
use crate::RenderOptions;
use std::time::Instant;
use tracing::{debug, warn};

/// Readiness of one chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// No data yet; nothing is drawn
    Pending,
    Ready,
    /// Load or pipeline failure; nothing is drawn and the message is shown instead
    Failed(String),
}

/// Mutable state for one chart: data, snapshot, last frame, viewport.
///
/// Every change recomputes the snapshot and redraws from scratch.
pub struct ChartView {
    pipeline: ChartPipeline,
    options: RenderOptions,
    status: Status,
    table: Option<Table>,
    snapshot: Option<ChartData>,
    frame: Option<Rendered>,
    selection: Option<String>,
    year_window: Option<(f64, f64)>,
    resize: Debouncer<(u32, u32)>,
    load: Option<LoadTask>,
    stale: bool,
}

impl ChartView {
    pub fn new(pipeline: ChartPipeline, options: RenderOptions) -> Self {
        Self {
            pipeline,
            options,
            status: Status::Pending,
            table: None,
            snapshot: None,
            frame: None,
            selection: None,
            year_window: None,
            resize: Debouncer::default(),
            load: None,
            stale: false,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn snapshot(&self) -> Option<&ChartData> {
        self.snapshot.as_ref()
    }

    /// Last drawn frame. `None` while pending, failed, or when there is nothing to draw.
    pub fn frame(&self) -> Option<&Rendered> {
        self.frame.as_ref()
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.options.width, self.options.height)
    }

    pub fn pipeline(&self) -> &ChartPipeline {
        &self.pipeline
    }

    /// Start loading `source` in the background. A load already in flight is cancelled.
    pub fn load(&mut self, source: Source) {
        if let Some(previous) = self.load.take() {
            previous.cancel();
        }
        self.status = Status::Pending;
        self.load = Some(LoadTask::spawn(source));
    }

    pub fn is_loading(&self) -> bool {
        self.load.is_some()
    }

    /// Pick up a finished background load. Returns true when the view changed.
    pub fn poll_load(&mut self) -> bool {
        let Some(task) = self.load.as_mut() else {
            return false;
        };
        match task.try_take() {
            None => false,
            Some(result) => {
                self.load = None;
                self.finish_load(result);
                true
            }
        }
    }

    /// Block until the background load finishes.
    pub fn wait_load(&mut self) {
        if let Some(task) = self.load.take() {
            self.finish_load(task.wait());
        }
    }

    fn finish_load(&mut self, result: crate::error::Result<Table>) {
        match result {
            Ok(table) => self.set_table(table),
            Err(e) => {
                warn!("chart data failed to load: {}", e);
                self.fail(e.to_string());
            }
        }
    }

    pub fn set_table(&mut self, table: Table) {
        self.table = Some(table);
        self.refresh();
    }

    /// Store a new selection without redrawing. Returns true when a redraw is due.
    ///
    /// Charts that do not filter on a selection ignore it.
    pub fn observe_selection(&mut self, selection: Option<&str>) -> bool {
        let selection = selection.map(str::to_string);
        if self.selection == selection {
            return false;
        }
        self.selection = selection;
        if self.pipeline.select_field().is_some() {
            self.stale = true;
        }
        self.stale
    }

    pub fn set_selection(&mut self, selection: Option<&str>) {
        if self.observe_selection(selection) {
            self.refresh();
        }
    }

    /// Redraw if an observed selection has not been drawn yet.
    pub fn redraw_if_stale(&mut self) -> bool {
        if !self.stale {
            return false;
        }
        self.refresh();
        true
    }

    /// Narrow the x domain of a stream chart. Other charts ignore it.
    pub fn set_year_window(&mut self, window: Option<(f64, f64)>) {
        self.year_window = window;
        self.refresh();
    }

    /// Record a resize; the redraw happens in [`ChartView::tick`] once resizing settles.
    pub fn resize(&mut self, width: u32, height: u32, now: Instant) {
        self.resize.push((width, height), now);
    }

    /// Apply a settled resize. Returns true when the view was redrawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.resize.poll(now) {
            Some((width, height)) if (width, height) != self.viewport() => {
                self.options.width = width;
                self.options.height = height;
                self.refresh();
                true
            }
            _ => false,
        }
    }

    /// Category under a pixel of the current frame.
    pub fn on_click(&self, x: i32, y: i32) -> Option<&str> {
        if self.status != Status::Ready {
            return None;
        }
        self.frame.as_ref()?.hit(x, y).map(|r| r.category())
    }

    fn fail(&mut self, message: String) {
        self.status = Status::Failed(message);
        self.snapshot = None;
        self.frame = None;
    }

    /// Recompute the snapshot and redraw. Failures never leave a partial frame.
    fn refresh(&mut self) {
        self.stale = false;
        let Some(table) = &self.table else {
            return;
        };

        let data = match self.pipeline.run(table, self.selection.as_deref()) {
            Ok(data) => data,
            Err(e) => return self.fail(e.to_string()),
        };
        let data = match (self.year_window, data) {
            (Some((lo, hi)), ChartData { labels, selected, body: ChartBody::Stream(stream) }) => ChartData {
                labels,
                selected,
                body: ChartBody::Stream(stream.with_window(lo, hi)),
            },
            (_, data) => data,
        };

        match render(&data, &self.options) {
            Ok(frame) => self.frame = Some(frame),
            Err(PipelineError::EmptyData) => {
                debug!("nothing to draw for {} chart", data.kind());
                self.frame = None;
            }
            Err(e) => return self.fail(e.to_string()),
        }
        self.snapshot = Some(data);
        self.status = Status::Ready;
    }
}

impl std::fmt::Debug for ChartView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartView")
            .field("status", &self.status)
            .field("viewport", &self.viewport())
            .field("selection", &self.selection)
            .field("loading", &self.load.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::read_csv_from_reader;
    use crate::OutputFormat;
    use std::time::Duration;

    const CARS: &str = "year,make,body,color,sellingprice\n\
        2014,Kia,SUV,white,10000\n\
        2015,BMW,Sedan,black,30000\n\
        2014,Kia,Sedan,white,20000\n";

    fn options() -> RenderOptions {
        RenderOptions { width: 400, height: 300, format: OutputFormat::Svg }
    }

    fn bar_view() -> ChartView {
        let pipeline = ChartPipeline::from_dsl("fields(color: text) | bar(x: color)").unwrap();
        ChartView::new(pipeline, options())
    }

    #[test]
    fn test_pending_until_data() {
        let mut view = bar_view();
        assert_eq!(view.status(), &Status::Pending);
        assert!(view.frame().is_none());
        assert_eq!(view.on_click(10, 10), None);

        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        assert_eq!(view.status(), &Status::Ready);
        assert!(view.frame().is_some());
    }

    #[test]
    fn test_click_hits_current_frame() {
        let mut view = bar_view();
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        let region = view.frame().unwrap().regions[1].clone();
        assert_eq!(view.on_click(region.x0 + 1, region.y1 - 1), Some("black"));
    }

    #[test]
    fn test_failed_load_renders_nothing() {
        let mut view = bar_view();
        view.load(Source::Path("/no/such/cars.csv".into()));
        view.wait_load();
        assert!(matches!(view.status(), Status::Failed(_)));
        assert!(view.frame().is_none());
        assert!(view.snapshot().is_none());
    }

    #[test]
    fn test_background_load() {
        let mut view = bar_view();
        view.load(Source::Inline(CARS.to_string()));
        assert!(view.is_loading());
        view.wait_load();
        assert!(!view.is_loading());
        assert_eq!(view.status(), &Status::Ready);
    }

    #[test]
    fn test_resize_is_debounced() {
        let mut view = bar_view();
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        let start = Instant::now();
        view.resize(500, 300, start);
        view.resize(640, 480, start + Duration::from_millis(100));
        assert!(!view.tick(start + Duration::from_millis(150)));
        assert_eq!(view.viewport(), (400, 300));
        assert!(view.tick(start + Duration::from_millis(300)));
        assert_eq!(view.viewport(), (640, 480));
    }

    #[test]
    fn test_selection_refilters_consumer() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(make: text, body: text, color: text) | select(color) | heatmap(x: make, y: body)",
        )
        .unwrap();
        let mut view = ChartView::new(pipeline, options());
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        view.set_selection(Some("black"));
        assert_eq!(view.snapshot().unwrap().selected.as_deref(), Some("black"));
        view.set_selection(None);
        assert_eq!(view.snapshot().unwrap().selected, None);
    }

    #[test]
    fn test_year_window() {
        let pipeline =
            ChartPipeline::from_dsl("fields(color: text, year: number) | stream(series: color, x: year)").unwrap();
        let mut view = ChartView::new(pipeline, options());
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        view.set_year_window(Some((2015.0, 2030.0)));
        match &view.snapshot().unwrap().body {
            ChartBody::Stream(s) => assert_eq!(s.window, Some((2015.0, 2015.0))),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_year_window_beyond_data_shows_everything() {
        let pipeline =
            ChartPipeline::from_dsl("fields(color: text, year: number) | stream(series: color, x: year)").unwrap();
        let mut view = ChartView::new(pipeline, options());
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        view.set_year_window(Some((2020.0, 2030.0)));
        match &view.snapshot().unwrap().body {
            ChartBody::Stream(s) => assert_eq!(s.window, Some((2014.0, 2015.0))),
            other => panic!("Expected stream, got {:?}", other),
        }
        assert!(view.frame().is_some());
    }

    #[test]
    fn test_empty_chart_is_ready_without_frame() {
        let pipeline = ChartPipeline::from_dsl("fields(transmission: text) | bar(x: transmission)").unwrap();
        let mut view = ChartView::new(pipeline, options());
        view.set_table(read_csv_from_reader(CARS.as_bytes()).unwrap());
        assert_eq!(view.status(), &Status::Ready);
        assert!(view.frame().is_none());
    }
}
