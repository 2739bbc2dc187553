// Several charts sharing one selection bridge

use crate::error::{PipelineError, Result};
use crate::loader::Source;
use crate::pipeline::ChartPipeline;
use crate::presets;
use crate::selection::SelectionBridge;
use crate::view::{ChartView, Status};
use crate::RenderOptions;
use serde::Deserialize;
use std::cell::{Ref, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{info, warn};

/// How a chart takes part in cross-chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Standalone,
    /// Clicks on this chart set the shared selection
    Producer,
    /// Redraws with the shared selection applied
    Consumer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    pub id: String,
    /// Data file, relative to the config file
    pub source: PathBuf,
    /// Inline pipeline description
    #[serde(default)]
    pub pipeline: Option<String>,
    /// Name of a built-in pipeline; used when `pipeline` is absent
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Overrides the dashboard-wide render options
    #[serde(default)]
    pub render: Option<RenderOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub render: RenderOptions,
    pub charts: Vec<ChartConfig>,
}

impl DashboardConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

struct Entry {
    id: String,
    role: Role,
    source: Source,
    view: Rc<RefCell<ChartView>>,
}

/// Owns every chart and the selection bridge between them.
///
/// A chart that fails to load or compute is marked failed; its siblings are
/// unaffected.
pub struct Dashboard {
    charts: Vec<Entry>,
    bridge: SelectionBridge,
}

impl Dashboard {
    /// Build every chart. Pipeline and config errors are fatal; data errors are not.
    pub fn from_config(config: DashboardConfig, base_dir: &Path) -> Result<Self> {
        let mut bridge = SelectionBridge::new();
        let mut charts = Vec::with_capacity(config.charts.len());

        for chart in config.charts {
            if charts.iter().any(|e: &Entry| e.id == chart.id) {
                return Err(PipelineError::Config(format!("duplicate chart id '{}'", chart.id)));
            }
            let pipeline = match (&chart.pipeline, &chart.preset) {
                (Some(dsl), _) => ChartPipeline::from_dsl(dsl)?,
                (None, Some(name)) => presets::pipeline(name)?,
                (None, None) => {
                    return Err(PipelineError::Config(format!(
                        "chart '{}' needs a pipeline or a preset",
                        chart.id
                    )))
                }
            };
            if chart.role == Role::Consumer && pipeline.select_field().is_none() {
                return Err(PipelineError::Config(format!(
                    "consumer chart '{}' has no select(...) stage",
                    chart.id
                )));
            }

            let options = chart.render.unwrap_or_else(|| config.render.clone());
            let view = Rc::new(RefCell::new(ChartView::new(pipeline, options)));
            if chart.role == Role::Consumer {
                let consumer = Rc::clone(&view);
                bridge.subscribe(move |selection| {
                    consumer.borrow_mut().observe_selection(selection);
                });
            }

            charts.push(Entry {
                id: chart.id,
                role: chart.role,
                source: Source::Path(base_dir.join(&chart.source)),
                view,
            });
        }

        Ok(Self { charts, bridge })
    }

    /// Read a JSON config; sources resolve against its directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let config = DashboardConfig::from_path(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_config(config, base)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.charts.iter().map(|e| e.id.as_str())
    }

    pub fn view(&self, id: &str) -> Option<Ref<'_, ChartView>> {
        self.entry(id).map(|e| e.view.borrow())
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.charts.iter().find(|e| e.id == id)
    }

    /// Start every chart's load in the background.
    pub fn start(&mut self) {
        for entry in &self.charts {
            entry.view.borrow_mut().load(entry.source.clone());
        }
    }

    /// Block until every load has finished.
    pub fn wait(&mut self) {
        for entry in &self.charts {
            entry.view.borrow_mut().wait_load();
            match entry.view.borrow().status() {
                Status::Failed(msg) => warn!("chart '{}' failed: {}", entry.id, msg),
                status => info!("chart '{}' is {:?}", entry.id, status),
            }
        }
    }

    pub fn selection(&self) -> Option<&str> {
        self.bridge.current()
    }

    /// Toggle the shared selection. Consumers observe the new value first,
    /// then redraw.
    pub fn select(&mut self, category: &str) -> Option<String> {
        let selection = self.bridge.click(category).map(str::to_string);
        self.redraw_consumers();
        selection
    }

    pub fn clear_selection(&mut self) {
        self.bridge.clear();
        self.redraw_consumers();
    }

    /// Hit-test a producer chart and toggle the category under the pointer.
    ///
    /// Returns the category clicked, or `None` when the pointer is not over
    /// one or the chart is not a producer.
    pub fn click(&mut self, id: &str, x: i32, y: i32) -> Option<String> {
        let entry = self.entry(id)?;
        if entry.role != Role::Producer {
            return None;
        }
        let category = entry.view.borrow().on_click(x, y)?.to_string();
        self.select(&category);
        Some(category)
    }

    fn redraw_consumers(&mut self) {
        for entry in self.charts.iter().filter(|e| e.role == Role::Consumer) {
            entry.view.borrow_mut().redraw_if_stale();
        }
    }

    /// Write each drawn frame to `dir/<id>.<ext>`. Charts without a frame are skipped.
    pub fn write_frames(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for entry in &self.charts {
            let view = entry.view.borrow();
            let Some(frame) = view.frame() else {
                warn!("chart '{}' has nothing to write ({:?})", entry.id, view.status());
                continue;
            };
            let path = dir.join(format!("{}.{}", entry.id, frame.format.extension()));
            fs::write(&path, &frame.bytes)?;
            written.push(path);
        }
        Ok(written)
    }

    /// One line per chart: id, role, status.
    pub fn summary(&self) -> Vec<(String, Role, Status)> {
        self.charts
            .iter()
            .map(|e| (e.id.clone(), e.role, e.view.borrow().status().clone()))
            .collect()
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("charts", &self.charts.iter().map(|e| e.id.as_str()).collect::<Vec<_>>())
            .field("bridge", &self.bridge)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartBody;
    use std::io::Write;

    const CARS: &str = "year,make,body,color,sellingprice\n\
        2014,Kia,SUV,white,10000\n\
        2015,BMW,Sedan,black,30000\n\
        2014,Kia,Sedan,white,20000\n";

    fn fixture(config: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = fs::File::create(dir.path().join("cars.csv")).unwrap();
        csv.write_all(CARS.as_bytes()).unwrap();
        let config_path = dir.path().join("dashboard.json");
        fs::write(&config_path, config).unwrap();
        (dir, config_path)
    }

    const CONFIG: &str = r#"{
        "render": { "width": 400, "height": 300, "type": "svg" },
        "charts": [
            { "id": "bar", "source": "cars.csv", "preset": "price-by-color", "role": "producer" },
            { "id": "heat", "source": "cars.csv", "preset": "make-body-heatmap", "role": "consumer" },
            { "id": "broken", "source": "missing.csv", "pipeline": "fields(color: text) | bar(x: color)" }
        ]
    }"#;

    fn total_cells(dashboard: &Dashboard) -> u64 {
        let view = dashboard.view("heat").unwrap();
        match &view.snapshot().unwrap().body {
            ChartBody::Heatmap(grid) => grid.cells.iter().filter_map(|c| c.value.count()).sum(),
            other => panic!("Expected heatmap, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_is_isolated() {
        let (_dir, path) = fixture(CONFIG);
        let mut dashboard = Dashboard::from_path(&path).unwrap();
        dashboard.start();
        dashboard.wait();

        let summary = dashboard.summary();
        assert_eq!(summary[0].2, Status::Ready);
        assert_eq!(summary[1].2, Status::Ready);
        assert!(matches!(summary[2].2, Status::Failed(_)));
    }

    #[test]
    fn test_click_producer_filters_consumer() {
        let (_dir, path) = fixture(CONFIG);
        let mut dashboard = Dashboard::from_path(&path).unwrap();
        dashboard.start();
        dashboard.wait();
        assert_eq!(total_cells(&dashboard), 3);

        // Ranked by mean price: black first
        let region = dashboard.view("bar").unwrap().frame().unwrap().regions[0].clone();
        let clicked = dashboard.click("bar", region.x0 + 1, region.y1 - 1);
        assert_eq!(clicked.as_deref(), Some("black"));
        assert_eq!(dashboard.selection(), Some("black"));
        assert_eq!(total_cells(&dashboard), 1);

        // Same bar again clears
        dashboard.click("bar", region.x0 + 1, region.y1 - 1);
        assert_eq!(dashboard.selection(), None);
        assert_eq!(total_cells(&dashboard), 3);
    }

    #[test]
    fn test_consumer_click_is_ignored() {
        let (_dir, path) = fixture(CONFIG);
        let mut dashboard = Dashboard::from_path(&path).unwrap();
        dashboard.start();
        dashboard.wait();
        assert_eq!(dashboard.click("heat", 200, 150), None);
        assert_eq!(dashboard.selection(), None);
    }

    #[test]
    fn test_write_frames_skips_failed() {
        let (dir, path) = fixture(CONFIG);
        let mut dashboard = Dashboard::from_path(&path).unwrap();
        dashboard.start();
        dashboard.wait();
        let written = dashboard.write_frames(&dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[0].ends_with("bar.svg"));
    }

    #[test]
    fn test_consumer_without_select_rejected() {
        let config = r#"{ "charts": [
            { "id": "a", "source": "cars.csv", "pipeline": "fields(color: text) | bar(x: color)", "role": "consumer" }
        ] }"#;
        let (_dir, path) = fixture(config);
        assert!(matches!(Dashboard::from_path(&path), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config = r#"{ "charts": [
            { "id": "a", "source": "cars.csv", "preset": "price-scatter" },
            { "id": "a", "source": "cars.csv", "preset": "price-scatter" }
        ] }"#;
        let (_dir, path) = fixture(config);
        assert!(matches!(Dashboard::from_path(&path), Err(PipelineError::Config(_))));
    }
}
