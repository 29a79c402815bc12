use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use tui_choropleth::choropleth::ChoroplethPass;
use tui_choropleth::data::{self, generate_demo_hex_grid, GeometryCache, RecordSet};
use tui_choropleth::map::geometry::{bounds, centroid};
use tui_choropleth::map::{FeatureGrid, MapRenderer, Viewport};
use tui_choropleth::palette;

/// Bucket count limits
pub const MIN_COLORS: usize = 2;
pub const MAX_COLORS: usize = 20;
pub const DEFAULT_COLORS: usize = 8;

/// Width of the legend column in terminal cells
pub const LEGEND_WIDTH: u16 = 24;

/// Cache key for the generated demo grid
const DEMO_KEY: &str = "<demo>";

/// Where a dataset comes from
#[derive(Clone, Debug)]
pub enum DatasetSource {
    File(PathBuf),
    Demo,
}

#[derive(Clone, Debug)]
pub struct Dataset {
    pub name: String,
    pub source: DatasetSource,
}

impl Dataset {
    pub fn demo() -> Self {
        Self {
            name: "demo hex".to_string(),
            source: DatasetSource::Demo,
        }
    }

    fn cache_key(&self) -> &Path {
        match &self.source {
            DatasetSource::File(path) => path,
            DatasetSource::Demo => Path::new(DEMO_KEY),
        }
    }
}

/// User selections that drive a rendering pass
#[derive(Clone, Debug)]
pub struct Controls {
    pub dataset: usize,
    pub attribute: Option<String>,
    pub palette: usize,
    pub n_colors: usize,
    pub show_palettes: bool,
}

/// What the mouse is hovering over
pub struct Tooltip {
    pub attribute: String,
    pub value: Option<f64>,
    pub bucket: Option<usize>,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub cache: GeometryCache,
    pub datasets: Vec<Dataset>,
    pub palettes: Vec<&'static str>,
    pub controls: Controls,
    /// Attributes offered for the current dataset
    pub columns: Vec<String>,
    /// Current pass; rebuilt on every interaction
    pub pass: Option<ChoroplethPass>,
    hit_grid: Option<FeatureGrid>,
    /// Last error or notice for the status line
    pub status: Option<String>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
}

/// Map pixel size for a terminal size.
/// Rows: 1 control line, 2 border, 1 help line. Columns: 2 border plus legend.
fn map_pixel_size(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2 + LEGEND_WIDTH as usize);
    let inner_height = height.saturating_sub(4);
    // Braille gives 2x4 resolution per character
    (inner_width * 2, inner_height * 4)
}

/// Terminal cell to map braille pixel (map inner area starts at column 1, row 2)
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(2) as i32) * 4;
    (px, py)
}

impl App {
    pub fn new(width: usize, height: usize, datasets: Vec<Dataset>, controls: Controls) -> Self {
        let (pixel_width, pixel_height) = map_pixel_size(width, height);
        let datasets = if datasets.is_empty() {
            vec![Dataset::demo()]
        } else {
            datasets
        };

        let mut app = Self {
            viewport: Viewport::world(pixel_width, pixel_height),
            map_renderer: MapRenderer::new(),
            cache: GeometryCache::new(),
            datasets,
            palettes: palette::list_palettes(),
            controls,
            columns: Vec::new(),
            pass: None,
            hit_grid: None,
            status: None,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
        };
        app.select_dataset(app.controls.dataset.min(app.datasets.len() - 1));
        app
    }

    pub fn dataset(&self) -> &Dataset {
        &self.datasets[self.controls.dataset]
    }

    pub fn palette_name(&self) -> &'static str {
        self.palettes[self.controls.palette]
    }

    fn records(&mut self) -> Result<Arc<RecordSet>> {
        let dataset = self.datasets[self.controls.dataset].clone();
        let key = dataset.cache_key().to_path_buf();
        let set = match &dataset.source {
            DatasetSource::File(path) => self
                .cache
                .get_or_load(path)
                .with_context(|| format!("loading dataset '{}'", dataset.name))?,
            DatasetSource::Demo => self
                .cache
                .get_or_try_insert_with(&key, || Ok(generate_demo_hex_grid()))?,
        };
        Ok(set)
    }

    /// Switch to a dataset, keeping the attribute when it exists there too
    pub fn select_dataset(&mut self, index: usize) {
        self.controls.dataset = index;
        self.pass = None;
        self.hit_grid = None;
        self.columns.clear();

        let set = match self.records() {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "dataset unavailable");
                self.status = Some(format!("{:#}", e));
                return;
            }
        };

        self.columns = data::data_columns(&set.schema);
        let keep = self
            .controls
            .attribute
            .as_ref()
            .is_some_and(|a| self.columns.contains(a));
        if !keep {
            self.controls.attribute = self.columns.first().cloned();
        }
        self.hit_grid = Some(FeatureGrid::build(&set));
        info!(
            dataset = %self.dataset().name,
            records = set.len(),
            columns = self.columns.len(),
            "selected dataset"
        );

        self.recompute();
        self.fit_view();
    }

    /// Rebuild the choropleth pass from the current controls
    pub fn recompute(&mut self) {
        match self.build_pass() {
            Ok(pass) => {
                self.pass = Some(pass);
                self.status = None;
            }
            Err(e) => {
                warn!(error = %e, "could not build choropleth pass");
                self.pass = None;
                self.status = Some(format!("{:#}", e));
            }
        }
    }

    fn build_pass(&mut self) -> Result<ChoroplethPass> {
        let attribute = self
            .controls
            .attribute
            .clone()
            .ok_or_else(|| anyhow!("dataset '{}' has no numeric attributes", self.dataset().name))?;
        let set = self.records()?;
        let colors = palette::get_rgb_palette(self.palette_name(), self.controls.n_colors)?;
        let pass = ChoroplethPass::compute(set, &attribute, colors)?;
        Ok(pass)
    }

    /// Center on the colored layer and zoom to fit it
    pub fn fit_view(&mut self) {
        let Some(pass) = &self.pass else { return };
        let rows = || pass.colored.iter().filter_map(|c| pass.record(c.row));
        let fitted = centroid(rows()).zip(bounds(rows()));
        let fallback = || {
            let all = &pass.records.records;
            centroid(all).zip(bounds(all))
        };
        if let Some((center, bbox)) = fitted.or_else(fallback) {
            self.viewport.fit_bounds(center, bbox);
        }
    }

    /// Drop the cached copy of the current dataset and load it again
    pub fn reload(&mut self) {
        let key = self.dataset().cache_key().to_path_buf();
        self.cache.invalidate(&key);
        self.select_dataset(self.controls.dataset);
    }

    pub fn cycle_dataset(&mut self, step: isize) {
        let next = cycle(self.controls.dataset, self.datasets.len(), step);
        if next != self.controls.dataset {
            self.select_dataset(next);
        }
    }

    pub fn cycle_attribute(&mut self, step: isize) {
        if self.columns.is_empty() {
            return;
        }
        let current = self
            .controls
            .attribute
            .as_ref()
            .and_then(|a| self.columns.iter().position(|c| c == a))
            .unwrap_or(0);
        let next = cycle(current, self.columns.len(), step);
        self.controls.attribute = Some(self.columns[next].clone());
        self.recompute();
    }

    pub fn cycle_palette(&mut self, step: isize) {
        self.controls.palette = cycle(self.controls.palette, self.palettes.len(), step);
        self.recompute();
    }

    pub fn adjust_colors(&mut self, delta: isize) {
        let n = (self.controls.n_colors as isize + delta).clamp(MIN_COLORS as isize, MAX_COLORS as isize);
        if n as usize != self.controls.n_colors {
            self.controls.n_colors = n as usize;
            self.recompute();
        }
    }

    pub fn toggle_3d(&mut self) {
        self.map_renderer.toggle_3d();
    }

    pub fn adjust_elevation(&mut self, delta: i32) {
        self.map_renderer.adjust_elevation(delta);
    }

    pub fn toggle_palette_preview(&mut self) {
        self.controls.show_palettes = !self.controls.show_palettes;
    }

    /// Legend title: underscores to spaces, each word capitalized
    pub fn legend_title(&self) -> String {
        self.controls
            .attribute
            .as_deref()
            .map(title_case)
            .unwrap_or_default()
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = map_pixel_size(width, height);
        self.viewport.width = pixel_width;
        self.viewport.height = pixel_height;
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    /// Zoom in
    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    /// Zoom out
    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.0}x", self.viewport.zoom)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.3}°{}, {:.3}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }

    /// Record under the mouse cursor, if any
    pub fn tooltip(&self) -> Option<Tooltip> {
        let pass = self.pass.as_ref()?;
        let grid = self.hit_grid.as_ref()?;
        let (col, row) = self.mouse_pos?;
        if col < 1 || row < 2 {
            return None;
        }
        let (px, py) = cell_to_pixel(col, row);
        if px >= self.viewport.width as i32 || py >= self.viewport.height as i32 {
            return None;
        }

        // Probe the middle of the character cell
        let (lon, lat) = self.viewport.unproject(px + 1, py + 2);
        let hit = grid.hit_test(&pass.records, lon, lat)?;
        let colored = pass.colored_for_row(hit);
        if colored.is_none() && !self.map_renderer.settings.show_no_data {
            return None;
        }
        Some(Tooltip {
            attribute: pass.attribute.clone(),
            value: colored.map(|c| c.value),
            bucket: colored.map(|c| c.bucket),
        })
    }
}

fn cycle(current: usize, len: usize, step: isize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + step).rem_euclid(len as isize) as usize
}

fn title_case(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Parse a `--dataset` argument: `name=path` or a bare path named by its stem
pub fn parse_dataset(arg: &str) -> Result<Dataset> {
    let (name, path) = match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() => (name.to_string(), PathBuf::from(path)),
        _ => {
            let path = PathBuf::from(arg);
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("dataset path has no file name")?
                .to_string();
            (name, path)
        }
    };
    Ok(Dataset {
        name,
        source: DatasetSource::File(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls() -> Controls {
        Controls {
            dataset: 0,
            attribute: None,
            palette: 0,
            n_colors: DEFAULT_COLORS,
            show_palettes: false,
        }
    }

    fn demo_app() -> App {
        App::new(120, 50, Vec::new(), controls())
    }

    #[test]
    fn test_demo_app_starts_with_pass() {
        let app = demo_app();
        let pass = app.pass.as_ref().unwrap();
        assert_eq!(pass.palette.len(), DEFAULT_COLORS);
        assert_eq!(app.controls.attribute.as_deref(), Some("electricity_kwh"));
        assert!(!app.columns.contains(&"hex_id".to_string()));
        assert!(app.viewport.zoom > 10.0);
    }

    #[test]
    fn test_colors_clamped() {
        let mut app = demo_app();
        app.adjust_colors(100);
        assert_eq!(app.controls.n_colors, MAX_COLORS);
        assert_eq!(app.pass.as_ref().unwrap().palette.len(), MAX_COLORS);
        app.adjust_colors(-100);
        assert_eq!(app.controls.n_colors, MIN_COLORS);
    }

    #[test]
    fn test_cycle_attribute_wraps() {
        let mut app = demo_app();
        let first = app.controls.attribute.clone();
        for _ in 0..app.columns.len() {
            app.cycle_attribute(1);
        }
        assert_eq!(app.controls.attribute, first);
        app.cycle_attribute(-1);
        assert_eq!(app.controls.attribute.as_ref(), app.columns.last());
    }

    #[test]
    fn test_cache_reused_across_passes() {
        let mut app = demo_app();
        app.cycle_palette(1);
        app.adjust_colors(1);
        assert_eq!(app.cache.len(), 1);
        app.reload();
        assert_eq!(app.cache.len(), 1);
        assert!(app.pass.is_some());
    }

    #[test]
    fn test_missing_file_reports_status() {
        let datasets = vec![parse_dataset("/nonexistent/dong.geojson").unwrap(), Dataset::demo()];
        let mut app = App::new(120, 50, datasets, controls());
        assert!(app.pass.is_none());
        assert!(app.status.as_deref().unwrap().contains("dong"));
        app.cycle_dataset(1);
        assert!(app.pass.is_some());
        assert!(app.status.is_none());
    }

    #[test]
    fn test_tooltip_at_map_center() {
        let mut app = demo_app();
        let (w, h) = (app.viewport.width as u16, app.viewport.height as u16);
        // Center pixel back to a terminal cell
        app.set_mouse_pos(w / 4 + 1, h / 8 + 2);
        let tip = app.tooltip().unwrap();
        assert_eq!(tip.attribute, "electricity_kwh");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("usage_per_household"), "Usage Per Household");
        assert_eq!(title_case("KWH"), "Kwh");
    }

    #[test]
    fn test_parse_dataset() {
        let d = parse_dataset("hex=data/dataset_hex.geojson").unwrap();
        assert_eq!(d.name, "hex");
        let d = parse_dataset("data/dataset.geojson").unwrap();
        assert_eq!(d.name, "dataset");
    }
}
