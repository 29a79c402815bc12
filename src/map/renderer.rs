use crate::braille::BrailleCanvas;
use crate::choropleth::ChoroplethPass;
use crate::data::{Polygon, Record};
use crate::map::geometry::{draw_line, fill_rings};
use crate::map::projection::Viewport;
use rgb::RGB8;

/// Flat fill for records without a value
pub const NO_DATA_COLOR: RGB8 = RGB8 { r: 200, g: 200, b: 200 };

/// Pixels of lift per elevation-scale step for the highest value
const EXTRUDE_PIXELS_PER_SCALE: f64 = 1.0;

/// Elevation scale limits
pub const MIN_ELEVATION_SCALE: u32 = 1;
pub const MAX_ELEVATION_SCALE: u32 = 100;

/// Polygons smaller than this (in pixels) are not outlined, so the
/// outline cannot erase the whole fill
const MIN_OUTLINED_EXTENT: i32 = 5;

/// Wall shading relative to the top face
const WALL_SHADE: f64 = 0.6;

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_3d: bool,
    pub elevation_scale: u32,
    pub show_outlines: bool,
    pub show_no_data: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_3d: false,
            elevation_scale: MIN_ELEVATION_SCALE,
            show_outlines: true,
            show_no_data: true,
        }
    }
}

/// Projected polygon rings in braille pixels
type PixelRings = Vec<Vec<(i32, i32)>>;

/// Renders a choropleth pass into a colored braille canvas
#[derive(Default)]
pub struct MapRenderer {
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the no-data layer, then the colored layer (flat or extruded)
    pub fn render(&self, pass: &ChoroplethPass, width: usize, height: usize, viewport: &Viewport) -> BrailleCanvas {
        let mut canvas = BrailleCanvas::new(width, height);
        let (pw, ph) = canvas.pixel_size();
        let visible = viewport.visible_bounds();

        if self.settings.show_no_data {
            for record in pass.missing.iter().filter_map(|&row| pass.record(row)) {
                if !intersects(record, visible, 0.0) {
                    continue;
                }
                for polygon in &record.polygons {
                    let rings = project_polygon(polygon, viewport, 0);
                    self.draw_face(&mut canvas, &rings, NO_DATA_COLOR, viewport);
                }
            }
        }

        if !self.settings.show_3d {
            for colored in &pass.colored {
                let Some(record) = pass.record(colored.row) else { continue };
                if !intersects(record, visible, 0.0) {
                    continue;
                }
                for polygon in &record.polygons {
                    let rings = project_polygon(polygon, viewport, 0);
                    self.draw_face(&mut canvas, &rings, colored.color, viewport);
                }
            }
            return canvas;
        }

        // Extruded: draw back (north, small y) to front so nearer prisms overlap
        let max_lift = (self.settings.elevation_scale as f64 * EXTRUDE_PIXELS_PER_SCALE).min(ph as f64 / 3.0);
        // Lifted tops may enter the view from below
        let margin = (visible.3 - visible.1) * max_lift / ph.max(1) as f64;
        let mut prisms: Vec<(i32, i32, &Polygon, RGB8)> = Vec::new();
        for colored in &pass.colored {
            let Some(record) = pass.record(colored.row) else { continue };
            if !intersects(record, visible, margin) {
                continue;
            }
            let lift = (normalized(colored.value, pass.value_range) * max_lift).round() as i32;
            for polygon in &record.polygons {
                let base_y = polygon
                    .first()
                    .and_then(|ring| ring.iter().map(|&(_, lat)| lat).reduce(f64::min))
                    .map_or(0, |lat| viewport.project(0.0, lat).1);
                prisms.push((base_y, lift, polygon, colored.color));
            }
        }
        prisms.sort_by_key(|&(base_y, ..)| base_y);

        for (_, lift, polygon, color) in prisms {
            let wall = shade(color, WALL_SHADE);
            for d in 0..lift {
                let rings = project_polygon(polygon, viewport, d);
                fill_rings(&rings, pw as i32, ph as i32, |x, y| canvas.set_pixel_signed(x, y, wall));
            }
            let top = project_polygon(polygon, viewport, lift);
            self.draw_face(&mut canvas, &top, color, viewport);
        }

        canvas
    }

    /// Fill a face and cut its outline out of the fill
    fn draw_face(&self, canvas: &mut BrailleCanvas, rings: &PixelRings, color: RGB8, viewport: &Viewport) {
        let (pw, ph) = canvas.pixel_size();
        fill_rings(rings, pw as i32, ph as i32, |x, y| canvas.set_pixel_signed(x, y, color));

        if !self.settings.show_outlines || !large_enough(rings) {
            return;
        }
        for ring in rings {
            for edge in ring.windows(2) {
                let (x0, y0) = edge[0];
                let (x1, y1) = edge[1];
                if !viewport.line_might_be_visible((x0, y0), (x1, y1)) {
                    continue;
                }
                draw_line(x0, y0, x1, y1, |x, y| canvas.clear_pixel_signed(x, y));
            }
        }
    }

    /// Toggle extruded view
    pub fn toggle_3d(&mut self) {
        self.settings.show_3d = !self.settings.show_3d;
    }

    /// Toggle polygon outlines
    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }

    /// Toggle the no-data layer
    pub fn toggle_no_data(&mut self) {
        self.settings.show_no_data = !self.settings.show_no_data;
    }

    /// Step the elevation scale, clamped to its limits
    pub fn adjust_elevation(&mut self, delta: i32) {
        let next = self.settings.elevation_scale as i64 + delta as i64;
        self.settings.elevation_scale =
            next.clamp(MIN_ELEVATION_SCALE as i64, MAX_ELEVATION_SCALE as i64) as u32;
    }
}

/// Project every ring of a polygon, lifted `lift` pixels upwards
fn project_polygon(polygon: &Polygon, viewport: &Viewport, lift: i32) -> PixelRings {
    polygon
        .iter()
        .map(|ring| {
            let mut out: Vec<(i32, i32)> = Vec::with_capacity(ring.len());
            for &(lon, lat) in ring {
                let (px, py) = viewport.project(lon, lat);
                let p = (px, py - lift);
                if out.last() != Some(&p) {
                    out.push(p);
                }
            }
            out
        })
        .collect()
}

fn large_enough(rings: &PixelRings) -> bool {
    let Some(exterior) = rings.first() else { return false };
    let (min_x, max_x, min_y, max_y) = exterior.iter().fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
    );
    max_x - min_x >= MIN_OUTLINED_EXTENT && max_y - min_y >= MIN_OUTLINED_EXTENT
}

/// Whether a record's bounding box overlaps the visible area (lat margin below)
fn intersects(record: &Record, visible: (f64, f64, f64, f64), lat_margin: f64) -> bool {
    let Some((min_lon, min_lat, max_lon, max_lat)) = record.bbox() else { return false };
    let (west, south, east, north) = visible;
    max_lon >= west && min_lon <= east && max_lat >= south - lat_margin && min_lat <= north
}

/// Position of `value` within the range, in [0, 1]
fn normalized(value: f64, range: Option<(f64, f64)>) -> f64 {
    match range {
        Some((lo, hi)) if hi > lo => ((value - lo) / (hi - lo)).clamp(0.0, 1.0),
        Some(_) => 1.0,
        None => 0.0,
    }
}

fn shade(color: RGB8, factor: f64) -> RGB8 {
    let f = |c: u8| (c as f64 * factor).round() as u8;
    RGB8 {
        r: f(color.r),
        g: f(color.g),
        b: f(color.b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_demo_hex_grid;
    use crate::map::geometry::{bounds, centroid};
    use std::sync::Arc;

    fn pass() -> ChoroplethPass {
        let palette = vec![RGB8 { r: 255, g: 0, b: 0 }, RGB8 { r: 0, g: 0, b: 255 }];
        ChoroplethPass::compute(
            Arc::new(generate_demo_hex_grid()),
            "electricity_kwh",
            palette,
        )
        .unwrap()
    }

    fn fitted_viewport(pass: &ChoroplethPass, width: usize, height: usize) -> Viewport {
        let mut vp = Viewport::world(width * 2, height * 4);
        let records = &pass.records.records;
        vp.fit_bounds(centroid(records).unwrap(), bounds(records).unwrap());
        vp
    }

    fn colors_used(canvas: &BrailleCanvas) -> Vec<RGB8> {
        let mut colors = Vec::new();
        for row in 0..canvas.height() {
            for col in 0..canvas.width() {
                if let Some((_, Some(c))) = canvas.cell_at(col, row) {
                    if !colors.contains(&c) {
                        colors.push(c);
                    }
                }
            }
        }
        colors
    }

    #[test]
    fn test_flat_render_uses_palette_and_no_data_gray() {
        let pass = pass();
        let vp = fitted_viewport(&pass, 120, 60);
        let canvas = MapRenderer::new().render(&pass, 120, 60, &vp);
        let colors = colors_used(&canvas);
        assert!(colors.contains(&RGB8 { r: 255, g: 0, b: 0 }));
        assert!(colors.contains(&RGB8 { r: 0, g: 0, b: 255 }));
        assert!(colors.contains(&NO_DATA_COLOR));
    }

    #[test]
    fn test_hidden_no_data_layer() {
        let pass = pass();
        let vp = fitted_viewport(&pass, 80, 40);
        let mut renderer = MapRenderer::new();
        renderer.toggle_no_data();
        let canvas = renderer.render(&pass, 80, 40, &vp);
        assert!(!colors_used(&canvas).contains(&NO_DATA_COLOR));
    }

    #[test]
    fn test_extruded_render_adds_wall_shade() {
        let pass = pass();
        let vp = fitted_viewport(&pass, 80, 40);
        let mut renderer = MapRenderer::new();
        renderer.toggle_3d();
        renderer.adjust_elevation(40);
        let canvas = renderer.render(&pass, 80, 40, &vp);
        let colors = colors_used(&canvas);
        // Front row walls stay uncovered
        assert!(
            colors.contains(&shade(RGB8 { r: 255, g: 0, b: 0 }, WALL_SHADE))
                || colors.contains(&shade(RGB8 { r: 0, g: 0, b: 255 }, WALL_SHADE))
        );
    }

    #[test]
    fn test_elevation_scale_clamped() {
        let mut renderer = MapRenderer::new();
        renderer.adjust_elevation(-5);
        assert_eq!(renderer.settings.elevation_scale, MIN_ELEVATION_SCALE);
        renderer.adjust_elevation(1000);
        assert_eq!(renderer.settings.elevation_scale, MAX_ELEVATION_SCALE);
    }

    #[test]
    fn test_empty_view_draws_nothing() {
        let pass = pass();
        let vp = Viewport::new(-70.0, -30.0, 1000.0, 160, 160);
        let canvas = MapRenderer::new().render(&pass, 80, 40, &vp);
        assert!(colors_used(&canvas).is_empty());
    }

    #[test]
    fn test_deep_zoom_keeps_fill_and_visible_outlines() {
        let pass = pass();
        let mut vp = fitted_viewport(&pass, 80, 40);
        // A few hexes fill the view; most outline segments lie off-canvas
        let (lon, lat) = centroid(&pass.records.records).unwrap();
        vp = Viewport::new(lon, lat, vp.zoom * 16.0, vp.width, vp.height);
        let canvas = MapRenderer::new().render(&pass, 80, 40, &vp);
        let lit = (0..canvas.height())
            .flat_map(|row| (0..canvas.width()).map(move |col| (col, row)))
            .filter(|&(col, row)| canvas.cell_at(col, row).is_some())
            .count();
        assert_eq!(lit, canvas.width() * canvas.height());
    }

    #[test]
    fn test_normalized() {
        assert_eq!(normalized(5.0, Some((0.0, 10.0))), 0.5);
        assert_eq!(normalized(3.0, Some((3.0, 3.0))), 1.0);
        assert_eq!(normalized(3.0, None), 0.0);
    }
}
