use std::f64::consts::PI;

/// Zoom limits; 65536 matches web map zoom level 16
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 65536.0;

/// Latitude limit of Web Mercator
const MAX_LAT: f64 = 85.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

/// Normalized Web Mercator y in [0, 1] (0 = north)
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Center on a point and pick the largest zoom that shows the whole box
    pub fn fit_bounds(&mut self, center: (f64, f64), bounds: (f64, f64, f64, f64)) {
        let (min_lon, min_lat, max_lon, max_lat) = bounds;
        self.center_lon = center.0;
        self.center_lat = center.1.clamp(-MAX_LAT, MAX_LAT);

        let span_x = (mercator_x(max_lon) - mercator_x(min_lon)).abs();
        let span_y = (mercator_y(min_lat) - mercator_y(max_lat)).abs();
        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;

        // Leave a margin and account for the center not being the box middle
        let half_x = (mercator_x(center.0) - mercator_x(min_lon))
            .abs()
            .max((mercator_x(max_lon) - mercator_x(center.0)).abs())
            .max(span_x / 2.0);
        let half_y = (mercator_y(center.1) - mercator_y(max_lat))
            .abs()
            .max((mercator_y(min_lat) - mercator_y(center.1)).abs())
            .max(span_y / 2.0);

        // scale = zoom * width pixels per normalized unit
        let zoom_x = if half_x > 0.0 { 0.5 / half_x } else { MAX_ZOOM };
        let zoom_y = if half_y > 0.0 { height / (2.0 * width * half_y) } else { MAX_ZOOM };
        self.zoom = (zoom_x.min(zoom_y) * 0.9).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (lon, lat) = self.unproject(self.width as i32 / 2 + dx, self.height as i32 / 2 + dy);
        self.center_lon = lon;
        self.center_lat = lat;

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-MAX_LAT, MAX_LAT);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the mouse
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Calculate where that point would now project to
        let (new_px, new_py) = self.project(lon, lat);

        // Pan to bring it back under the mouse
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let center_x = mercator_x(self.center_lon);
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let lon = x * 360.0 - 180.0;

        // Inverse Mercator for latitude
        let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
        let lat = lat_rad * 180.0 / PI;

        (lon, lat)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.zoom * self.width as f64;

        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;

        (px.round() as i32, py.round() as i32)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Whether a projected segment's bounding box touches the viewport
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let (min_x, max_x) = (p1.0.min(p2.0), p1.0.max(p2.0));
        let (min_y, max_y) = (p1.1.min(p2.1), p1.1.max(p2.1));

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }

    /// Geographic bounds of the visible area (min_lon, min_lat, max_lon, max_lat)
    pub fn visible_bounds(&self) -> (f64, f64, f64, f64) {
        let (west, north) = self.unproject(0, 0);
        let (east, south) = self.unproject(self.width as i32, self.height as i32);
        (west, south, east, north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_line_visibility() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 80);
        assert!(vp.line_might_be_visible((10, 10), (20, 20)));
        // Crosses the view with both ends outside
        assert!(vp.line_might_be_visible((-500, 40), (600, 40)));
        assert!(!vp.line_might_be_visible((-50, 10), (-1, 70)));
        assert!(!vp.line_might_be_visible((100, 10), (400, 20)));
        assert!(!vp.line_might_be_visible((10, 80), (90, 300)));
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, -10);
        assert!(vp.center_lat > 0.0);
    }

    #[test]
    fn test_unproject_roundtrip_at_city_zoom() {
        let vp = Viewport::new(126.7, 37.45, 2000.0, 200, 160);
        let (px, py) = vp.project(126.75, 37.5);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 126.75).abs() < 0.01);
        assert!((lat - 37.5).abs() < 0.01);
    }

    #[test]
    fn test_fit_bounds_shows_whole_box() {
        let mut vp = Viewport::world(200, 160);
        let bounds = (126.5, 37.3, 126.9, 37.6);
        vp.fit_bounds((126.7, 37.45), bounds);
        assert!(vp.zoom > 100.0);

        for (lon, lat) in [(126.5, 37.3), (126.9, 37.6), (126.5, 37.6), (126.9, 37.3)] {
            let (px, py) = vp.project(lon, lat);
            assert!((0..=200).contains(&px) && (0..=160).contains(&py), "{lon},{lat} -> {px},{py}");
        }
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = Viewport::world(100, 100);
        for _ in 0..100 {
            vp.zoom_in();
        }
        assert_eq!(vp.zoom, MAX_ZOOM);
        for _ in 0..100 {
            vp.zoom_out();
        }
        assert_eq!(vp.zoom, MIN_ZOOM);
    }
}
