pub mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use projection::{Viewport, MAX_ZOOM, MIN_ZOOM};
pub use renderer::{DisplaySettings, MapRenderer, MAX_ELEVATION_SCALE, MIN_ELEVATION_SCALE, NO_DATA_COLOR};
pub use spatial::FeatureGrid;
