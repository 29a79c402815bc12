//! Rank-bucketed choropleth maps for the terminal.
//!
//! The binary wires these modules into an interactive dashboard; the library
//! half exists so benchmarks can reach the hot paths.

pub mod braille;
pub mod choropleth;
pub mod data;
pub mod map;
pub mod palette;
