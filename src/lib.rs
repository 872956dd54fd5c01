//! Decision tree for choosing a business valuation method, laid out as a
//! layered diagram and rendered to SVG, PNG or PDF.

pub mod config;
pub mod error;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod math;
pub mod render;
pub mod theme;
pub mod tree;
pub mod view;

pub use error::{ConfigError, Result, TreeError};
