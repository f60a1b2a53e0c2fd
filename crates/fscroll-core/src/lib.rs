#![forbid(unsafe_code)]

//! Core: windowing configuration and scroll geometry for FrankenScroll.

pub mod config;
pub mod geometry;

pub use config::{ConfigError, ScrollConfig};
pub use geometry::{OriginAnchor, ScrollMetrics, ScrollSample, VirtualViewport};
