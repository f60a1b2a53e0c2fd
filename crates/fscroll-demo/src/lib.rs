#![forbid(unsafe_code)]

//! FrankenScroll scripted demo: a simulated pane scrolled over a synthetic
//! remote source, logging how the live window moves.

pub mod cli;
pub mod logging;
pub mod session;
