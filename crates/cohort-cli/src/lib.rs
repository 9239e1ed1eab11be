//! CLI library components for cohort construction.

pub mod config;
pub mod logging;
