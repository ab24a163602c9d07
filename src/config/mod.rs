//!
//! Documentation of the config module.
//! Sets up the runtime configuration, the logger and the campus catalogs.
//!

pub mod config;
