#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod build;
pub mod config;
mod error;
pub mod graph;
mod io;
pub mod script;
pub mod server;
pub mod style;
pub mod template;
pub mod watch;

pub use crate::config::SiteConfig;
pub use crate::error::*;
pub use crate::graph::Pipeline;
pub use crate::template::Templates;

/// This value controls whether the optional steps of each build task run.
/// In `Development` mode, stylesheets keep their expanded form and gain
/// source maps; in `Production` mode, styles, scripts and markup are
/// minified instead. The mode is chosen once per invocation, before the
/// task graph starts, and is carried by value inside [`SiteConfig`] so no
/// task can observe it changing mid-build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Expanded output, source maps, no minification.
    #[default]
    Development,
    /// Minified output, no source maps.
    Production,
}

impl Mode {
    pub fn is_production(self) -> bool {
        matches!(self, Mode::Production)
    }
}
