use std::env;

use camino::{Utf8Path, Utf8PathBuf};

use crate::Mode;

/// Dev server port used when `SERVER_PORT` is absent or unparsable.
pub const DEFAULT_PORT: u16 = 6080;

/// Everything the build tasks need to know, resolved once per invocation
/// and passed by value into every task. Holding the mode here instead of
/// in ambient state means a task can never observe the mode flipping
/// between its reads.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Build mode, fixed before the task graph runs.
    pub mode: Mode,
    /// Project root; every source path below resolves against it.
    pub root: Utf8PathBuf,
    /// Output root, wiped and recreated by the clean task.
    pub dist: Utf8PathBuf,
    /// Dev server port.
    pub port: u16,
    /// Reload websocket port, set only while the watcher is running.
    /// When present, rendered pages get the reload client appended.
    pub reload_port: Option<u16>,
    /// Vendor bundle inputs, concatenated in this exact order. Later
    /// files rely on globals defined by earlier ones.
    pub vendor_scripts: Vec<Utf8PathBuf>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(Utf8PathBuf::from("."))
    }
}

impl SiteConfig {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        let node_modules = root.join("node_modules");

        Self {
            mode: Mode::default(),
            dist: root.join("dist"),
            port: port_from_env(),
            reload_port: None,
            vendor_scripts: vec![
                node_modules.join("jquery/dist/jquery.min.js"),
                node_modules.join("popper.js/dist/umd/popper.min.js"),
                node_modules.join("bootstrap/dist/js/bootstrap.min.js"),
            ],
            root,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn src(&self) -> Utf8PathBuf {
        self.root.join("src")
    }

    /// The single site-wide stylesheet entry.
    pub fn app_scss(&self) -> Utf8PathBuf {
        self.root.join("src/global/scss/app.scss")
    }

    pub fn pages_dir(&self) -> Utf8PathBuf {
        self.root.join("src/pages")
    }

    /// The one shared script compiled alongside the page scripts.
    pub fn common_js(&self) -> Utf8PathBuf {
        self.root.join("src/global/js/common.js")
    }

    pub fn layouts_dir(&self) -> Utf8PathBuf {
        self.root.join("src/layouts")
    }

    pub fn partials_dir(&self) -> Utf8PathBuf {
        self.root.join("src/partials")
    }

    pub fn helpers_dir(&self) -> Utf8PathBuf {
        self.root.join("src/helpers")
    }

    pub fn data_dir(&self) -> Utf8PathBuf {
        self.root.join("src/data")
    }

    pub fn assets_dir(&self) -> Utf8PathBuf {
        self.root.join("src/assets")
    }

    /// Extra load path for stylesheet imports, so `app.scss` can pull in
    /// the widget framework's scss sources.
    pub fn scss_load_path(&self) -> Utf8PathBuf {
        self.root.join("node_modules/bootstrap/scss")
    }

    pub fn css_out(&self) -> Utf8PathBuf {
        self.dist.join("css")
    }

    pub fn js_out(&self) -> Utf8PathBuf {
        self.dist.join("js")
    }

    pub fn assets_out(&self) -> Utf8PathBuf {
        self.dist.join("assets")
    }

    /// Returns a JavaScript snippet to enable live-reloading.
    ///
    /// If a reload hub is running and its port is configured, this returns
    /// a script that connects to the websocket server and reloads the page
    /// on any message.
    pub fn refresh_script(&self) -> Option<String> {
        self.reload_port.map(|port| {
            format!(
                r#"
const socket = new WebSocket("ws://localhost:{port}");
socket.addEventListener("message", event => {{
    window.location.reload();
}});
"#
            )
        })
    }
}

fn port_from_env() -> u16 {
    parse_port(env::var("SERVER_PORT").ok().as_deref())
}

fn parse_port(value: Option<&str>) -> u16 {
    value
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Rewrites a per-page output path to sit directly under `out_dir`,
/// discarding the source nesting.
pub fn flatten(out_dir: &Utf8Path, source: &Utf8Path) -> Utf8PathBuf {
    match source.file_name() {
        Some(name) => out_dir.join(name),
        None => out_dir.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_on_missing_or_invalid() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("not a port")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("8123")), 8123);
    }

    #[test]
    fn flatten_discards_nesting() {
        let out = Utf8Path::new("dist/css");
        let nested = Utf8Path::new("src/pages/blog/posts/index.css");
        assert_eq!(flatten(out, nested), Utf8Path::new("dist/css/index.css"));
    }

    #[test]
    fn vendor_order_is_fixed() {
        let config = SiteConfig::new("site");
        let names: Vec<_> = config
            .vendor_scripts
            .iter()
            .filter_map(|p| p.file_name())
            .collect();
        assert_eq!(
            names,
            ["jquery.min.js", "popper.min.js", "bootstrap.min.js"]
        );
    }
}
