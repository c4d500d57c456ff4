//! Build orchestration.
//!
//! The build graph is fixed: `clean` precedes each of the six compilation
//! tasks, and those six have no edges among themselves, so the executor
//! may interleave them freely. The `deploy` and `dev` entry points run the
//! graph once and then keep the dev server and the watcher alive for the
//! rest of the process.

use std::sync::Arc;

use console::style;

use crate::config::SiteConfig;
use crate::error::SiteError;
use crate::graph::Pipeline;
use crate::server::{self, ReloadHub};
use crate::template::Templates;
use crate::{Mode, io, script, style as styles, watch};

/// Wire the full build graph against a fixed configuration.
pub fn assemble(config: Arc<SiteConfig>, templates: Arc<Templates>) -> Pipeline {
    let mut pipeline = Pipeline::new();

    {
        let c = config.clone();
        pipeline.add("clean", &[], move || Ok(io::clean(&c.dist)?));
    }
    {
        let c = config.clone();
        pipeline.add("copy", &["clean"], move || {
            Ok(io::copy_assets(&c.assets_dir(), &c.assets_out())?)
        });
    }
    {
        let c = config.clone();
        pipeline.add("style:app", &["clean"], move || Ok(styles::compile_app(&c)?));
    }
    {
        let c = config.clone();
        pipeline.add("style:page", &["clean"], move || {
            Ok(styles::compile_pages(&c)?)
        });
    }
    {
        let c = config.clone();
        pipeline.add("script:app", &["clean"], move || {
            Ok(script::bundle_vendor(&c)?)
        });
    }
    {
        let c = config.clone();
        pipeline.add("script:page", &["clean"], move || {
            Ok(script::compile_pages(&c)?)
        });
    }
    {
        let t = templates;
        pipeline.add("html", &["clean"], move || Ok(t.render_all()?));
    }

    pipeline
}

fn announce(config: &SiteConfig) {
    let mode = if config.mode.is_production() {
        "production"
    } else {
        "development"
    };
    eprintln!(
        "Running {} in {} mode.",
        style("sitewright").red(),
        style(mode).blue()
    );
}

/// Run the build graph once against the given configuration.
pub fn build(config: SiteConfig) -> Result<(), SiteError> {
    announce(&config);

    let config = Arc::new(config);
    let templates = Arc::new(Templates::new((*config).clone()));

    assemble(config, templates).run()?;

    Ok(())
}

/// Build, then keep the watcher (and optionally the dev server) running
/// for the rest of the process.
pub fn build_and_watch(mode: Mode, with_server: bool) -> Result<(), SiteError> {
    let hub = ReloadHub::start()?;

    let mut config = SiteConfig::default().with_mode(mode);
    config.reload_port = Some(hub.port());
    announce(&config);

    let config = Arc::new(config);
    let templates = Arc::new(Templates::new((*config).clone()));

    assemble(config.clone(), templates.clone()).run()?;

    if with_server {
        server::start_http(config.dist.clone(), config.port);
    }

    watch::watch(&config, &templates, &hub)?;

    Ok(())
}

/// Serve the existing output directory; blocks until the server stops.
pub fn serve() {
    let config = SiteConfig::default();
    server::start_http(config.dist.clone(), config.port)
        .join()
        .ok();
}

/// Smoke check: clean, then render templates only, in development mode.
pub fn smoke_test() -> Result<(), SiteError> {
    let config = SiteConfig::default();
    announce(&config);

    io::clean(&config.dist)?;
    Templates::new(config).render_all()?;

    Ok(())
}

pub fn clean() -> Result<(), SiteError> {
    let config = SiteConfig::default();
    io::clean(&config.dist)?;
    Ok(())
}
