//! Stylesheet compilation.
//!
//! Compiler diagnostics are logged and skip only the offending file, so a
//! bad stylesheet never takes down the rest of the batch or the build.
//! Filesystem errors stay fatal.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;

use crate::config::{SiteConfig, flatten};
use crate::error::StyleError;
use crate::io::write_file;

/// Compile the single site-wide entry to `<dist>/css/app.css`.
pub fn compile_app(config: &SiteConfig) -> Result<(), StyleError> {
    compile_one(config, &config.app_scss())
}

/// Compile every page stylesheet, flattened to `<dist>/css/`.
pub fn compile_pages(config: &SiteConfig) -> Result<(), StyleError> {
    let pattern = config.pages_dir().join("**/*.scss");

    for entry in glob::glob(pattern.as_str())? {
        let entry = Utf8PathBuf::try_from(entry?)?;

        // Underscore-prefixed files are import-only partials.
        if entry.file_name().is_some_and(|name| name.starts_with('_')) {
            continue;
        }

        compile_one(config, &entry)?;
    }

    Ok(())
}

fn compile_one(config: &SiteConfig, entry: &Utf8Path) -> Result<(), StyleError> {
    let style = if config.mode.is_production() {
        grass::OutputStyle::Compressed
    } else {
        grass::OutputStyle::Expanded
    };

    let options = grass::Options::default()
        .style(style)
        .load_path(config.scss_load_path());

    let css = match grass::from_path(entry, &options) {
        Ok(css) => css,
        Err(err) => {
            tracing::error!("sass: {err}");
            return Ok(());
        }
    };

    let out_path = flatten(&config.css_out(), entry).with_extension("css");

    if config.mode.is_production() {
        write_file(&out_path, css)?;
        return Ok(());
    }

    let map_name = format!("{}.map", out_path.file_name().unwrap_or("style.css"));
    let map = json!({
        "version": 3,
        "file": out_path.file_name(),
        "sources": [entry.as_str()],
        "sourcesContent": [std::fs::read_to_string(entry)?],
        "names": [],
        "mappings": "",
    });

    write_file(&out_path.with_file_name(&map_name), serde_json::to_vec(&map)?)?;
    write_file(
        &out_path,
        format!("{css}\n/*# sourceMappingURL={map_name} */\n"),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;
    use std::fs;

    fn scaffold(mode: Mode) -> (tempfile::TempDir, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("src/global/scss")).unwrap();
        let config = SiteConfig::new(root).with_mode(mode);
        (dir, config)
    }

    #[test]
    fn development_keeps_expanded_output_with_source_map() {
        let (_dir, config) = scaffold(Mode::Development);
        fs::write(config.app_scss(), "$c: #fff;\nbody { color: $c; }").unwrap();

        compile_app(&config).unwrap();

        let css = fs::read_to_string(config.css_out().join("app.css")).unwrap();
        assert!(css.contains("color: #fff;"));
        assert!(css.contains("sourceMappingURL=app.css.map"));

        let map = fs::read_to_string(config.css_out().join("app.css.map")).unwrap();
        let map: serde_json::Value = serde_json::from_str(&map).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], config.app_scss().as_str());
    }

    #[test]
    fn production_compresses_and_omits_source_map() {
        let (_dir, config) = scaffold(Mode::Production);
        fs::write(config.app_scss(), "body {\n  color: #fff;\n}").unwrap();

        compile_app(&config).unwrap();

        let css = fs::read_to_string(config.css_out().join("app.css")).unwrap();
        assert!(!css.contains('\n') || css.trim_end().lines().count() == 1);
        assert!(!css.contains("sourceMappingURL"));
        assert!(!config.css_out().join("app.css.map").exists());
    }

    #[test]
    fn page_styles_flatten_and_skip_partials() {
        let (_dir, config) = scaffold(Mode::Production);
        let deep = config.pages_dir().join("blog/posts");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("post.scss"), "a { color: red; }").unwrap();
        fs::write(deep.join("_mixins.scss"), "@mixin x { color: red; }").unwrap();

        compile_pages(&config).unwrap();

        assert!(config.css_out().join("post.css").exists());
        assert!(!config.css_out().join("_mixins.css").exists());
        assert!(!config.css_out().join("blog").exists());
    }

    #[test]
    fn compile_errors_do_not_abort_the_batch() {
        let (_dir, config) = scaffold(Mode::Development);
        let pages = config.pages_dir().join("home");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("broken.scss"), "body { color: $undefined; }").unwrap();
        fs::write(pages.join("fine.scss"), "body { color: blue; }").unwrap();

        compile_pages(&config).unwrap();

        assert!(!config.css_out().join("broken.css").exists());
        assert!(config.css_out().join("fine.css").exists());
    }
}
