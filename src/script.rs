//! Script tasks.
//!
//! The vendor bundle is a literal byte concatenation: the positioning
//! helper and the widget framework rely on globals defined by the DOM
//! helper library, so the configured order is semantic. Page scripts are
//! copied as-is in development; production runs each through the `esbuild`
//! binary, which must be available in the system PATH.

use std::fs;
use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::{SiteConfig, flatten};
use crate::error::ScriptError;
use crate::io::write_file;

/// Concatenate the configured vendor scripts, in order, into
/// `<dist>/js/app.js`. No transformation is applied in either mode.
pub fn bundle_vendor(config: &SiteConfig) -> Result<(), ScriptError> {
    let mut bundle = Vec::new();

    for path in &config.vendor_scripts {
        bundle.extend_from_slice(&fs::read(path)?);
    }

    write_file(&config.js_out().join("app.js"), bundle)?;

    Ok(())
}

/// Compile every page script plus the shared common script, flattened to
/// `<dist>/js/`.
pub fn compile_pages(config: &SiteConfig) -> Result<(), ScriptError> {
    let pattern = config.pages_dir().join("**/*.js");

    let mut sources = Vec::new();
    for entry in glob::glob(pattern.as_str())? {
        sources.push(Utf8PathBuf::try_from(entry?)?);
    }

    let common = config.common_js();
    if common.is_file() {
        sources.push(common);
    }

    for source in &sources {
        let out_path = flatten(&config.js_out(), source);

        if config.mode.is_production() {
            write_file(&out_path, compile_esbuild(source)?)?;
        } else {
            write_file(&out_path, fs::read(source)?)?;
        }
    }

    Ok(())
}

/// Transpile and minify a single script by invoking the `esbuild` binary.
fn compile_esbuild(file: &Utf8Path) -> Result<Vec<u8>, ScriptError> {
    let output = Command::new("esbuild")
        .arg(file.as_str())
        .arg("--target=es2015")
        .arg("--minify")
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()?;

    if !output.status.success() {
        return Err(ScriptError::Esbuild(String::from_utf8(output.stdout)?));
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    fn scaffold() -> (tempfile::TempDir, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("src/global/js")).unwrap();
        fs::create_dir_all(root.join("src/pages")).unwrap();
        let config = SiteConfig::new(root);
        (dir, config)
    }

    #[test]
    fn vendor_bundle_is_literal_concatenation() {
        let (_dir, mut config) = scaffold();

        let vendor = config.root.join("vendor");
        fs::create_dir_all(&vendor).unwrap();
        fs::write(vendor.join("one.js"), "window.$ = {};\n").unwrap();
        fs::write(vendor.join("two.js"), "$.position = {};\n").unwrap();
        fs::write(vendor.join("three.js"), "$.widget = {};\n").unwrap();
        config.vendor_scripts = vec![
            vendor.join("one.js"),
            vendor.join("two.js"),
            vendor.join("three.js"),
        ];

        bundle_vendor(&config).unwrap();

        let bundle = fs::read(config.js_out().join("app.js")).unwrap();
        assert_eq!(
            bundle,
            b"window.$ = {};\n$.position = {};\n$.widget = {};\n"
        );
    }

    #[test]
    fn missing_vendor_file_is_fatal() {
        let (_dir, mut config) = scaffold();
        config.vendor_scripts = vec![config.root.join("vendor/gone.js")];

        let err = bundle_vendor(&config).unwrap_err();
        assert!(matches!(err, ScriptError::Io(_)));
    }

    #[test]
    fn development_copies_page_scripts_flattened() {
        let (_dir, config) = scaffold();
        let deep = config.pages_dir().join("blog/entry");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("entry.js"), "console.log('entry');\n").unwrap();
        fs::write(config.common_js(), "console.log('common');\n").unwrap();

        compile_pages(&config).unwrap();

        let out = config.js_out();
        assert_eq!(
            fs::read_to_string(out.join("entry.js")).unwrap(),
            "console.log('entry');\n"
        );
        assert!(out.join("common.js").exists());
        assert!(!out.join("blog").exists());
    }

    #[test]
    fn missing_common_script_is_not_fatal() {
        let (_dir, config) = scaffold();
        let pages = config.pages_dir().join("home");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join("home.js"), "1;\n").unwrap();

        compile_pages(&config).unwrap();

        assert!(config.js_out().join("home.js").exists());
        assert_eq!(config.mode, Mode::Development);
    }
}
