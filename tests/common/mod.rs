#![allow(dead_code)]

use std::fs;

use camino::Utf8PathBuf;
use sitewright::config::SiteConfig;

/// Lay out a complete miniature site in a temp directory and return a
/// configuration rooted there, with the vendor bundle pointed at local
/// fixture files.
pub fn scaffold() -> (tempfile::TempDir, SiteConfig) {
    let (dir, mut config) = scaffold_without_scripts();
    let src = config.root.join("src");

    fs::create_dir_all(src.join("global/js")).unwrap();
    fs::write(src.join("global/js/common.js"), "console.log('common');\n").unwrap();
    fs::write(
        src.join("pages/home/home.js"),
        "document.title = 'home';\n",
    )
    .unwrap();
    fs::write(
        src.join("pages/company/about/about.js"),
        "document.title = 'about';\n",
    )
    .unwrap();

    config.mode = sitewright::Mode::Development;
    (dir, config)
}

/// Same tree without any page or shared scripts; production builds over
/// this scaffold never shell out to esbuild.
pub fn scaffold_without_scripts() -> (tempfile::TempDir, SiteConfig) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    let src = root.join("src");

    for sub in [
        "global/scss",
        "pages/home",
        "pages/company/about",
        "layouts",
        "partials",
        "helpers",
        "data",
        "assets/img",
    ] {
        fs::create_dir_all(src.join(sub)).unwrap();
    }

    fs::write(
        src.join("global/scss/app.scss"),
        "$accent: #336699;\nbody { a { color: $accent; } }\n",
    )
    .unwrap();

    fs::write(
        src.join("layouts/default.html"),
        "<!DOCTYPE html>\n<html>\n<head><title>{{ title }}</title></head>\n<body>\n{{ content }}\n</body>\n</html>\n",
    )
    .unwrap();
    fs::write(src.join("partials/nav.html"), "<nav>{{ site.name }}</nav>").unwrap();
    fs::write(
        src.join("helpers/badges.html"),
        "{% macro tag(label) %}<span class=\"badge\">{{ label }}</span>{% endmacro %}",
    )
    .unwrap();
    fs::write(src.join("data/site.json"), r#"{"name": "Example"}"#).unwrap();

    fs::write(
        src.join("pages/home/index.html"),
        "---\ntitle: Home\n---\n{% import \"helpers/badges.html\" as badges %}{% include \"partials/nav.html\" %}\n<h1>{{ title }}</h1>\n{{ badges.tag(\"fresh\") }}\n",
    )
    .unwrap();
    fs::write(src.join("pages/home/home.scss"), "h1 { color: red; }\n").unwrap();
    fs::write(
        src.join("pages/company/about/about.html"),
        "---\ntitle: About\n---\n<p>about us</p>\n",
    )
    .unwrap();
    fs::write(
        src.join("pages/company/about/about.scss"),
        "p { margin: 0; }\n",
    )
    .unwrap();

    fs::write(src.join("assets/img/logo.svg"), "<svg></svg>").unwrap();

    let vendor = root.join("vendor");
    fs::create_dir_all(&vendor).unwrap();
    fs::write(vendor.join("dom.js"), "window.$ = function () {};\n").unwrap();
    fs::write(vendor.join("position.js"), "$.position = {};\n").unwrap();
    fs::write(vendor.join("widgets.js"), "$.widget = {};\n").unwrap();

    let mut config = SiteConfig::new(root);
    config.vendor_scripts = vec![
        vendor.join("dom.js"),
        vendor.join("position.js"),
        vendor.join("widgets.js"),
    ];

    (dir, config)
}
