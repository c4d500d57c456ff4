//! Page templating.
//!
//! [`Templates`] owns the engine state: every template under the layouts,
//! partials and helpers directories plus the parsed data files. The state
//! is loaded lazily and kept until [`Templates::invalidate`] drops it, so
//! repeated renders reuse the parsed templates. The watcher must call
//! `invalidate` when a layout, partial, helper or data file changes; a
//! page-only change renders correctly against the cached state.

use std::collections::BTreeMap;
use std::fs;
use std::sync::{LazyLock, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use gray_matter::engine::YAML;
use gray_matter::{Matter, Pod};
use minijinja::Environment;
use minijinja::value::Value;
use serde::Deserialize;

use crate::config::{SiteConfig, flatten};
use crate::error::TemplateError;
use crate::io::write_file;

static MATTER: LazyLock<Matter<YAML>> = LazyLock::new(Matter::<YAML>::new);

const DEFAULT_LAYOUT: &str = "default";

/// Page front matter. The `layout` key names the layout the page renders
/// into; every other field lands in the render context as-is.
#[derive(Debug, Default, Deserialize)]
struct PageMatter {
    layout: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

struct Loaded {
    env: Environment<'static>,
    bindings: BTreeMap<String, Value>,
}

pub struct Templates {
    config: SiteConfig,
    state: Mutex<Option<Loaded>>,
}

impl Templates {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    /// Drop the loaded engine state. The next render reloads layouts,
    /// partials, helpers and data from disk.
    pub fn invalidate(&self) {
        self.state.lock().unwrap().take();
    }

    /// Render every page under `src/pages/` into the output directory,
    /// flattened. Engine errors are fatal to the task.
    pub fn render_all(&self) -> Result<(), TemplateError> {
        let mut state = self.state.lock().unwrap();
        if state.is_none() {
            *state = Some(self.load()?);
        }
        let loaded = state.as_ref().unwrap();

        let pattern = self.config.pages_dir().join("**/*.html");
        for entry in glob::glob(pattern.as_str())? {
            let page = Utf8PathBuf::try_from(entry?)?;
            let html = self.render_page(loaded, &page)?;
            write_file(&flatten(&self.config.dist, &page), html)?;
        }

        Ok(())
    }

    fn load(&self) -> Result<Loaded, TemplateError> {
        let mut env = Environment::new();
        let src = self.config.src();

        for dir in [
            self.config.layouts_dir(),
            self.config.partials_dir(),
            self.config.helpers_dir(),
        ] {
            for entry in glob::glob(dir.join("**/*.html").as_str())? {
                let path = Utf8PathBuf::try_from(entry?)?;
                let name = path
                    .strip_prefix(&src)
                    .unwrap_or(&path)
                    .as_str()
                    .to_owned();
                env.add_template_owned(name, fs::read_to_string(&path)?)?;
            }
        }

        let mut bindings = BTreeMap::new();
        for entry in glob::glob(self.config.data_dir().join("*.json").as_str())? {
            let path = Utf8PathBuf::try_from(entry?)?;
            let text = fs::read_to_string(&path)?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| TemplateError::Data(path.to_string(), e))?;

            if let Some(stem) = path.file_stem() {
                bindings.insert(stem.to_owned(), Value::from_serialize(&value));
            }
        }

        Ok(Loaded { env, bindings })
    }

    fn render_page(&self, loaded: &Loaded, page: &Utf8Path) -> Result<String, TemplateError> {
        let text = fs::read_to_string(page)?;

        let entity = MATTER.parse(&text).map_err(|e| {
            TemplateError::FrontMatter(page.to_string(), anyhow::anyhow!("{e}"))
        })?;
        let matter = entity
            .data
            .unwrap_or_else(Pod::new_hash)
            .deserialize::<PageMatter>()
            .map_err(|e| {
                TemplateError::FrontMatter(page.to_string(), anyhow::anyhow!("{e}"))
            })?;

        let mut context = loaded.bindings.clone();
        for (key, value) in &matter.fields {
            context.insert(key.clone(), Value::from_serialize(value));
        }

        let body = loaded.env.render_str(&entity.content, &context)?;

        let layout = matter.layout.as_deref().unwrap_or(DEFAULT_LAYOUT);
        let template = loaded
            .env
            .get_template(&format!("layouts/{layout}.html"))
            .map_err(|_| TemplateError::LayoutMissing(page.to_string(), layout.to_string()))?;

        context.insert("content".to_string(), Value::from_safe_string(body));
        let mut html = template.render(&context)?;

        if self.config.mode.is_production() {
            html = minify_html(&html);
        }

        if let Some(script) = self.config.refresh_script() {
            html = inject_reload(html, &script);
        }

        Ok(html)
    }
}

fn inject_reload(html: String, script: &str) -> String {
    let tag = format!("<script>{script}</script>");
    match html.rfind("</body>") {
        Some(at) => {
            let mut html = html;
            html.insert_str(at, &tag);
            html
        }
        None => html + &tag,
    }
}

/// Conservative whitespace minifier for final markup. Comments are
/// stripped (conditional comments survive), whitespace runs spanning a
/// line break disappear between tags and collapse to a single space
/// inside text, and the contents of `pre`, `textarea`, `script` and
/// `style` are untouched.
pub fn minify_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(end) = raw_block(rest) {
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        if rest.starts_with("<!--") && !rest.starts_with("<!--[") {
            match rest.find("-->") {
                Some(at) => rest = &rest[at + 3..],
                None => break,
            }
            continue;
        }

        if rest.starts_with('<') {
            let end = tag_end(rest);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        let end = rest.find('<').unwrap_or(rest.len());
        push_text(&mut out, &rest[..end]);
        rest = &rest[end..];
    }

    out
}

/// If `rest` starts with a raw-text element, returns the length of the
/// whole block including its closing tag.
fn raw_block(rest: &str) -> Option<usize> {
    const RAW: [&str; 4] = ["pre", "textarea", "script", "style"];

    let lower = rest.chars().take(10).collect::<String>().to_ascii_lowercase();
    let name = RAW
        .iter()
        .find(|name| {
            lower.strip_prefix('<').is_some_and(|after| {
                after.strip_prefix(*name).is_some_and(|tail| {
                    tail.starts_with([' ', '\t', '\n', '>']) || tail.is_empty()
                })
            })
        })?;

    let open_end = tag_end(rest);
    let close = format!("</{name}");
    let at = rest[open_end..].to_ascii_lowercase().find(&close)?;
    let close_start = open_end + at;
    Some(close_start + tag_end(&rest[close_start..]))
}

/// Length of the tag starting at the beginning of `rest`, respecting
/// quoted attribute values.
fn tag_end(rest: &str) -> usize {
    let mut quote = None;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    rest.len()
}

fn push_text(out: &mut String, text: &str) {
    if text.chars().all(char::is_whitespace) {
        if !text.contains('\n') {
            out.push(' ');
        }
        return;
    }

    let mut in_ws = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_ws = true;
        } else {
            if in_ws {
                out.push(' ');
                in_ws = false;
            }
            out.push(c);
        }
    }
    if in_ws {
        out.push(' ');
    }
}
