//! The file watcher.
//!
//! One watch category per source kind, matched with glob patterns over a
//! single debounced recursive watcher rooted at `src/`. A change batch is
//! classified into a deduplicated plan: the template cache refresh always
//! precedes the template re-render, and a single reload broadcast closes
//! the plan. Rebuild errors are logged and watching continues; the
//! watcher runs until process exit.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use glob::Pattern;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;

use crate::config::SiteConfig;
use crate::error::WatchError;
use crate::server::ReloadHub;
use crate::template::Templates;
use crate::{script, style};

/// A source category whose change re-runs one compilation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Trigger {
    AppStyles,
    PageStyles,
    PageScripts,
    PageMarkup,
    TemplateSources,
}

/// One step of a rebuild plan, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RefreshTemplates,
    StyleApp,
    StylePage,
    ScriptPage,
    Templates,
    Reload,
}

fn categories() -> Result<Vec<(Pattern, Trigger)>, glob::PatternError> {
    Ok(vec![
        (Pattern::new("src/global/scss/*.scss")?, Trigger::AppStyles),
        (Pattern::new("src/global/scss/**/*.scss")?, Trigger::AppStyles),
        (Pattern::new("src/pages/**/*.scss")?, Trigger::PageStyles),
        (Pattern::new("src/global/js/*.js")?, Trigger::PageScripts),
        (Pattern::new("src/global/js/**/*.js")?, Trigger::PageScripts),
        (Pattern::new("src/pages/**/*.js")?, Trigger::PageScripts),
        (Pattern::new("src/layouts/**")?, Trigger::TemplateSources),
        (Pattern::new("src/partials/**")?, Trigger::TemplateSources),
        (Pattern::new("src/helpers/**")?, Trigger::TemplateSources),
        (Pattern::new("src/data/**")?, Trigger::TemplateSources),
        (Pattern::new("src/pages/**/*.html")?, Trigger::PageMarkup),
    ])
}

fn classify(path: &Path, categories: &[(Pattern, Trigger)]) -> Option<Trigger> {
    categories
        .iter()
        .find(|(pattern, _)| pattern.matches_path(path))
        .map(|(_, trigger)| *trigger)
}

/// Turn a set of triggers into an ordered, deduplicated plan. The
/// template cache refresh runs before the template task, and a single
/// reload ends any non-empty plan.
fn plan(triggers: &HashSet<Trigger>) -> Vec<Step> {
    let mut steps = Vec::new();

    if triggers.contains(&Trigger::TemplateSources) {
        steps.push(Step::RefreshTemplates);
    }
    if triggers.contains(&Trigger::AppStyles) {
        steps.push(Step::StyleApp);
    }
    if triggers.contains(&Trigger::PageStyles) {
        steps.push(Step::StylePage);
    }
    if triggers.contains(&Trigger::PageScripts) {
        steps.push(Step::ScriptPage);
    }
    if triggers.contains(&Trigger::PageMarkup) || triggers.contains(&Trigger::TemplateSources) {
        steps.push(Step::Templates);
    }
    if !steps.is_empty() {
        steps.push(Step::Reload);
    }

    steps
}

/// Watch the source tree and re-run the affected tasks on change.
/// Runs until the process is terminated.
pub fn watch(
    config: &SiteConfig,
    templates: &Templates,
    hub: &ReloadHub,
) -> Result<(), WatchError> {
    let root = config.root.canonicalize_utf8()?;
    let categories = categories()?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;
    debouncer.watch(config.src().as_std_path(), RecursiveMode::Recursive)?;

    eprintln!("Watching {} for changes", config.src());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let mut triggers = HashSet::new();

                for de in &events {
                    if !matches!(
                        de.event.kind,
                        EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                    ) {
                        continue;
                    }

                    for path in &de.event.paths {
                        let rel = path.strip_prefix(root.as_std_path()).unwrap_or(path);
                        if let Some(trigger) = classify(rel, &categories) {
                            triggers.insert(trigger);
                        }
                    }
                }

                let steps = plan(&triggers);
                if steps.is_empty() {
                    continue;
                }

                let start = Instant::now();
                run_steps(&steps, config, templates, hub);
                println!("Refreshed in {:?}", start.elapsed());
            }
            Ok(Err(errors)) => {
                for e in errors {
                    tracing::error!("watch error: {e:?}");
                }
            }
            Err(_) => break,
        }
    }

    Ok(())
}

fn run_steps(steps: &[Step], config: &SiteConfig, templates: &Templates, hub: &ReloadHub) {
    for step in steps {
        let outcome = match step {
            Step::RefreshTemplates => {
                templates.invalidate();
                Ok(())
            }
            Step::StyleApp => style::compile_app(config).map_err(anyhow::Error::from),
            Step::StylePage => style::compile_pages(config).map_err(anyhow::Error::from),
            Step::ScriptPage => script::compile_pages(config).map_err(anyhow::Error::from),
            Step::Templates => templates.render_all().map_err(anyhow::Error::from),
            Step::Reload => {
                hub.reload();
                Ok(())
            }
        };

        if let Err(e) = outcome {
            tracing::error!("Encountered an error while rebuilding: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_for(paths: &[&str]) -> Vec<Step> {
        let categories = categories().unwrap();
        let triggers = paths
            .iter()
            .filter_map(|p| classify(Path::new(p), &categories))
            .collect();
        plan(&triggers)
    }

    #[test]
    fn partial_change_refreshes_before_rendering() {
        assert_eq!(
            plan_for(&["src/partials/nav.html"]),
            [Step::RefreshTemplates, Step::Templates, Step::Reload]
        );
    }

    #[test]
    fn app_style_change_recompiles_the_app_stylesheet() {
        assert_eq!(
            plan_for(&["src/global/scss/app.scss"]),
            [Step::StyleApp, Step::Reload]
        );
    }

    #[test]
    fn page_style_change_recompiles_only_page_styles() {
        assert_eq!(
            plan_for(&["src/pages/blog/post.scss"]),
            [Step::StylePage, Step::Reload]
        );
    }

    #[test]
    fn page_markup_change_skips_the_cache_refresh() {
        assert_eq!(
            plan_for(&["src/pages/home/index.html"]),
            [Step::Templates, Step::Reload]
        );
    }

    #[test]
    fn shared_script_change_recompiles_page_scripts() {
        assert_eq!(
            plan_for(&["src/global/js/common.js"]),
            [Step::ScriptPage, Step::Reload]
        );
    }

    #[test]
    fn unrelated_files_plan_nothing() {
        assert_eq!(plan_for(&["README.md", "dist/index.html"]), []);
    }

    #[test]
    fn one_batch_one_reload() {
        let steps = plan_for(&[
            "src/pages/home/index.html",
            "src/pages/home/home.scss",
            "src/data/site.json",
        ]);
        assert_eq!(
            steps,
            [
                Step::RefreshTemplates,
                Step::StylePage,
                Step::Templates,
                Step::Reload
            ]
        );
        assert_eq!(steps.iter().filter(|s| **s == Step::Reload).count(), 1);
    }
}
