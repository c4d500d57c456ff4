use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Error while clearing the dist directory:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while building the website.\n{0}")]
    Build(#[from] BuildError),

    #[error("Error while rendering templates:\n{0}")]
    Template(#[from] TemplateError),

    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),

    #[error("Error while starting the reload hub:\n{0}")]
    Server(#[from] ServerError),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't remove the output directory.\n{0}")]
    Remove(std::io::Error),

    #[error("Couldn't recreate the output directory.\n{0}")]
    Create(std::io::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Task '{0}' depends on unknown task '{1}'")]
    UnknownPredecessor(String, String),

    #[error("Cycle detected in the task graph at '{0}'")]
    Cycle(String),

    #[error("Task '{0}':\n{1}")]
    Task(String, anyhow::Error),
}

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("Couldn't read stylesheet source.\n{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Couldn't serialize source map.\n{0}")]
    SourceMap(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Esbuild execution failed: {0}")]
    Esbuild(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Couldn't load template source.\n{0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Malformed front matter in '{0}':\n{1}")]
    FrontMatter(String, anyhow::Error),

    #[error("Data file '{0}' is not valid JSON.\n{1}")]
    Data(String, serde_json::Error),

    #[error("Page '{0}' uses unknown layout '{1}'")]
    LayoutMissing(String, String),

    #[error(transparent)]
    Engine(#[from] minijinja::Error),
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct CopyError(#[from] pub(crate) std::io::Error);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Couldn't bind the reload socket.\n{0}")]
    Bind(std::io::Error),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("Couldn't compile watch pattern.\n{0}")]
    Pattern(#[from] glob::PatternError),
}
