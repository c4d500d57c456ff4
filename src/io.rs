use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;

use camino::Utf8Path;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{CleanError, CopyError};

const ANSI_BLUE: Style = Style::new().blue();

static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos} {msg}")
        .expect("Error setting progress bar template")
        .progress_chars("#>-")
});

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete the entire output directory if it exists, then recreate it
/// empty. Deleting a directory that was never there is not an error.
pub fn clean(dist: &Utf8Path) -> Result<(), CleanError> {
    let s = Instant::now();

    if fs::metadata(dist).is_ok() {
        fs::remove_dir_all(dist) //
            .map_err(CleanError::Remove)?;
    }

    fs::create_dir_all(dist) //
        .map_err(CleanError::Create)?;

    eprintln!("Cleaned the dist directory {}", as_overhead(s));

    Ok(())
}

/// Verbatim recursive copy of the assets tree into the output directory.
/// A missing source tree copies nothing.
pub fn copy_assets(src: &Utf8Path, dst: &Utf8Path) -> Result<(), CopyError> {
    if fs::metadata(src).is_err() {
        return Ok(());
    }

    let pb = ProgressBar::no_length();
    pb.set_message("Copying static assets...");
    pb.set_style(PROGRESS_STYLE.clone());

    let s = Instant::now();
    copy_rec(src, dst, &pb)?;

    pb.finish_with_message(format!("Finished copying static assets! {}", as_overhead(s)));

    Ok(())
}

fn copy_rec(src: impl AsRef<Path>, dst: impl AsRef<Path>, pb: &ProgressBar) -> std::io::Result<()> {
    fs::create_dir_all(&dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let filetype = entry.file_type()?;
        if filetype.is_dir() {
            copy_rec(entry.path(), dst.as_ref().join(entry.file_name()), pb)?;
        } else {
            fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
            pb.inc(1);
        }
    }
    Ok(())
}

/// Write a file, creating its parent directories first.
pub fn write_file(path: &Utf8Path, contents: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, contents)
}
