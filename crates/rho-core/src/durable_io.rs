use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::time_utils::current_unix_timestamp;

/// Writes text through a sibling temp file and a rename, so a reader never
/// observes a half-written record.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("refusing to write to an empty path");
    }
    if path.is_dir() {
        bail!("cannot overwrite directory {}", path.display());
    }

    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("record");
    let temp_path = parent_dir.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        current_unix_timestamp()
    ));
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to stage {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Appends exactly one line to `path`, creating parent directories on demand.
///
/// The line and its trailing newline go through a single `write_all` so
/// concurrent appenders cannot interleave inside one record.
pub fn append_jsonl_line(path: &Path, line: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("append path cannot be empty");
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mut buffer = String::with_capacity(line.len().saturating_add(1));
    buffer.push_str(line);
    buffer.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(buffer.as_bytes())
        .with_context(|| format!("failed to append {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}
