use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use glob::{glob, Pattern};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::process::utils::timestamp_tag;

/// Copy `src` into `dir` as `<stem>_<timestamp>.<ext>` and return the new path.
pub fn backup_copy(src: &Path, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating backup dir {}", dir.display()))?;
    let (stem, ext) = stem_and_ext(src);
    let name = match ext {
        Some(ext) => format!("{}_{}.{}", stem, timestamp_tag(now), ext),
        None => format!("{}_{}", stem, timestamp_tag(now)),
    };
    let dest = dir.join(name);
    fs::copy(src, &dest)
        .with_context(|| format!("copying {} -> {}", src.display(), dest.display()))?;
    info!(from = %src.display(), to = %dest.display(), "backup written");
    Ok(dest)
}

/// Keep the newest `keep` backups of `original` in `dir`, delete the rest.
/// Returns the deleted paths.
pub fn prune_backups(original: &Path, dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let (stem, ext) = stem_and_ext(original);
    let pattern = format!(
        "{}/{}_*{}",
        Pattern::escape(&dir.display().to_string()),
        Pattern::escape(&stem),
        ext.map(|e| format!(".{}", Pattern::escape(&e)))
            .unwrap_or_default()
    );

    let mut backups: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("invalid backup glob {}", pattern))?
        .filter_map(Result::ok)
        .filter(|p| is_backup_of(p, &stem))
        .collect();
    // timestamp tags sort lexically in time order
    backups.sort();

    let excess = backups.len().saturating_sub(keep);
    let doomed: Vec<PathBuf> = backups.into_iter().take(excess).collect();
    for p in &doomed {
        fs::remove_file(p).with_context(|| format!("removing old backup {}", p.display()))?;
        debug!(path = %p.display(), "pruned backup");
    }
    Ok(doomed)
}

fn stem_and_ext(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "source".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    (stem, ext)
}

/// `<stem>_<YYYYMMDDTHHMMSSmmmZ>` and nothing else, so `report` never claims
/// the backups of `report_v2`.
fn is_backup_of(path: &Path, stem: &str) -> bool {
    let Some(file_stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(tag) = file_stem
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    tag.len() == 19
        && tag.as_bytes()[8] == b'T'
        && tag.ends_with('Z')
        && tag[..8].bytes().all(|b| b.is_ascii_digit())
        && tag[9..18].bytes().all(|b| b.is_ascii_digit())
}
