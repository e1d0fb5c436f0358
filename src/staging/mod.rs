//! Inspection and materialization of per-identifier staging directories.
//!
//! The engine lands everything for one identifier under `<save_dir>/<content_id>/`:
//! the media file, subtitle tracks and the info json sidecar. A directory only counts
//! as downloaded when it holds a file with one of [`MEDIA_EXTENSIONS`].

use anyhow::{Context, Result};
use std::fs::FileTimes;
use std::path::Path;

use crate::utils::format_file_size;

/// Container extensions recognized as a playable media file
pub const MEDIA_EXTENSIONS: &[&str] = &[
    ".webm", ".mp3", ".m4a", ".flac", ".wav", ".mp4", ".mkv", ".avi",
];

/// Check whether a file name carries a recognized media extension
pub fn is_media_file(name: &str) -> bool {
    MEDIA_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// File names in the identifier's staging directory, sorted. `None` if the directory is missing.
fn staged_file_names(save_dir: &Path, content_id: &str) -> Option<Vec<String>> {
    let final_dir = save_dir.join(content_id);
    let entries = fs_err::read_dir(&final_dir).ok()?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    Some(names)
}

/// Check if media files exist in the identifier's staging directory
pub fn is_video_downloaded(save_dir: &Path, content_id: &str) -> bool {
    staged_file_names(save_dir, content_id)
        .map(|names| names.iter().any(|name| is_media_file(name)))
        .unwrap_or(false)
}

/// Name of the media file, first in lexicographic order when several exist
pub fn get_media_file_name(save_dir: &Path, content_id: &str) -> Option<String> {
    staged_file_names(save_dir, content_id)?
        .into_iter()
        .find(|name| is_media_file(name))
}

/// Files currently staged for an identifier, for diagnostics
pub fn list_staged_files(save_dir: &Path, content_id: &str) -> Vec<String> {
    staged_file_names(save_dir, content_id).unwrap_or_default()
}

/// Copy every staged file to `<output_path>/<content_id>/`, keeping timestamps.
///
/// The staging copy is never removed. Returns the number of files copied.
pub fn save_locally(save_dir: &Path, content_id: &str, output_path: &Path) -> Result<usize> {
    let source_dir = save_dir.join(content_id);
    let dest_dir = output_path.join(content_id);

    let mut copied = 0usize;
    let mut total_bytes = 0u64;

    for entry in fs_err::read_dir(&source_dir)? {
        let entry = entry?;
        let local_file_path = entry.path();
        if !local_file_path.is_file() {
            continue;
        }

        let dest_path = dest_dir.join(entry.file_name());
        fs_err::create_dir_all(&dest_dir)?;

        total_bytes += copy_preserving_times(&local_file_path, &dest_path)?;
        copied += 1;
    }

    tracing::info!(
        "Copied {} files ({}) for {} to {}",
        copied,
        format_file_size(total_bytes),
        content_id,
        dest_dir.display()
    );

    Ok(copied)
}

/// Copy contents, then carry over access and modification times, then permissions.
///
/// Times are set through the writable handle before the source's permission bits
/// are applied to the destination.
fn copy_preserving_times(source: &Path, dest: &Path) -> Result<u64> {
    let metadata = fs_err::metadata(source)?;

    // An existing read-only copy from an earlier run must be replaceable
    if let Ok(existing) = fs_err::metadata(dest) {
        if existing.permissions().readonly() {
            fs_err::remove_file(dest)?;
        }
    }

    let mut reader = fs_err::File::open(source)?;
    let mut writer = fs_err::File::create(dest)?;
    let bytes = std::io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;

    let mut times = FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }

    writer
        .file()
        .set_times(times)
        .with_context(|| format!("Failed to set timestamps on {}", dest.display()))?;
    drop(writer);

    fs_err::set_permissions(dest, metadata.permissions())?;

    Ok(bytes)
}
