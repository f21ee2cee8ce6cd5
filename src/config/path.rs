//! Module for searching for controller config files

use std::{
    fs::{self, DirEntry},
    path::PathBuf,
};

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/jsplumber";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("jsplumber") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::debug!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find controller configs.
/// E.g. ["/etc/jsplumber/controllers.d", "/usr/share/jsplumber/controllers"]
pub fn get_controllers_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/jsplumber/controllers.d"),
        PathBuf::from("./rootfs/usr/share/jsplumber/controllers"),
        get_base_path().join("controllers"),
    ]
}

/// Returns a list of file paths for the given directories sorted by filename
/// across all given directories. When two directories contain the same file
/// name, the one listed first in `paths` comes first. The filter argument
/// should return `true` for any files that should be included.
pub fn get_multidir_sorted_files<F>(paths: &[PathBuf], filter: F) -> Vec<PathBuf>
where
    F: Fn(&DirEntry) -> bool,
{
    let mut file_entries: Vec<(usize, DirEntry)> = paths
        .iter()
        .enumerate()
        .flat_map(|(priority, path)| {
            log::trace!("Checking {path:?} for files");
            let files = match fs::read_dir(path) {
                Ok(files) => files,
                Err(e) => {
                    log::debug!("Unable to read directory: {path:?}: {e}");
                    return vec![];
                }
            };
            files
                .filter_map(|r| {
                    let entry = r.ok()?;
                    filter(&entry).then_some((priority, entry))
                })
                .collect()
        })
        .collect();

    file_entries.sort_by(|(priority_a, a), (priority_b, b)| {
        a.file_name()
            .cmp(&b.file_name())
            .then(priority_a.cmp(priority_b))
    });
    log::trace!("Got sorted entries: {file_entries:?}");

    file_entries
        .into_iter()
        .map(|(_, entry)| entry.path())
        .collect()
}
