//! Path helpers for locating configuration files.
//!
//! Pure path manipulation except for [`discover_config_path`], which checks
//! candidate files for existence.

use std::path::{Component, Path, PathBuf};

/// Environment variable naming the root configuration file.
pub const CONFIG_PATH_ENV: &str = "LAYERED_CONFIG_PATH";

/// File names tried, in order, when no path is given.
pub const DEFAULT_FILE_NAMES: [&str; 2] = ["config.yaml", "config.yml"];

/// Directory under the user config dir searched last.
pub const USER_CONFIG_SUBDIR: &str = "layered-config";

/// Directory containing `path`; `.` for a bare file name.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Resolve `file` against `dir` unless it is already absolute.
pub fn resolve_relative(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        normalize_path_components(path)
    } else {
        normalize_path_components(&dir.join(path))
    }
}

/// Find the root configuration file when none was given explicitly.
///
/// Checks `LAYERED_CONFIG_PATH`, then the default file names in the working
/// directory, then the same names under the user config directory.
pub fn discover_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        if !explicit.is_empty() {
            return Some(PathBuf::from(explicit));
        }
    }

    let user_dir = dirs::config_dir().map(|dir| dir.join(USER_CONFIG_SUBDIR));
    discover_in(Path::new("."), user_dir.as_deref())
}

/// Search `cwd`, then `user_dir`, for a default-named configuration file.
pub fn discover_in(cwd: &Path, user_dir: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(cwd)
        .chain(user_dir)
        .flat_map(|dir| DEFAULT_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
pub fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => {
                // Windows drive prefix (e.g., C:)
                components.push(Component::Prefix(p));
            }
            Component::RootDir => {
                components.push(Component::RootDir);
            }
            Component::CurDir => {
                // Skip `.` - it refers to current directory
            }
            Component::ParentDir => {
                // Go up one directory if possible
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else {
                    // Can't go up from root or past the start of a relative
                    // path, keep the component
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => {
                components.push(Component::Normal(name));
            }
        }
    }

    if components.is_empty() {
        return PathBuf::from(".");
    }
    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir(Path::new("configs/.rr.yaml")), PathBuf::from("configs"));
        assert_eq!(parent_dir(Path::new(".rr.yaml")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/etc/app/rr.yaml")), PathBuf::from("/etc/app"));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve_relative(Path::new("configs"), "include/a.yaml"),
            PathBuf::from("configs/include/a.yaml")
        );
        assert_eq!(
            resolve_relative(Path::new("configs/env"), "../b.yaml"),
            PathBuf::from("configs/b.yaml")
        );
        assert_eq!(
            resolve_relative(Path::new("."), "./c.yaml"),
            PathBuf::from("c.yaml")
        );
        #[cfg(unix)]
        assert_eq!(
            resolve_relative(Path::new("configs"), "/etc/d.yaml"),
            PathBuf::from("/etc/d.yaml")
        );
    }

    #[test]
    fn test_normalize_path_components() {
        assert_eq!(
            normalize_path_components(Path::new("a/./b/../c")),
            PathBuf::from("a/c")
        );
        assert_eq!(normalize_path_components(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path_components(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_discover_in() {
        let temp = TempDir::new().unwrap();
        let cwd = temp.path().join("cwd");
        let user = temp.path().join("user");
        std::fs::create_dir_all(&cwd).unwrap();
        std::fs::create_dir_all(&user).unwrap();

        assert_eq!(discover_in(&cwd, Some(&user)), None);

        std::fs::write(user.join("config.yml"), "version: '2.7'\n").unwrap();
        assert_eq!(discover_in(&cwd, Some(&user)), Some(user.join("config.yml")));

        std::fs::write(cwd.join("config.yaml"), "version: '2.7'\n").unwrap();
        assert_eq!(discover_in(&cwd, Some(&user)), Some(cwd.join("config.yaml")));
    }
}
