//! Confines user-supplied paths to the base directory.
//!
//! Every request path goes through [`resolve`] before the filesystem is
//! touched for content. A [`ResolvedPath`] can only be built here, so holding
//! one means the containment check has already passed.

use soft_canonicalize::soft_canonicalize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::error::StartupError;

/// The canonical directory all browsing is confined to.
#[derive(Debug, Clone)]
pub struct BaseRoot {
    dir: PathBuf,
}

impl BaseRoot {
    /// Canonicalizes `dir` once; the result never changes afterwards.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StartupError> {
        let dir = dir.as_ref();
        let canonical = fs::canonicalize(dir).map_err(|source| StartupError::Resolve {
            path: dir.to_path_buf(),
            source,
        })?;

        if !canonical.is_dir() {
            return Err(StartupError::NotADirectory(canonical));
        }

        Ok(Self { dir: canonical })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Relative, `/`-separated form of a resolved path. Empty for the root.
    pub fn relative(&self, resolved: &ResolvedPath) -> String {
        resolved
            .as_path()
            .strip_prefix(&self.dir)
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default()
    }
}

/// An absolute path known to lie at or below the [`BaseRoot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    // Final component as requested, before symlinks were followed.
    requested_name: Option<String>,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// File name the client asked for. A symlink keeps its own name here,
    /// not its target's. Falls back to the canonical name when the request
    /// ends in `..` or is empty.
    pub fn name(&self) -> Option<&str> {
        self.requested_name
            .as_deref()
            .or_else(|| self.path.file_name().and_then(|n| n.to_str()))
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path '{requested}' is outside the base directory")]
pub struct Rejected {
    pub requested: String,
}

/// Joins `requested` onto the base and checks the canonical result stays inside.
///
/// The path does not have to exist: the deepest existing ancestor is
/// canonicalized (following symlinks) and the rest is appended lexically.
/// Containment is decided component by component, so `/base-evil` is never
/// considered inside `/base`.
pub fn resolve(base: &BaseRoot, requested: &str) -> Result<ResolvedPath, Rejected> {
    let reject = || Rejected {
        requested: requested.to_string(),
    };

    if requested.contains('\0') {
        warn!("Rejected path containing NUL byte");
        return Err(reject());
    }

    let canonical = match soft_canonicalize(&base.dir.join(requested)) {
        Ok(path) => path,
        Err(e) => {
            warn!(
                "Rejected '{}': could not canonicalize under '{}': {}",
                requested,
                base.dir.display(),
                e
            );
            return Err(reject());
        }
    };

    if canonical.starts_with(&base.dir) {
        let requested_name = Path::new(requested)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(ResolvedPath {
            path: canonical,
            requested_name,
        })
    } else {
        warn!(
            "Path traversal attempt: '{}' escapes root '{}'",
            requested,
            base.dir.display()
        );
        Err(reject())
    }
}

/// Missing entries, including a path that runs through a regular file.
pub(crate) fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, BaseRoot) {
        let tmp = TempDir::new().unwrap();
        let base_dir = tmp.path().join("base");
        fs::create_dir_all(base_dir.join("sub/deeper")).unwrap();
        fs::write(base_dir.join("a.py"), "print('hi')\n").unwrap();
        fs::write(base_dir.join("sub/notes.txt"), "notes").unwrap();

        let evil = tmp.path().join("base-evil");
        fs::create_dir_all(&evil).unwrap();
        fs::write(evil.join("loot.txt"), "loot").unwrap();
        fs::write(tmp.path().join("outside.txt"), "outside").unwrap();

        let base = BaseRoot::new(&base_dir).unwrap();
        (tmp, base)
    }

    #[test]
    fn empty_path_is_the_root() {
        let (_tmp, base) = fixture();
        let resolved = resolve(&base, "").unwrap();
        assert_eq!(resolved.as_path(), base.path());
        assert_eq!(base.relative(&resolved), "");
    }

    #[test]
    fn accepts_paths_inside_root() {
        let (_tmp, base) = fixture();

        let resolved = resolve(&base, "sub/notes.txt").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("sub/notes.txt"));
        assert_eq!(base.relative(&resolved), "sub/notes.txt");

        let resolved = resolve(&base, "./sub/deeper/../notes.txt").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("sub/notes.txt"));
    }

    #[test]
    fn dotdot_back_to_root_is_allowed() {
        let (_tmp, base) = fixture();
        let resolved = resolve(&base, "sub/..").unwrap();
        assert_eq!(resolved.as_path(), base.path());
    }

    #[test]
    fn rejects_parent_escapes() {
        let (_tmp, base) = fixture();
        assert!(resolve(&base, "..").is_err());
        assert!(resolve(&base, "../outside.txt").is_err());
        assert!(resolve(&base, "sub/../../outside.txt").is_err());
        assert!(resolve(&base, "../etc/passwd").is_err());
        assert!(resolve(&base, "../../../../../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_sibling_with_shared_prefix() {
        let (_tmp, base) = fixture();
        let err = resolve(&base, "../base-evil/loot.txt").unwrap_err();
        assert_eq!(err.requested, "../base-evil/loot.txt");
        assert!(resolve(&base, "../base-evil").is_err());
    }

    #[test]
    fn absolute_paths_must_land_inside_root() {
        let (tmp, base) = fixture();
        assert!(resolve(&base, "/etc/passwd").is_err());

        let outside = tmp.path().join("outside.txt");
        assert!(resolve(&base, outside.to_str().unwrap()).is_err());

        let inside = base.path().join("a.py");
        let resolved = resolve(&base, inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved.as_path(), inside);
    }

    #[test]
    fn missing_paths_inside_root_still_resolve() {
        let (_tmp, base) = fixture();
        let resolved = resolve(&base, "sub/ghost/file.md").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("sub/ghost/file.md"));
    }

    #[test]
    fn missing_paths_outside_root_are_rejected() {
        let (_tmp, base) = fixture();
        assert!(resolve(&base, "../no-such-dir/file").is_err());
    }

    #[test]
    fn path_through_a_file_never_reaches_anything() {
        let (_tmp, base) = fixture();
        if let Ok(resolved) = resolve(&base, "a.py/inner") {
            assert!(!resolved.as_path().exists());
        }
    }

    #[test]
    fn name_is_the_requested_component() {
        let (_tmp, base) = fixture();
        assert_eq!(resolve(&base, "sub/notes.txt").unwrap().name(), Some("notes.txt"));
        assert_eq!(
            resolve(&base, "sub/deeper/../notes.txt").unwrap().name(),
            Some("notes.txt")
        );
        assert_eq!(resolve(&base, "sub/deeper/..").unwrap().name(), Some("sub"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_keeps_requested_name() {
        let (_tmp, base) = fixture();
        std::os::unix::fs::symlink(
            base.path().join("sub/notes.txt"),
            base.path().join("report.py"),
        )
        .unwrap();

        let resolved = resolve(&base, "report.py").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("sub/notes.txt"));
        assert_eq!(resolved.name(), Some("report.py"));
    }

    #[test]
    fn rejects_nul_bytes() {
        let (_tmp, base) = fixture();
        assert!(resolve(&base, "a.py\0.txt").is_err());
    }

    #[test]
    fn literal_percent_sequences_are_plain_names() {
        let (_tmp, base) = fixture();
        // Query extraction decodes once; anything left is a literal file name.
        let resolved = resolve(&base, "%2e%2e/outside.txt").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("%2e%2e/outside.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_rejected() {
        let (tmp, base) = fixture();
        std::os::unix::fs::symlink(tmp.path(), base.path().join("escape")).unwrap();

        assert!(resolve(&base, "escape").is_err());
        assert!(resolve(&base, "escape/outside.txt").is_err());
        assert!(resolve(&base, "escape/not-there").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_root_resolves_to_target() {
        let (_tmp, base) = fixture();
        std::os::unix::fs::symlink(base.path().join("sub"), base.path().join("alias")).unwrap();

        let resolved = resolve(&base, "alias/notes.txt").unwrap();
        assert_eq!(resolved.as_path(), base.path().join("sub/notes.txt"));
    }

    #[test]
    fn base_root_requires_a_directory() {
        let (_tmp, base) = fixture();
        let err = BaseRoot::new(base.path().join("a.py")).unwrap_err();
        assert!(matches!(err, StartupError::NotADirectory(_)));

        let err = BaseRoot::new(base.path().join("missing")).unwrap_err();
        assert!(matches!(err, StartupError::Resolve { .. }));
    }
}
