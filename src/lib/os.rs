//! OS facade. The writer's scratch area and the delta engine's "what file
//! did this path name" logic used to lean on platform shims (`ftruncate`,
//! `basename`) directly; this module is the one place that knowledge lives
//! so the rest of the crate stays platform-neutral.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::constants::ENV_TMPDIR;
use crate::error::{ZchunkError, ZchunkErrorKind};
use crate::Result;

/// Truncates (or extends, zero-filled) an open file to exactly `len` bytes.
/// Used by the delta engine to pre-size a sparse output file before
/// streaming chunks into it at arbitrary offsets.
pub fn truncate(file: &File, len: u64) -> Result<()> {
    file.set_len(len).map_err(ZchunkError::from)
}

/// The final path segment, mirroring `basename(3)`: no trailing slashes,
/// and a path with none yields the whole string unchanged.
pub fn last_path_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, tail)) => tail,
        None => trimmed,
    }
}

/// The directory the writer stages compressed chunks in before `close`
/// assembles the final file: `$TMPDIR`, falling back to the platform
/// default when unset.
pub fn scratch_dir() -> PathBuf {
    match std::env::var(ENV_TMPDIR) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Creates a fresh, uniquely named scratch file under [`scratch_dir`].
pub fn create_scratch_file(prefix: &str) -> Result<(PathBuf, File)> {
    let dir = scratch_dir();
    std::fs::create_dir_all(&dir)?;
    // a process-unique-enough name: pid plus an address, no randomness
    // source is available in this crate (see mod.rs docs on forbidden
    // std::time/std::random use during header parsing determinism tests)
    let unique = format!("{}-{}.part", prefix, std::process::id());
    let path: PathBuf = Path::new(&dir).join(unique);
    let file = File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .map_err(ZchunkError::from)?;
    Ok((path, file))
}

/// Errors from this module surface as `Io` errors unless stated otherwise.
pub fn require_parent_exists(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() || parent.exists() => Ok(()),
        Some(parent) => Err(ZchunkError::new(
            ZchunkErrorKind::Io,
            format!("parent directory does not exist: {}", parent.display()),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_path_segment_strips_leading_dirs() {
        assert_eq!(last_path_segment("/var/tmp/archive.zck"), "archive.zck");
        assert_eq!(last_path_segment("archive.zck"), "archive.zck");
        assert_eq!(last_path_segment("/var/tmp/"), "tmp");
        assert_eq!(last_path_segment("/"), "");
    }

    #[test]
    fn scratch_dir_honors_tmpdir_env() {
        std::env::set_var(ENV_TMPDIR, "/tmp/zchunk-test-scratch");
        assert_eq!(scratch_dir(), PathBuf::from("/tmp/zchunk-test-scratch"));
        std::env::remove_var(ENV_TMPDIR);
    }

    #[test]
    fn create_scratch_file_round_trips() {
        std::env::set_var(ENV_TMPDIR, std::env::temp_dir());
        let (path, file) = create_scratch_file("zchunk-os-test").unwrap();
        assert!(path.exists());
        drop(file);
        std::fs::remove_file(path).unwrap();
        std::env::remove_var(ENV_TMPDIR);
    }
}
