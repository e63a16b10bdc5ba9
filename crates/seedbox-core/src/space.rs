//! Filesystem capacity queries.

use crate::{Result, SeedboxError};
use std::path::Path;

/// Free and total bytes of the filesystem holding a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub free: u64,
    pub total: u64,
}

/// Query the filesystem holding `path`. The path must be absolute.
pub fn disk_space(path: &Path) -> Result<DiskSpace> {
    if !path.is_absolute() {
        return Err(SeedboxError::PathNotAbsolute(path.to_path_buf()));
    }
    let free = fs2::available_space(path).map_err(|e| SeedboxError::io_with_path(e, path))?;
    let total = fs2::total_space(path).map_err(|e| SeedboxError::io_with_path(e, path))?;
    Ok(DiskSpace { free, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_space_of_tempdir() {
        let dir = tempfile::TempDir::new().unwrap();
        let space = disk_space(dir.path()).unwrap();
        assert!(space.total >= space.free);
    }

    #[test]
    fn test_relative_and_missing_paths() {
        assert!(matches!(
            disk_space(Path::new("relative")),
            Err(SeedboxError::PathNotAbsolute(_))
        ));
        let err = disk_space(Path::new("/definitely/not/here/seedbox")).unwrap_err();
        assert_eq!(err.to_rpc_error_code(), 5);
    }
}
