//! Filesystem statistics collector.
//!
//! Reads size and usage of a single mount point via libc statvfs, and looks up
//! the mount table entry for diagnostics.

use std::fs;
use std::path::Path;

use crate::sampler::SampleError;

/// Filesystem statistics for a single mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesystemStats {
    pub size_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
}

/// An entry from /proc/mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
}

/// Gets filesystem statistics using libc statvfs.
///
/// Used bytes are `(f_blocks - f_bfree) * f_frsize`, so blocks reserved for
/// root count as used.
pub fn read_statvfs(path: &Path) -> Result<FilesystemStats, SampleError> {
    use std::ffi::CString;
    use std::mem;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| SampleError::Parse {
        path: path.display().to_string(),
        reason: format!("invalid path: {}", e),
    })?;

    // SAFETY: statvfs only writes into the zeroed struct we own and reads the
    // NUL-terminated path, which outlives the call.
    let stat = unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(SampleError::Io {
                path: path.display().to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        stat
    };

    let block_size = stat.f_frsize as u64;
    let total_blocks = stat.f_blocks as u64;
    let free_blocks = stat.f_bfree as u64;
    let available_blocks = stat.f_bavail as u64;

    let size_bytes = block_size * total_blocks;
    let available_bytes = block_size * available_blocks;
    let used_bytes = size_bytes.saturating_sub(block_size * free_blocks);

    Ok(FilesystemStats {
        size_bytes,
        available_bytes,
        used_bytes,
    })
}

/// Finds the /proc/mounts entry for `mount_point` in the given mount table.
///
/// The last matching line wins, since later mounts shadow earlier ones.
pub fn find_mount(mounts_content: &str, mount_point: &Path) -> Option<MountEntry> {
    let wanted = mount_point.to_string_lossy();

    mounts_content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            Some(MountEntry {
                device: parts[0].to_string(),
                mount_point: parts[1].to_string(),
                fstype: parts[2].to_string(),
            })
        })
        .filter(|entry| entry.mount_point == wanted)
        .last()
}

/// Reads `<proc_root>/mounts` and returns the entry for `mount_point`.
pub fn read_mount_entry(
    proc_root: &Path,
    mount_point: &Path,
) -> Result<Option<MountEntry>, SampleError> {
    let path = proc_root.join("mounts");
    let content = fs::read_to_string(&path).map_err(|source| SampleError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(find_mount(&content, mount_point))
}
