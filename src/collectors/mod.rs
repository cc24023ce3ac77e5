//! Collectors module for host sources that are not plain procfs text files.
//!
//! Currently only filesystem usage via `statvfs(3)` and the mount table.

pub mod filesystem;
