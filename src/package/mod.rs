//! Zip-based package access for OOXML documents.
//!
//! [`ArchivePackageReader`] is the seam between the OOXML parser and the
//! archive I/O; [`ZipPackage`] is the default implementation.

mod archive;

pub use self::archive::ZipPackage;

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Byte-level access to named entries of a zip package.
pub trait ArchivePackageReader: Send + Sync {
    /// Read one entry. `Ok(None)` means the archive is fine but has no such entry.
    fn read_entry(&self, archive: &Path, entry: &str) -> Result<Option<Vec<u8>>>;

    /// List entry names in archive order.
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>>;

    /// Write a copy of `src` to `dest`, substituting the bytes of the given
    /// entries. Entries named in `replacements` but absent from `src` are
    /// appended.
    fn write_copy_with_replacements(
        &self,
        src: &Path,
        dest: &Path,
        replacements: &BTreeMap<String, Vec<u8>>,
    ) -> Result<()>;
}
