//! [`ArchivePackageReader`] backed by the `zip` crate.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use log::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::ArchivePackageReader;
use crate::error::{Error, Result};

/// Reads and rewrites zip packages on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPackage;

impl ZipPackage {
    pub fn new() -> Self {
        Self
    }

    fn open(archive: &Path) -> Result<ZipArchive<BufReader<File>>> {
        let file = File::open(archive).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(archive.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Ok(ZipArchive::new(BufReader::new(file))?)
    }
}

/// Entry names in a package never start with a slash.
fn normalize_entry(entry: &str) -> &str {
    entry.trim_start_matches('/')
}

impl ArchivePackageReader for ZipPackage {
    fn read_entry(&self, archive: &Path, entry: &str) -> Result<Option<Vec<u8>>> {
        let mut zip = Self::open(archive)?;
        let mut file = match zip.by_name(normalize_entry(entry)) {
            Ok(f) => f,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if file.encrypted() {
            return Err(Error::Locked);
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        debug!("Read {} ({} bytes)", entry, data.len());
        Ok(Some(data))
    }

    fn list_entries(&self, archive: &Path) -> Result<Vec<String>> {
        let mut zip = Self::open(archive)?;
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let f = zip.by_index_raw(i)?;
            names.push(f.name().to_string());
        }
        Ok(names)
    }

    fn write_copy_with_replacements(
        &self,
        src: &Path,
        dest: &Path,
        replacements: &BTreeMap<String, Vec<u8>>,
    ) -> Result<()> {
        let mut source = Self::open(src)?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| Error::Write(e.to_string()))?;
            }
        }
        let out = File::create(dest).map_err(|e| Error::Write(e.to_string()))?;
        let mut writer = ZipWriter::new(out);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut written = BTreeSet::new();
        for i in 0..source.len() {
            let entry = source.by_index_raw(i)?;
            let name = entry.name().to_string();
            match replacements.get(&name) {
                Some(bytes) => {
                    drop(entry);
                    writer
                        .start_file(name.as_str(), options)
                        .map_err(|e| Error::Write(e.to_string()))?;
                    writer
                        .write_all(bytes)
                        .map_err(|e| Error::Write(e.to_string()))?;
                }
                None => {
                    writer
                        .raw_copy_file(entry)
                        .map_err(|e| Error::Write(e.to_string()))?;
                }
            }
            written.insert(name);
        }

        for (name, bytes) in replacements {
            let name = normalize_entry(name);
            if written.contains(name) {
                continue;
            }
            writer
                .start_file(name, options)
                .map_err(|e| Error::Write(e.to_string()))?;
            writer
                .write_all(bytes)
                .map_err(|e| Error::Write(e.to_string()))?;
        }

        writer.finish().map_err(|e| Error::Write(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_package(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_read_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.docx");
        write_package(
            &path,
            &[("[Content_Types].xml", b"<Types/>"), ("word/document.xml", b"<doc/>")],
        );

        let pkg = ZipPackage::new();
        assert_eq!(
            pkg.list_entries(&path).unwrap(),
            vec!["[Content_Types].xml", "word/document.xml"]
        );
        assert_eq!(
            pkg.read_entry(&path, "/word/document.xml").unwrap(),
            Some(b"<doc/>".to_vec())
        );
        assert_eq!(pkg.read_entry(&path, "word/missing.xml").unwrap(), None);
    }

    #[test]
    fn test_missing_archive() {
        let pkg = ZipPackage::new();
        let err = pkg
            .read_entry(Path::new("/no/such/file.docx"), "word/document.xml")
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"PK\x03\x04 truncated garbage").unwrap();
        let err = ZipPackage::new().list_entries(&path).unwrap_err();
        assert!(matches!(err, Error::Parse(_) | Error::Io(_)));
    }

    #[test]
    fn test_write_copy_with_replacements() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.docx");
        let dest = dir.path().join("out/dest.docx");
        write_package(&src, &[("a.xml", b"old"), ("b.xml", b"keep")]);

        let mut replacements = BTreeMap::new();
        replacements.insert("a.xml".to_string(), b"new".to_vec());
        replacements.insert("c.xml".to_string(), b"added".to_vec());

        let pkg = ZipPackage::new();
        pkg.write_copy_with_replacements(&src, &dest, &replacements)
            .unwrap();

        assert_eq!(pkg.list_entries(&dest).unwrap(), vec!["a.xml", "b.xml", "c.xml"]);
        assert_eq!(pkg.read_entry(&dest, "a.xml").unwrap(), Some(b"new".to_vec()));
        assert_eq!(pkg.read_entry(&dest, "b.xml").unwrap(), Some(b"keep".to_vec()));
        assert_eq!(pkg.read_entry(&dest, "c.xml").unwrap(), Some(b"added".to_vec()));
    }
}
