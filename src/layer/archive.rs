//! Toolchain archive extraction
//!
//! Expands plain, gzip or bzip2 compressed tarballs into a layer,
//! optionally stripping leading path components. The compression is
//! detected from the archive's magic bytes, not its file name.

use crate::error::{BuildpackError, BuildpackResult};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";

/// Compression of a tarball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    /// Detect the compression from the leading bytes of an archive
    pub fn detect(header: &[u8]) -> Self {
        if header.starts_with(GZIP_MAGIC) {
            Self::Gzip
        } else if header.starts_with(BZIP2_MAGIC) {
            Self::Bzip2
        } else {
            Self::None
        }
    }
}

/// Extract `archive` into `destination`, dropping `strip_components` leading
/// path components from every entry
///
/// Entries that are fully consumed by stripping are skipped. Entries whose
/// path would escape `destination` abort the extraction. Returns the number
/// of entries written.
pub fn extract(archive: &Path, destination: &Path, strip_components: usize) -> BuildpackResult<usize> {
    let err = |reason: String| BuildpackError::Extract {
        archive: archive.to_path_buf(),
        reason,
    };

    let mut file = File::open(archive).map_err(|e| err(e.to_string()))?;
    let mut header = [0u8; 3];
    let read = file.read(&mut header).map_err(|e| err(e.to_string()))?;
    file.seek(SeekFrom::Start(0)).map_err(|e| err(e.to_string()))?;

    fs::create_dir_all(destination).map_err(|e| err(e.to_string()))?;

    let compression = Compression::detect(&header[..read]);
    debug!("Extracting {} ({:?})", archive.display(), compression);

    let reader: Box<dyn Read> = match compression {
        Compression::None => Box::new(file),
        Compression::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(file)),
    };

    unpack(Archive::new(reader), destination, strip_components).map_err(err)
}

fn unpack<R: Read>(
    mut archive: Archive<R>,
    destination: &Path,
    strip_components: usize,
) -> Result<usize, String> {
    let mut count = 0;

    for entry in archive.entries().map_err(|e| format!("reading entries: {}", e))? {
        let mut entry = entry.map_err(|e| format!("reading entry: {}", e))?;
        let entry_path = entry
            .path()
            .map_err(|e| format!("invalid entry path: {}", e))?
            .to_path_buf();

        let Some(relative) = strip(&entry_path, strip_components)? else {
            continue;
        };
        let target = destination.join(&relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("creating {}: {}", parent.display(), e))?;
        }

        // Hard link sources are archive paths and need the same stripping
        if entry.header().entry_type() == EntryType::Link {
            let source = entry
                .link_name()
                .map_err(|e| format!("invalid link name: {}", e))?
                .map(|p| p.to_path_buf());
            if let Some(source) = source {
                if let Some(source) = strip(&source, strip_components)? {
                    fs::hard_link(destination.join(source), &target)
                        .map_err(|e| format!("linking {}: {}", target.display(), e))?;
                    count += 1;
                }
            }
            continue;
        }

        entry
            .unpack(&target)
            .map_err(|e| format!("extracting {}: {}", entry_path.display(), e))?;
        count += 1;
    }

    Ok(count)
}

/// Drop the leading `n` components of `path`
///
/// Returns `None` when nothing remains and an error when the path is not
/// confined to the extraction root.
fn strip(path: &Path, n: usize) -> Result<Option<PathBuf>, String> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {}
            _ => return Err(format!("path traversal detected: {}", path.display())),
        }
    }

    let stripped: PathBuf = components.into_iter().skip(n).collect();
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn tarball(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn release() -> Vec<u8> {
        tarball(&[
            ("solana-release/bin/solana", b"#!/bin/sh\necho solana-cli 1.17.17\n", 0o755),
            ("solana-release/version.yml", b"channel: v1.17.17\n", 0o644),
        ])
    }

    #[test]
    fn detect_compression() {
        assert_eq!(Compression::detect(&[0x1f, 0x8b, 0x08]), Compression::Gzip);
        assert_eq!(Compression::detect(b"BZh9"), Compression::Bzip2);
        assert_eq!(Compression::detect(b"sol"), Compression::None);
        assert_eq!(Compression::detect(&[]), Compression::None);
    }

    #[test]
    fn strip_components() {
        assert_eq!(
            strip(Path::new("solana-release/bin/solana"), 1).unwrap(),
            Some(PathBuf::from("bin/solana"))
        );
        assert_eq!(strip(Path::new("solana-release/"), 1).unwrap(), None);
        assert_eq!(
            strip(Path::new("./solana-release/bin"), 0).unwrap(),
            Some(PathBuf::from("solana-release/bin"))
        );
        assert!(strip(Path::new("solana-release/../../etc/passwd"), 1).is_err());
        assert!(strip(Path::new("/etc/passwd"), 0).is_err());
    }

    #[test]
    fn extract_gzip_with_strip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("solana.tar.gz");
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&release()).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let layer = dir.path().join("layer");
        let count = extract(&archive, &layer, 1).unwrap();

        assert_eq!(count, 2);
        assert!(layer.join("bin/solana").is_file());
        assert_eq!(
            fs::read_to_string(layer.join("version.yml")).unwrap(),
            "channel: v1.17.17\n"
        );
        assert!(!layer.join("solana-release").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(layer.join("bin/solana")).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn extract_bzip2_by_magic_bytes() {
        let dir = TempDir::new().unwrap();
        // Misleading extension: detection goes by content
        let archive = dir.path().join("solana.tar.gz");
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(&release()).unwrap();
        fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let layer = dir.path().join("layer");
        extract(&archive, &layer, 1).unwrap();

        assert!(layer.join("bin/solana").is_file());
    }

    #[test]
    fn extract_plain_tar_without_strip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("solana.tar");
        fs::write(&archive, release()).unwrap();

        let layer = dir.path().join("layer");
        extract(&archive, &layer, 0).unwrap();

        assert!(layer.join("solana-release/bin/solana").is_file());
    }

    #[test]
    fn rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("evil.tar");

        let data = b"owned";
        let mut header = tar::Header::new_old();
        let name = b"solana-release/../../evil";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        let mut builder = tar::Builder::new(Vec::new());
        builder.append(&header, &data[..]).unwrap();
        fs::write(&archive, builder.into_inner().unwrap()).unwrap();

        let layer = dir.path().join("a/layer");
        let err = extract(&archive, &layer, 1).unwrap_err();

        assert!(err.to_string().contains("path traversal"));
        assert!(!dir.path().join("evil").exists());
        assert!(!dir.path().join("a/evil").exists());
    }

    #[test]
    fn missing_archive_errors() {
        let dir = TempDir::new().unwrap();
        let result = extract(&dir.path().join("none.tar"), &dir.path().join("layer"), 0);
        assert!(matches!(result, Err(BuildpackError::Extract { .. })));
    }
}
