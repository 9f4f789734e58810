use crate::error::ArchiveError;
use crate::format::ArchiveFormat;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;
use zip::ZipArchive;

/// Extract `archive` into `dest`, which must be an existing (typically
/// freshly staged) directory.
///
/// All members are validated before anything is written: member types are
/// restricted to regular files, directories, hard links, and symlinks, and
/// every member path and link target must stay inside the extraction root.
/// The first violation aborts the extraction with nothing written to `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let Some(format) = ArchiveFormat::detect(archive)? else {
        return Err(ArchiveError::UnrecognizedFormat {
            path: archive.to_path_buf(),
        });
    };

    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        ArchiveFormat::Tar | ArchiveFormat::TarGz | ArchiveFormat::TarZstd => {
            // Compressed streams can't rewind, so validate on one pass over a
            // fresh reader and unpack on a second.
            validate_tar(tar::Archive::new(tar_reader(archive, format)?))?;
            let mut unpacker = tar::Archive::new(tar_reader(archive, format)?);
            unpacker.set_preserve_permissions(true);
            unpacker.unpack(dest)?;
            Ok(())
        }
    }
}

fn tar_reader(path: &Path, format: ArchiveFormat) -> Result<Box<dyn Read>, ArchiveError> {
    let file = File::open(path)?;
    Ok(match format {
        ArchiveFormat::Tar | ArchiveFormat::Zip => Box::new(file),
        ArchiveFormat::TarGz => Box::new(flate2::read::GzDecoder::new(file)),
        ArchiveFormat::TarZstd => Box::new(zstd::Decoder::new(file)?),
    })
}

fn validate_tar<R: Read>(mut archive: tar::Archive<R>) -> Result<(), ArchiveError> {
    let root = synthetic_root();

    for entry in archive.entries()? {
        let entry = entry?;
        let entry_type = entry.header().entry_type();
        let path = entry.path()?.into_owned();

        match entry_type {
            EntryType::Regular
            | EntryType::Directory
            | EntryType::Link
            | EntryType::Symlink
            | EntryType::Continuous
            | EntryType::GNUSparse => {}
            _ => return Err(ArchiveError::UnsupportedEntryType { path }),
        }

        if resolve_within(root, &path).is_none() {
            return Err(ArchiveError::UnsafePath { path });
        }

        if matches!(entry_type, EntryType::Link | EntryType::Symlink) {
            let target = entry
                .link_name()?
                .map(|target| target.into_owned())
                .unwrap_or_default();
            if resolve_within(root, &target).is_none() {
                return Err(ArchiveError::UnsafeLink { path, target });
            }
        }
    }

    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let root = synthetic_root();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let path = PathBuf::from(entry.name());

        if resolve_within(root, &path).is_none() {
            return Err(ArchiveError::UnsafePath { path });
        }

        let is_symlink = entry
            .unix_mode()
            .is_some_and(|mode| mode & 0o170000 == 0o120000);
        if is_symlink {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            let target = PathBuf::from(target);
            if resolve_within(root, &target).is_none() {
                return Err(ArchiveError::UnsafeLink { path, target });
            }
        }
    }

    zip.extract(dest)?;
    Ok(())
}

fn synthetic_root() -> &'static Path {
    // Member paths are resolved against a fixed fictional root; only the
    // lexical containment check matters, nothing is ever created here.
    Path::new("/ferry-extraction-root")
}

/// Resolve `member` against `root` lexically, without touching the
/// filesystem. Returns `None` when the member is absolute or would escape the
/// root through `..` components.
fn resolve_within(root: &Path, member: &Path) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for component in member.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
                if !resolved.starts_with(root) {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if resolved.starts_with(root) {
        Some(resolved)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_allows_nested_and_dotted_paths() {
        let root = synthetic_root();
        assert!(resolve_within(root, Path::new("a/b/c.txt")).is_some());
        assert!(resolve_within(root, Path::new("./a/./b")).is_some());
        assert!(resolve_within(root, Path::new("a/../b")).is_some());
    }

    #[test]
    fn containment_rejects_escapes() {
        let root = synthetic_root();
        assert!(resolve_within(root, Path::new("../evil")).is_none());
        assert!(resolve_within(root, Path::new("a/../../evil")).is_none());
        assert!(resolve_within(root, Path::new("/etc/passwd")).is_none());
    }

    #[test]
    fn popping_back_to_the_root_itself_is_fine() {
        let root = synthetic_root();
        assert_eq!(resolve_within(root, Path::new("a/..")), Some(root.to_path_buf()));
        assert!(resolve_within(root, Path::new("a/../..")).is_none());
    }
}
