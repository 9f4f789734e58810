use std::path::PathBuf;

/// Errors produced while validating or extracting an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{} is not a recognized archive format", .path.display())]
    UnrecognizedFormat { path: PathBuf },

    #[error("archive contains unsupported member type for {}", .path.display())]
    UnsupportedEntryType { path: PathBuf },

    #[error("archive member {} would escape the extraction root", .path.display())]
    UnsafePath { path: PathBuf },

    #[error(
        "archive member {} links outside the extraction root (target {})",
        .path.display(),
        .target.display()
    )]
    UnsafeLink { path: PathBuf, target: PathBuf },
}
