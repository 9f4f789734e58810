use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const ZIP_MAGICS: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Archive container formats ferry knows how to extract.
///
/// Gzip and zstd streams are assumed to wrap a tar archive, which is how
/// they are used for `.tar.gz` / `.tar.zst` files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarZstd,
}

impl ArchiveFormat {
    /// Sniff the archive format from the file's leading bytes (and the ustar
    /// magic at offset 257 for uncompressed tar). Returns `None` when the
    /// content matches no known format.
    pub fn detect(path: &Path) -> io::Result<Option<Self>> {
        let mut file = File::open(path)?;
        let mut header = [0u8; 512];
        let len = read_up_to(&mut file, &mut header)?;
        let header = &header[..len];

        if ZIP_MAGICS.iter().any(|magic| header.starts_with(magic)) {
            return Ok(Some(Self::Zip));
        }
        if header.starts_with(GZIP_MAGIC) {
            return Ok(Some(Self::TarGz));
        }
        if header.starts_with(ZSTD_MAGIC) {
            return Ok(Some(Self::TarZstd));
        }
        if header.len() > TAR_MAGIC_OFFSET + TAR_MAGIC.len()
            && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
        {
            return Ok(Some(Self::Tar));
        }

        Ok(None)
    }
}

/// True when `path` is an existing file holding a recognized archive.
pub fn is_archive(path: &Path) -> bool {
    path.is_file() && matches!(ArchiveFormat::detect(path), Ok(Some(_)))
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
