use ferry_archive::{extract, ArchiveError};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

fn write_tar<W: Write>(out: W) -> tar::Builder<W> {
    let mut builder = tar::Builder::new(out);
    append_file(&mut builder, "inner/file.txt", b"hello from the archive");
    append_file(&mut builder, "top.txt", b"top-level");
    builder
}

fn append_file<W: Write>(builder: &mut tar::Builder<W>, path: &str, contents: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, contents).unwrap();
}

fn append_symlink<W: Write>(builder: &mut tar::Builder<W>, path: &str, target: &str) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Symlink);
    header.set_size(0);
    header.set_mode(0o777);
    header.set_cksum();
    builder.append_link(&mut header, path, target).unwrap();
}

// `tar::Builder` refuses to write `..` or absolute names, so hostile fixtures
// set the raw GNU header fields directly.
fn append_raw<W: Write>(
    builder: &mut tar::Builder<W>,
    entry_type: tar::EntryType,
    name: &[u8],
    linkname: Option<&[u8]>,
    contents: &[u8],
) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    {
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name[..name.len()].copy_from_slice(name);
        if let Some(linkname) = linkname {
            gnu.linkname[..linkname.len()].copy_from_slice(linkname);
        }
    }
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, contents).unwrap();
}

fn assert_dir_is_empty(dir: &Path) {
    let leftovers: Vec<_> = fs::read_dir(dir).unwrap().collect();
    assert!(leftovers.is_empty(), "expected empty dir, found {leftovers:?}");
}

#[test]
fn extracts_a_plain_tar() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("data.tar");
    write_tar(File::create(&archive).unwrap())
        .into_inner()
        .unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    extract(&archive, &dest).unwrap();

    assert_eq!(
        fs::read(dest.join("inner/file.txt")).unwrap(),
        b"hello from the archive"
    );
    assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top-level");
}

#[test]
fn extracts_a_gzipped_tar() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("data.tar.gz");
    let encoder = flate2::write::GzEncoder::new(
        File::create(&archive).unwrap(),
        flate2::Compression::default(),
    );
    write_tar(encoder).into_inner().unwrap().finish().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    extract(&archive, &dest).unwrap();
    assert_eq!(
        fs::read(dest.join("inner/file.txt")).unwrap(),
        b"hello from the archive"
    );
}

#[test]
fn extracts_a_zstd_tar() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("data.tar.zst");
    let encoder = zstd::Encoder::new(File::create(&archive).unwrap(), 3).unwrap();
    write_tar(encoder).into_inner().unwrap().finish().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    extract(&archive, &dest).unwrap();
    assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top-level");
}

#[test]
fn extracts_a_zip() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("data.zip");
    let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("inner/file.txt", options).unwrap();
    writer.write_all(b"zipped contents").unwrap();
    writer.finish().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    extract(&archive, &dest).unwrap();
    assert_eq!(
        fs::read(dest.join("inner/file.txt")).unwrap(),
        b"zipped contents"
    );
}

#[cfg(unix)]
#[test]
fn allows_symlinks_that_stay_inside_the_root() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("data.tar");
    let mut builder = write_tar(File::create(&archive).unwrap());
    append_symlink(&mut builder, "link.txt", "top.txt");
    builder.into_inner().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    extract(&archive, &dest).unwrap();
    assert_eq!(fs::read(dest.join("link.txt")).unwrap(), b"top-level");
}

#[test]
fn rejects_members_that_traverse_upwards() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.tar");
    let mut builder = tar::Builder::new(File::create(&archive).unwrap());
    append_raw(
        &mut builder,
        tar::EntryType::Regular,
        b"../evil.txt",
        None,
        b"oops",
    );
    builder.into_inner().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    let err = extract(&archive, &dest).unwrap_err();
    assert!(matches!(err, ArchiveError::UnsafePath { .. }), "{err}");
    assert_dir_is_empty(&dest);
    assert!(!tmp.path().join("evil.txt").exists());
}

#[test]
fn rejects_symlinks_that_point_outside_the_root() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.tar");
    let mut builder = tar::Builder::new(File::create(&archive).unwrap());
    append_file(&mut builder, "ok.txt", b"fine");
    append_raw(
        &mut builder,
        tar::EntryType::Symlink,
        b"link",
        Some(b"../../outside"),
        b"",
    );
    builder.into_inner().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    let err = extract(&archive, &dest).unwrap_err();
    assert!(matches!(err, ArchiveError::UnsafeLink { .. }), "{err}");
    assert_dir_is_empty(&dest);
}

#[test]
fn rejects_absolute_symlink_targets() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.tar");
    let mut builder = tar::Builder::new(File::create(&archive).unwrap());
    append_raw(
        &mut builder,
        tar::EntryType::Symlink,
        b"link",
        Some(b"/etc/passwd"),
        b"",
    );
    builder.into_inner().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    assert!(matches!(
        extract(&archive, &dest).unwrap_err(),
        ArchiveError::UnsafeLink { .. }
    ));
}

#[test]
fn rejects_device_and_fifo_members() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.tar");
    let mut builder = tar::Builder::new(File::create(&archive).unwrap());
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Fifo);
    header.set_size(0);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "pipe", std::io::empty())
        .unwrap();
    builder.into_inner().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    let err = extract(&archive, &dest).unwrap_err();
    assert!(matches!(err, ArchiveError::UnsupportedEntryType { .. }), "{err}");
    assert_dir_is_empty(&dest);
}

#[test]
fn rejects_zip_members_that_traverse_upwards() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.zip");
    let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("../evil.txt", options).unwrap();
    writer.write_all(b"oops").unwrap();
    writer.finish().unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    let err = extract(&archive, &dest).unwrap_err();
    assert!(matches!(err, ArchiveError::UnsafePath { .. }), "{err}");
    assert_dir_is_empty(&dest);
}

#[test]
fn unrecognized_content_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let not_archive = tmp.path().join("notes.txt");
    fs::write(&not_archive, b"definitely not an archive").unwrap();

    let dest = tmp.path().join("out");
    fs::create_dir(&dest).unwrap();
    assert!(matches!(
        extract(&not_archive, &dest).unwrap_err(),
        ArchiveError::UnrecognizedFormat { .. }
    ));
}
