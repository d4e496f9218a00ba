use std::io::{Cursor, Write};
use std::path::Path;

use sitedeploy_archive::{
    ArchiveFormat, ArchiveReport, Compression, EntryKind, Error, ExtractOptions, Result,
    extract_archive,
};
use tar::{EntryType, Header};

/// Append an entry with a raw name, bypassing the builder's own path checks
/// so hostile names can be written.
fn append_raw(builder: &mut tar::Builder<Vec<u8>>, name: &str, kind: EntryType, data: &[u8], mode: u32) {
    let mut header = Header::new_gnu();
    let bytes = name.as_bytes();
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_entry_type(kind);
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append(&header, data).unwrap();
}

/// Classify `content_type` and extract, the way a deploy request does.
fn extract_typed(data: Vec<u8>, staging: &Path, content_type: &str) -> Result<ArchiveReport> {
    let format = ArchiveFormat::from_content_type(content_type)?;
    extract_archive(Cursor::new(data), staging, format, &ExtractOptions::default())
}

fn site_tar() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "a/b/c.txt", EntryType::Regular, b"hello from c\n", 0o644);
    append_raw(&mut builder, "a/d/", EntryType::Directory, b"", 0o755);
    builder.into_inner().unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn assert_site_layout(root: &Path) {
    assert_eq!(
        std::fs::read(root.join("a/b/c.txt")).unwrap(),
        b"hello from c\n"
    );
    let d = root.join("a/d");
    assert!(d.is_dir());
    assert_eq!(std::fs::read_dir(&d).unwrap().count(), 0);
}

#[test]
fn test_extract_plain_tar() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let report = extract_typed(site_tar(), &staging, "application/x-tar").unwrap();

    assert_site_layout(&staging);
    assert_eq!(report.format, ArchiveFormat::Tar(Compression::None));
    assert_eq!(report.entry_count, 2);
    assert_eq!(report.total_bytes, 13);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.entries[0].kind, EntryKind::File);
    assert_eq!(report.entries[0].target_path, std::path::absolute(&staging).unwrap().join("a/b/c.txt"));
    assert_eq!(report.entries[1].kind, EntryKind::Directory);
}

#[test]
fn test_extract_gzip_tar() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let report = extract_typed(gzip(&site_tar()), &staging, "application/x-tar+gzip").unwrap();

    assert_site_layout(&staging);
    assert_eq!(report.format, ArchiveFormat::Tar(Compression::Gzip));
}

#[test]
fn test_plain_tar_declared_as_gzip_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let err = extract_typed(site_tar(), &staging, "application/gzip").unwrap_err();

    assert!(matches!(err, Error::NotGzip));
    assert!(err.is_input_error());
    assert!(!staging.exists());
}

#[test]
fn test_parent_traversal_aborts_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    std::fs::create_dir(&root).unwrap();
    let staging = root.join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "index.html", EntryType::Regular, b"ok", 0o644);
    append_raw(&mut builder, "../../etc/passwd", EntryType::Regular, b"root::0:0", 0o644);
    append_raw(&mut builder, "../escape.txt", EntryType::Regular, b"gotcha", 0o644);
    let data = builder.into_inner().unwrap();

    let err = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::PathTraversal { .. }), "{err}");
    assert!(err.is_input_error());
    assert!(!dir.path().join("etc").exists());
    assert!(!root.join("escape.txt").exists());
    // Extraction does not clean up after itself.
    assert!(staging.join("index.html").exists());
}

#[test]
fn test_sibling_prefix_is_not_inside() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "../site.abc-tmp-evil/x", EntryType::Regular, b"x", 0o644);
    let data = builder.into_inner().unwrap();

    let err = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::PathTraversal { .. }));
    assert!(!dir.path().join("site.abc-tmp-evil").exists());
}

#[test]
fn test_symlinks_and_hardlinks_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "index.html", EntryType::Regular, b"<html/>", 0o644);

    let mut link = Header::new_gnu();
    link.set_entry_type(EntryType::Symlink);
    link.set_size(0);
    link.set_mode(0o777);
    builder
        .append_link(&mut link, "latest.html", "index.html")
        .unwrap();

    let mut hard = Header::new_gnu();
    hard.set_entry_type(EntryType::Link);
    hard.set_size(0);
    hard.set_mode(0o644);
    builder
        .append_link(&mut hard, "copy.html", "index.html")
        .unwrap();
    let data = builder.into_inner().unwrap();

    let report = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap();

    assert_eq!(report.entry_count, 1);
    assert_eq!(report.skipped, 2);
    assert!(staging.join("index.html").is_file());
    assert!(std::fs::symlink_metadata(staging.join("latest.html")).is_err());
    assert!(std::fs::symlink_metadata(staging.join("copy.html")).is_err());
}

#[test]
fn test_current_dir_entry_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "./", EntryType::Directory, b"", 0o755);
    append_raw(&mut builder, "./index.html", EntryType::Regular, b"home", 0o644);
    let data = builder.into_inner().unwrap();

    let report = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap();

    assert_eq!(report.entry_count, 2);
    assert_eq!(std::fs::read(staging.join("index.html")).unwrap(), b"home");
}

#[test]
fn test_file_entry_naming_the_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "a/..", EntryType::Regular, b"clobber", 0o644);
    let data = builder.into_inner().unwrap();

    let err = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::PathTraversal { .. }));
    assert!(staging.is_dir());
}

#[cfg(unix)]
#[test]
fn test_absolute_entry_lands_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "/etc/motd", EntryType::Regular, b"welcome", 0o644);
    let data = builder.into_inner().unwrap();

    extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap();

    assert_eq!(std::fs::read(staging.join("etc/motd")).unwrap(), b"welcome");
}

#[test]
fn test_garbage_is_a_malformed_archive() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let err = extract_archive(
        Cursor::new(vec![b'A'; 1024]),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Corrupted { .. }), "{err}");
    assert!(err.is_input_error());
}

#[cfg(unix)]
#[test]
fn test_entry_modes_are_preserved() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "bin/", EntryType::Directory, b"", 0o700);
    append_raw(&mut builder, "bin/run.sh", EntryType::Regular, b"#!/bin/sh\n", 0o700);
    append_raw(&mut builder, "secret.txt", EntryType::Regular, b"s", 0o600);
    let data = builder.into_inner().unwrap();

    extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap();

    let mode = |p: &str| {
        std::fs::metadata(staging.join(p))
            .unwrap()
            .permissions()
            .mode()
            & 0o777
    };
    assert_eq!(mode("bin"), 0o700);
    assert_eq!(mode("bin/run.sh"), 0o700);
    assert_eq!(mode("secret.txt"), 0o600);
}

#[cfg(unix)]
#[test]
fn test_special_mode_bits_are_dropped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("site.abc-tmp");

    let mut builder = tar::Builder::new(Vec::new());
    append_raw(&mut builder, "pub/", EntryType::Directory, b"", 0o1777);
    append_raw(&mut builder, "run.sh", EntryType::Regular, b"#!/bin/sh\n", 0o4755);
    append_raw(&mut builder, "group.sh", EntryType::Regular, b"#!/bin/sh\n", 0o2755);
    let data = builder.into_inner().unwrap();

    let report = extract_archive(
        Cursor::new(data),
        &staging,
        ArchiveFormat::Tar(Compression::None),
        &ExtractOptions::default(),
    )
    .unwrap();

    for entry in &report.entries {
        assert_eq!(entry.mode.unwrap() & 0o7000, 0, "{}", entry.original_path.display());
    }
    for name in ["pub", "run.sh", "group.sh"] {
        let mode = std::fs::metadata(staging.join(name))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o7000, 0, "{name} kept special bits: {mode:o}");
    }
}
