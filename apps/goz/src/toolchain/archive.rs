//! Archive extraction for the goz toolchain.
//!
//! Release archives come as ZIP on Windows hosts and as XZ-compressed tarballs
//! everywhere else. Both extractors write entries verbatim below the
//! destination directory and keep the recorded Unix permission bits, so the
//! unpacked tool binaries stay executable.
//!
//! Tarball entries other than directories and regular files (symlinks, hard
//! links, devices, FIFOs, global pax headers) are skipped.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tar::Archive;
use tracing::debug;
use xz2::bufread::XzDecoder;

use crate::errors::GozError;
use crate::toolchain::platform::Os;

/// Mode used for directories without recorded permissions.
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Mode used for files without recorded permissions.
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Bits every extracted directory keeps so it can be populated.
const OWNER_RWX: u32 = 0o700;

/// Container format of a release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.xz`
    TarXz,
}

impl ArchiveFormat {
    /// Returns the format releases use for a host OS.
    #[must_use]
    pub fn for_host(os: Os) -> Self {
        if os.is_windows() {
            Self::Zip
        } else {
            Self::TarXz
        }
    }

    /// Determines the format from the archive file name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownArchiveFormat` if the name ends in neither `.zip` nor `.tar.xz`.
    pub fn from_path(path: &Path) -> Result<Self, GozError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".tar.xz") {
            Ok(Self::TarXz)
        } else {
            Err(GozError::UnknownArchiveFormat {
                path: path.to_path_buf(),
            })
        }
    }

    /// Returns the file extension, including the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => ".zip",
            Self::TarXz => ".tar.xz",
        }
    }
}

/// Extracts an archive (ZIP or tar.xz) to the destination directory.
///
/// The format is chosen from the archive file name. Extracting twice into the
/// same destination overwrites files and reuses directories.
///
/// # Errors
///
/// Returns `UnknownArchiveFormat` for unsupported names and `Extraction` if
/// any entry cannot be decoded or written.
///
/// # Example
///
/// ```ignore
/// extract_archive(Path::new("zig-x86_64-linux-0.15.2.tar.xz"), Path::new("out"))?;
/// ```
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), GozError> {
    match ArchiveFormat::from_path(archive_path)? {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
        ArchiveFormat::TarXz => extract_tar_xz(archive_path, dest_dir),
    }
}

/// Extracts a ZIP archive to the destination directory.
///
/// Creates the destination directory if it does not exist. The first entry
/// that fails aborts extraction; the error names that entry.
///
/// # Errors
///
/// Returns `Extraction` if the archive cannot be read or an entry cannot be
/// written.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), GozError> {
    let file =
        File::open(archive_path).map_err(|e| GozError::extraction(archive_path, None, e))?;

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| GozError::extraction(archive_path, None, e.into()))?;

    create_dir(dest_dir, DEFAULT_DIR_MODE)
        .map_err(|e| GozError::extraction(archive_path, None, e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| GozError::extraction(archive_path, None, e.into()))?;
        let name = entry.name().to_string();

        let Some(entry_path) = entry.enclosed_name() else {
            return Err(GozError::extraction(
                archive_path,
                Some(name),
                unsafe_path_error(),
            ));
        };
        let output_path = dest_dir.join(entry_path);
        let mode = entry.unix_mode().map(|m| m & 0o7777);

        let result = if entry.is_dir() {
            create_dir(&output_path, mode.unwrap_or(DEFAULT_DIR_MODE))
        } else {
            create_parent(&output_path)
                .and_then(|()| write_file(&output_path, &mut entry, mode.unwrap_or(DEFAULT_FILE_MODE)))
        };
        result.map_err(|e| GozError::extraction(archive_path, Some(name), e))?;
    }

    Ok(())
}

/// Extracts an XZ-compressed tarball to the destination directory.
///
/// Entries are streamed: the archive is decompressed once, front to back.
/// Only directory and regular-file entries are written; every other entry
/// type is skipped and extraction continues with the next entry.
///
/// # Errors
///
/// Returns `Extraction` on any decode error or if an entry cannot be written.
pub fn extract_tar_xz(archive_path: &Path, dest_dir: &Path) -> Result<(), GozError> {
    let file =
        File::open(archive_path).map_err(|e| GozError::extraction(archive_path, None, e))?;
    let decoder = XzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);

    create_dir(dest_dir, DEFAULT_DIR_MODE)
        .map_err(|e| GozError::extraction(archive_path, None, e))?;

    let entries = archive
        .entries()
        .map_err(|e| GozError::extraction(archive_path, None, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| GozError::extraction(archive_path, None, e))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        extract_tar_entry(&mut entry, dest_dir)
            .map_err(|e| GozError::extraction(archive_path, Some(name), e))?;
    }

    Ok(())
}

fn extract_tar_entry<R: Read>(entry: &mut tar::Entry<'_, R>, dest_dir: &Path) -> io::Result<()> {
    let entry_type = entry.header().entry_type();
    if !entry_type.is_dir() && !entry_type.is_file() {
        debug!(
            entry = %String::from_utf8_lossy(&entry.path_bytes()),
            kind = ?entry_type,
            "skipping unsupported tar entry"
        );
        return Ok(());
    }

    let relative_path = checked_relative_path(&entry.path()?)?;
    let output_path = dest_dir.join(relative_path);
    let mode = entry.header().mode()? & 0o7777;

    if entry_type.is_dir() {
        create_dir(&output_path, mode)
    } else {
        create_parent(&output_path)?;
        write_file(&output_path, entry, mode)
    }
}

/// Rejects absolute paths and `..` components.
fn checked_relative_path(path: &Path) -> io::Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path_error());
            }
        }
    }
    Ok(relative)
}

fn unsafe_path_error() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        "refusing to extract path with parent directory or absolute reference",
    )
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => create_dir(parent, DEFAULT_DIR_MODE),
        None => Ok(()),
    }
}

#[cfg(unix)]
fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(mode | OWNER_RWX)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir(path: &Path, _mode: u32) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Writes `reader` to `path`, replacing any existing file, with `mode`.
fn write_file(path: &Path, reader: &mut impl Read, mode: u32) -> io::Result<()> {
    if let Ok(meta) = std::fs::symlink_metadata(path)
        && !meta.is_dir()
    {
        // Read-only files from an earlier extraction cannot be truncated.
        std::fs::remove_file(path)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path)?;
    io::copy(reader, &mut file)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tar::{Builder, EntryType, Header};
    use xz2::write::XzEncoder;

    /// Relative path → `Some(contents)` for files, `None` for directories.
    type Tree = BTreeMap<PathBuf, Option<Vec<u8>>>;

    fn collect_tree(root: &Path) -> Tree {
        fn walk(root: &Path, dir: &Path, tree: &mut Tree) {
            for entry in std::fs::read_dir(dir).expect("Should read dir") {
                let path = entry.expect("Should read entry").path();
                let relative = path.strip_prefix(root).unwrap().to_path_buf();
                if path.is_dir() {
                    tree.insert(relative, None);
                    walk(root, &path, tree);
                } else {
                    tree.insert(relative, Some(std::fs::read(&path).unwrap()));
                }
            }
        }
        let mut tree = Tree::new();
        walk(root, root, &mut tree);
        tree
    }

    fn dir_header(mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        header.set_mode(mode);
        header
    }

    fn file_header(len: usize, mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(len as u64);
        header.set_mode(mode);
        header
    }

    fn finish_tar_xz(builder: Builder<XzEncoder<File>>) {
        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish xz");
    }

    /// Creates a tar.xz with `root/`, `root/bin/tool` (0755) and `root/lib/readme.txt`.
    fn create_tar_xz(archive_path: &Path) {
        let file = File::create(archive_path).expect("Should create file");
        let mut builder = Builder::new(XzEncoder::new(file, 6));

        builder
            .append_data(&mut dir_header(0o755), "root/", io::empty())
            .expect("Should append dir");
        builder
            .append_data(&mut dir_header(0o755), "root/bin/", io::empty())
            .expect("Should append dir");
        builder
            .append_data(&mut file_header(12, 0o755), "root/bin/tool", &b"tool content"[..])
            .expect("Should append file");
        builder
            .append_data(&mut dir_header(0o755), "root/lib/", io::empty())
            .expect("Should append dir");
        builder
            .append_data(&mut file_header(6, 0o644), "root/lib/readme.txt", &b"readme"[..])
            .expect("Should append file");

        finish_tar_xz(builder);
    }

    /// Creates a zip with the same logical content as [`create_tar_xz`].
    fn create_zip(archive_path: &Path) {
        let file = File::create(archive_path).expect("Should create file");
        let mut zip = zip::ZipWriter::new(file);
        let dir = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        let exe = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        let plain = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

        zip.add_directory("root/", dir).expect("Should add dir");
        zip.add_directory("root/bin/", dir).expect("Should add dir");
        zip.start_file("root/bin/tool", exe).expect("Should start file");
        zip.write_all(b"tool content").expect("Should write");
        zip.add_directory("root/lib/", dir).expect("Should add dir");
        zip.start_file("root/lib/readme.txt", plain)
            .expect("Should start file");
        zip.write_all(b"readme").expect("Should write");
        zip.finish().expect("Should finish");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/c/zig-x86_64-windows-0.15.2.zip")).unwrap(),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("zig-x86_64-linux-0.15.2.tar.xz")).unwrap(),
            ArchiveFormat::TarXz
        );
    }

    #[test]
    fn format_from_path_rejects_other_suffixes() {
        for name in ["zig.tar.gz", "zig.tgz", "zig.xz", "zig", "zip"] {
            let err = ArchiveFormat::from_path(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, GozError::UnknownArchiveFormat { .. }),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn format_for_host() {
        assert_eq!(ArchiveFormat::for_host(Os::Windows), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::for_host(Os::Linux), ArchiveFormat::TarXz);
        assert_eq!(ArchiveFormat::Zip.extension(), ".zip");
        assert_eq!(ArchiveFormat::TarXz.extension(), ".tar.xz");
    }

    #[test]
    fn extract_archive_rejects_unknown_format_before_touching_disk() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.gz");
        std::fs::write(&archive, b"whatever").unwrap();
        let dest = temp.path().join("out");

        let err = extract_archive(&archive, &dest).unwrap_err();
        assert!(matches!(err, GozError::UnknownArchiveFormat { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn extract_tar_xz_writes_tree() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.xz");
        let dest = temp.path().join("out");
        create_tar_xz(&archive);

        extract_archive(&archive, &dest).expect("Should extract");

        assert_eq!(
            std::fs::read(dest.join("root/bin/tool")).unwrap(),
            b"tool content"
        );
        assert_eq!(
            std::fs::read(dest.join("root/lib/readme.txt")).unwrap(),
            b"readme"
        );
    }

    #[test]
    fn zip_and_tar_xz_produce_identical_trees() {
        let temp = assert_fs::TempDir::new().unwrap();
        let tar_archive = temp.path().join("tool.tar.xz");
        let zip_archive = temp.path().join("tool.zip");
        let tar_dest = temp.path().join("from-tar");
        let zip_dest = temp.path().join("from-zip");
        create_tar_xz(&tar_archive);
        create_zip(&zip_archive);

        extract_archive(&tar_archive, &tar_dest).expect("Should extract tar.xz");
        extract_archive(&zip_archive, &zip_dest).expect("Should extract zip");

        let tar_tree = collect_tree(&tar_dest);
        assert_eq!(tar_tree, collect_tree(&zip_dest));
        assert_eq!(tar_tree.get(Path::new("root/bin")), Some(&None));
        assert_eq!(
            tar_tree.get(Path::new("root/bin/tool")),
            Some(&Some(b"tool content".to_vec()))
        );
    }

    #[test]
    fn zip_without_directory_entries_creates_parents() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("flat.zip");
        let dest = temp.path().join("out");
        {
            let file = File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("a/b/c.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"deep").unwrap();
            zip.finish().unwrap();
        }

        extract_zip(&archive, &dest).expect("Should extract");
        assert_eq!(std::fs::read(dest.join("a/b/c.txt")).unwrap(), b"deep");
    }

    #[test]
    fn tar_skips_links_and_keeps_going() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.xz");
        let dest = temp.path().join("out");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = Builder::new(XzEncoder::new(file, 6));

            builder
                .append_data(&mut file_header(4, 0o644), "first.txt", &b"one!"[..])
                .unwrap();

            let mut symlink = Header::new_gnu();
            symlink.set_entry_type(EntryType::Symlink);
            symlink.set_size(0);
            symlink.set_mode(0o777);
            symlink.set_link_name("first.txt").unwrap();
            builder
                .append_data(&mut symlink, "link.txt", io::empty())
                .unwrap();

            let mut hardlink = Header::new_gnu();
            hardlink.set_entry_type(EntryType::Link);
            hardlink.set_size(0);
            hardlink.set_mode(0o644);
            hardlink.set_link_name("first.txt").unwrap();
            builder
                .append_data(&mut hardlink, "hard.txt", io::empty())
                .unwrap();

            let mut fifo = Header::new_gnu();
            fifo.set_entry_type(EntryType::Fifo);
            fifo.set_size(0);
            fifo.set_mode(0o644);
            builder.append_data(&mut fifo, "pipe", io::empty()).unwrap();

            builder
                .append_data(&mut file_header(4, 0o644), "second.txt", &b"two!"[..])
                .unwrap();

            finish_tar_xz(builder);
        }

        extract_tar_xz(&archive, &dest).expect("Should extract");

        assert_eq!(std::fs::read(dest.join("first.txt")).unwrap(), b"one!");
        assert_eq!(std::fs::read(dest.join("second.txt")).unwrap(), b"two!");
        assert!(std::fs::symlink_metadata(dest.join("link.txt")).is_err());
        assert!(std::fs::symlink_metadata(dest.join("hard.txt")).is_err());
        assert!(std::fs::symlink_metadata(dest.join("pipe")).is_err());
    }

    #[test]
    fn tar_rejects_parent_directory_paths() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.xz");
        let dest = temp.path().join("out");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = Builder::new(XzEncoder::new(file, 6));
            let mut header = file_header(4, 0o644);
            let name = b"../evil.txt";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_cksum();
            builder.append(&header, &b"evil"[..]).unwrap();
            finish_tar_xz(builder);
        }

        let err = extract_tar_xz(&archive, &dest).unwrap_err();
        match err {
            GozError::Extraction { entry, .. } => {
                assert_eq!(entry.as_deref(), Some("../evil.txt"));
            }
            other => panic!("Expected Extraction, got {other:?}"),
        }
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn corrupt_tar_xz_is_an_extraction_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("broken.tar.xz");
        std::fs::write(&archive, b"this is not xz data at all").unwrap();

        let err = extract_tar_xz(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, GozError::Extraction { .. }));
    }

    #[test]
    fn corrupt_zip_is_an_extraction_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, b"PK but not really").unwrap();

        let err = extract_zip(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, GozError::Extraction { .. }));
    }

    #[test]
    fn missing_archive_is_an_extraction_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = extract_archive(&temp.path().join("gone.zip"), &temp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, GozError::Extraction { entry: None, .. }));
    }

    #[test]
    fn repeated_extraction_overwrites() {
        let temp = assert_fs::TempDir::new().unwrap();
        let archive = temp.path().join("tool.tar.xz");
        let dest = temp.path().join("out");
        create_tar_xz(&archive);

        extract_archive(&archive, &dest).expect("First extraction");
        std::fs::write(dest.join("root/bin/tool"), b"locally modified and longer").unwrap();
        extract_archive(&archive, &dest).expect("Second extraction");

        assert_eq!(
            std::fs::read(dest.join("root/bin/tool")).unwrap(),
            b"tool content"
        );

        let zip_archive = temp.path().join("tool.zip");
        create_zip(&zip_archive);
        extract_archive(&zip_archive, &dest).expect("Zip over existing tree");
        assert_eq!(collect_tree(&dest).len(), 5);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn mode(path: &Path) -> u32 {
            std::fs::metadata(path).unwrap().permissions().mode() & 0o777
        }

        #[test]
        fn tar_xz_preserves_mode_bits() {
            let temp = assert_fs::TempDir::new().unwrap();
            let archive = temp.path().join("tool.tar.xz");
            let dest = temp.path().join("out");
            create_tar_xz(&archive);

            extract_tar_xz(&archive, &dest).unwrap();

            assert_eq!(mode(&dest.join("root/bin/tool")), 0o755);
            assert_eq!(mode(&dest.join("root/lib/readme.txt")), 0o644);
        }

        #[test]
        fn zip_preserves_mode_bits() {
            let temp = assert_fs::TempDir::new().unwrap();
            let archive = temp.path().join("tool.zip");
            let dest = temp.path().join("out");
            create_zip(&archive);

            extract_zip(&archive, &dest).unwrap();

            assert_eq!(mode(&dest.join("root/bin/tool")), 0o755);
            assert_eq!(mode(&dest.join("root/lib/readme.txt")), 0o644);
        }

        #[test]
        fn read_only_files_can_be_extracted_twice() {
            let temp = assert_fs::TempDir::new().unwrap();
            let archive = temp.path().join("ro.tar.xz");
            let dest = temp.path().join("out");
            {
                let file = File::create(&archive).unwrap();
                let mut builder = Builder::new(XzEncoder::new(file, 6));
                builder
                    .append_data(&mut file_header(2, 0o444), "ro.txt", &b"ro"[..])
                    .unwrap();
                finish_tar_xz(builder);
            }

            extract_tar_xz(&archive, &dest).unwrap();
            extract_tar_xz(&archive, &dest).unwrap();

            assert_eq!(mode(&dest.join("ro.txt")), 0o444);
        }
    }
}
