//! Archive extraction for downloaded release artifacts.
//!
//! Two formats cover every tool the toolbox installs: zip (terraform,
//! vault) and gzipped tar (helm, k9s, the gcloud SDK). Extraction always
//! targets a directory the caller controls inside the scratch space or a
//! tool's own subdirectory; no path outside `dest` is ever written.

use crate::log_debug;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tar::Archive;
use zip::ZipArchive;

/// Extracts a zip archive into `dest`, creating it if needed.
pub fn unzip(src: &Path, dest: &Path) -> io::Result<()> {
    log_debug!(
        "Unzip {} -> {}",
        src.display().to_string().blue(),
        dest.display().to_string().cyan()
    );
    fs::create_dir_all(dest)?;
    let file = File::open(src)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| io::Error::other(format!("bad zip {}: {e}", src.display())))?;
    archive
        .extract(dest)
        .map_err(|e| io::Error::other(format!("unzip {}: {e}", src.display())))?;
    Ok(())
}

/// Extracts a .tar.gz archive into `dest`, creating it if needed.
pub fn untar_gz(src: &Path, dest: &Path) -> io::Result<()> {
    log_debug!(
        "Untar {} -> {}",
        src.display().to_string().blue(),
        dest.display().to_string().cyan()
    );
    fs::create_dir_all(dest)?;
    let tar_gz = File::open(src)?;
    let decompressor = GzDecoder::new(tar_gz);
    let mut archive = Archive::new(decompressor);
    archive.unpack(dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn unzip_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("tool.zip");

        let file = File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("tool/tool", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        writer.finish().unwrap();

        let out = dir.path().join("out");
        unzip(&archive_path, &out).unwrap();
        assert_eq!(fs::read(out.join("tool/tool")).unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn untar_gz_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("tool.tar.gz");

        let file = File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let payload = b"binary bytes";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "linux-amd64/tool", payload.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let out = dir.path().join("out");
        untar_gz(&archive_path, &out).unwrap();
        assert_eq!(fs::read(out.join("linux-amd64/tool")).unwrap(), payload);
    }

    #[test]
    fn unzip_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip at all").unwrap();
        assert!(unzip(&bogus, &dir.path().join("out")).is_err());
    }
}
