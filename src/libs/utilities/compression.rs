// Unpacks downloaded release artifacts. The version feed declares each
// artifact's format up front, so no content sniffing happens here.

use crate::schemas::versions::ArtifactFormat;
use crate::{log_debug, log_error};
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use zip::ZipArchive;

/// Extracts a downloaded artifact into a fresh `extracted` subdirectory of
/// `dest` and returns that directory's path.
///
/// Standalone executables (`exe` format) are copied through unchanged; the
/// caller treats the copy as the extracted contents.
pub fn extract_artifact(src: &Path, dest: &Path, format: ArtifactFormat) -> io::Result<PathBuf> {
    log_debug!(
        "[Extract] Unpacking {} ({}) into {}",
        src.to_string_lossy().blue(),
        format,
        dest.to_string_lossy().cyan()
    );

    let extracted_path = dest.join("extracted");
    fs::create_dir_all(&extracted_path)?;

    match format {
        ArtifactFormat::Tgz => {
            let tar_gz = File::open(src)?;
            let decompressor = GzDecoder::new(tar_gz);
            let mut archive = Archive::new(decompressor);
            archive.unpack(&extracted_path)?;
        }
        ArtifactFormat::Zip => {
            let file = File::open(src)?;
            let mut archive = ZipArchive::new(file).map_err(|err| {
                log_error!("[Extract] Not a readable zip archive: {}", err);
                io::Error::new(io::ErrorKind::InvalidData, err)
            })?;
            archive
                .extract(&extracted_path)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        }
        ArtifactFormat::Exe => {
            let file_name = src.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "Source path has no filename")
            })?;
            fs::copy(src, extracted_path.join(file_name))?;
        }
    }

    log_debug!(
        "[Extract] Contents available at {}",
        extracted_path.to_string_lossy().green()
    );
    Ok(extracted_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn build_tgz_with_binary(dir: &Path, binary_name: &str) -> PathBuf {
        let archive_path = dir.join("artifact.tgz");
        let file = File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let payload = b"#!/bin/sh\necho metanorma\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, binary_name, payload.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
        archive_path
    }

    #[test]
    fn tgz_artifacts_unpack_into_extracted_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build_tgz_with_binary(tmp.path(), "metanorma");

        let out = extract_artifact(&archive, tmp.path(), ArtifactFormat::Tgz).unwrap();
        assert_eq!(out, tmp.path().join("extracted"));
        assert!(out.join("metanorma").is_file());
    }

    #[test]
    fn exe_artifacts_are_copied_through() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("metanorma.exe");
        File::create(&src).unwrap().write_all(b"MZ").unwrap();

        let out = extract_artifact(&src, tmp.path(), ArtifactFormat::Exe).unwrap();
        assert!(out.join("metanorma.exe").is_file());
    }
}
