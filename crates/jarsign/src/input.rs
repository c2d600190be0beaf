use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{FileFormatError, SignJarError};
use crate::request::SigningRequestDraft;

const JAR_SUFFIX: &str = ".jar";

/// Opens `path` as a ZIP/JAR archive and closes it again.
pub fn verify_archive(path: &Path) -> Result<(), FileFormatError> {
    let opened = File::open(path)
        .map_err(zip::result::ZipError::Io)
        .and_then(ZipArchive::new);
    match opened {
        Ok(_archive) => Ok(()),
        Err(source) => Err(FileFormatError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Regular files directly inside `folder` whose name ends with `.jar`.
///
/// Symlinks count when they resolve to a regular file. The match is case-sensitive and not recursive. Results are sorted by
/// file name.
pub fn discover_jars(folder: &Path) -> io::Result<Vec<PathBuf>> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let is_jar_name = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(JAR_SUFFIX));
        if is_jar_name && entry.path().is_file() {
            jars.push(entry.path());
        }
    }
    jars.sort();
    Ok(jars)
}

impl SigningRequestDraft {
    /// Uses the given archives as input.
    ///
    /// Every file must open as an archive. On the first that doesn't, the
    /// current selection is kept and the error names that file.
    pub fn select_files(&mut self, files: Vec<PathBuf>) -> Result<(), FileFormatError> {
        for file in &files {
            verify_archive(file).inspect_err(|err| {
                warn!(path = %file.display(), error = %err.source, "not a JAR archive");
            })?;
        }
        debug!(count = files.len(), "input files selected");
        self.input_folder = None;
        self.input_files = files;
        Ok(())
    }

    /// Uses every `.jar` file directly inside `folder` as input.
    pub fn select_folder(&mut self, folder: PathBuf) -> Result<(), SignJarError> {
        let jars = discover_jars(&folder).map_err(|source| SignJarError::Discovery {
            path: folder.clone(),
            source,
        })?;
        debug!(folder = %folder.display(), count = jars.len(), "input folder selected");
        self.input_files = jars;
        self.input_folder = Some(folder);
        Ok(())
    }
}
