use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::request::OutputMode;

const JAR_EXTENSION: &str = ".jar";

/// Ordered pairing of each input archive with the path it is signed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputMapping {
    pairs: Vec<(PathBuf, PathBuf)>,
}

impl OutputMapping {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.pairs
            .iter()
            .map(|(input, output)| (input.as_path(), output.as_path()))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.pairs.iter().map(|(_, output)| output.as_path())
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }
}

/// Maps every input to its output path.
///
/// In-place mode is the identity. Affixed mode writes
/// `prefix + stem + suffix + ".jar"` into the input's directory, where
/// `stem` is the file name without its last extension. Collisions with
/// existing files are left for the overwrite guard.
pub fn resolve_outputs(inputs: &[PathBuf], mode: &OutputMode) -> OutputMapping {
    let pairs = inputs
        .iter()
        .map(|input| {
            let output = match mode {
                OutputMode::InPlace => input.clone(),
                OutputMode::Affixed { prefix, suffix } => affixed_path(input, prefix, suffix),
            };
            (input.clone(), output)
        })
        .collect();
    OutputMapping { pairs }
}

fn affixed_path(input: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let mut file_name = OsString::from(prefix);
    if let Some(stem) = input.file_stem() {
        file_name.push(stem);
    }
    file_name.push(suffix);
    file_name.push(JAR_EXTENSION);
    input.with_file_name(file_name)
}
