use std::io;
use std::path::PathBuf;

use crate::request::{KeyPairType, SignatureAlgorithm};

/// User-correctable problems with the collected parameters.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("An input JAR file is required.")]
    NoInputFiles,
    #[error("A signature name is required.")]
    EmptySignatureName,
    #[error("Signature name '{0}' may only contain letters, digits, '-' and '_'.")]
    InvalidSignatureName(String),
    #[error("A timestamp server URL is required when timestamping is enabled.")]
    MissingTimestampUrl,
    #[error("A prefix or suffix is required for output JAR files.")]
    MissingOutputAffix,
    #[error("Signature algorithm {algorithm} cannot be used with a {key_type} key.")]
    IncompatibleAlgorithm {
        algorithm: SignatureAlgorithm,
        key_type: KeyPairType,
    },
}

/// A selected file could not be opened as a JAR archive.
#[derive(Debug, thiserror::Error)]
#[error("Could not open '{}' as a JAR file.", path.display())]
pub struct FileFormatError {
    pub path: PathBuf,
    #[source]
    pub source: zip::result::ZipError,
}

impl FileFormatError {
    pub fn probable_causes(&self) -> &'static [&'static str] {
        &["The file is not a JAR file.", "The JAR file is corrupted."]
    }
}

/// Failure signing a single archive. Reported per file.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("signature algorithm {algorithm} does not match the {key_type} signing key")]
    AlgorithmMismatch {
        algorithm: SignatureAlgorithm,
        key_type: KeyPairType,
    },
    #[error("no signing certificate supplied")]
    MissingCertificate,
    #[error("invalid signing certificate: {0}")]
    Certificate(String),
    #[error("encoding signature block: {0}")]
    Encoding(#[from] der::Error),
    #[error("signing failed: {0:#}")]
    Key(anyhow::Error),
    #[error("timestamping failed: {0:#}")]
    Timestamp(anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SignJarError {
    #[error(transparent)]
    Unexpected(#[from] eyre::Report),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    FileFormat(#[from] FileFormatError),
    #[error("Overwrite of '{}' declined.", path.display())]
    OverwriteDeclined { path: PathBuf },
    #[error("Could not check '{}' for existing signatures: {source}", path.display())]
    SignatureCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not read input folder '{}': {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SignJarError {
    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SignJarError::Unexpected(_) => 1,
            SignJarError::Validation(_)
            | SignJarError::FileFormat(_)
            | SignJarError::Discovery { .. } => 2,
            SignJarError::OverwriteDeclined { .. } => 3,
            SignJarError::SignatureCheck { .. } => 4,
        }
    }
}
