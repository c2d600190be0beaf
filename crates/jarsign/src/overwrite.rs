use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::SignJarError;
use crate::output::OutputMapping;
use crate::request::OutputMode;
use crate::signing::JarSigner;

/// Answer to a single overwrite confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Proceed,
    /// Proceed and do not ask again for the rest of this check.
    SkipRemaining,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteConflict<'a> {
    OutputFile {
        path: &'a Path,
    },
    ExistingSignature {
        path: &'a Path,
        signature_name: &'a str,
    },
}

impl OverwriteConflict<'_> {
    pub fn path(&self) -> &Path {
        match self {
            OverwriteConflict::OutputFile { path } => path,
            OverwriteConflict::ExistingSignature { path, .. } => path,
        }
    }
}

impl fmt::Display for OverwriteConflict<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwriteConflict::OutputFile { path } => write!(
                f,
                "The file '{}' already exists. Overwrite it?",
                path.display()
            ),
            OverwriteConflict::ExistingSignature {
                path,
                signature_name,
            } => write!(
                f,
                "'{}' already contains a signature named '{}'. Overwrite it?",
                path.display(),
                signature_name
            ),
        }
    }
}

/// Asks the user about one overwrite conflict.
pub trait ConfirmPrompt {
    fn confirm(&mut self, conflict: &OverwriteConflict<'_>) -> OverwritePolicy;
}

/// Confirms everything without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl ConfirmPrompt for AssumeYes {
    fn confirm(&mut self, _conflict: &OverwriteConflict<'_>) -> OverwritePolicy {
        OverwritePolicy::SkipRemaining
    }
}

/// Confirms overwriting output files that already exist.
///
/// Only affixed output mode is checked; in-place outputs are the inputs.
/// Declining clears `mapping` and aborts the whole batch.
pub fn confirm_output_overwrites(
    mapping: &mut OutputMapping,
    mode: &OutputMode,
    prompt: &mut dyn ConfirmPrompt,
) -> Result<(), SignJarError> {
    if *mode == OutputMode::InPlace {
        return Ok(());
    }

    let mut skip_remaining = false;
    let mut declined: Option<PathBuf> = None;

    for output in mapping.outputs() {
        if skip_remaining {
            break;
        }
        if !output.is_file() {
            continue;
        }
        match prompt.confirm(&OverwriteConflict::OutputFile { path: output }) {
            OverwritePolicy::Proceed => {}
            OverwritePolicy::SkipRemaining => skip_remaining = true,
            OverwritePolicy::Abort => {
                declined = Some(output.to_path_buf());
                break;
            }
        }
    }

    if let Some(path) = declined {
        warn!(path = %path.display(), "output overwrite declined");
        mapping.clear();
        return Err(SignJarError::OverwriteDeclined { path });
    }
    Ok(())
}

/// Confirms replacing signatures of the same name already in the inputs.
///
/// Once the user picks "don't ask again", the remaining inputs are taken
/// as confirmed without being checked.
pub fn confirm_signature_overwrites(
    inputs: &[PathBuf],
    signature_name: &str,
    signer: &dyn JarSigner,
    prompt: &mut dyn ConfirmPrompt,
) -> Result<(), SignJarError> {
    let mut skip_remaining = false;

    for input in inputs {
        let exists = signer
            .has_existing_signature(input, signature_name)
            .map_err(|source| {
                warn!(path = %input.display(), error = %source, "existing-signature check failed");
                SignJarError::SignatureCheck {
                    path: input.clone(),
                    source,
                }
            })?;

        if exists {
            let conflict = OverwriteConflict::ExistingSignature {
                path: input,
                signature_name,
            };
            match prompt.confirm(&conflict) {
                OverwritePolicy::Proceed => {}
                OverwritePolicy::SkipRemaining => skip_remaining = true,
                OverwritePolicy::Abort => {
                    warn!(path = %input.display(), signature_name, "signature overwrite declined");
                    return Err(SignJarError::OverwriteDeclined {
                        path: input.clone(),
                    });
                }
            }
        }

        if skip_remaining {
            debug!("skipping remaining signature checks");
            return Ok(());
        }
    }
    Ok(())
}
