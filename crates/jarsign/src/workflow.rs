use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::SignJarError;
use crate::output::{OutputMapping, resolve_outputs};
use crate::overwrite::{ConfirmPrompt, confirm_output_overwrites, confirm_signature_overwrites};
use crate::request::{SigningRequest, SigningRequestDraft};
use crate::signing::{JarSigner, SignParams, SigningCredentials};
use crate::validate::validate;

/// A validated request whose overwrites have all been confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignJob {
    pub request: SigningRequest,
    pub mapping: OutputMapping,
}

/// The confirm action: validate the draft, resolve outputs and clear every
/// overwrite with the user.
pub fn confirm(
    draft: &SigningRequestDraft,
    signer: &dyn JarSigner,
    prompt: &mut dyn ConfirmPrompt,
) -> Result<SignJob, SignJarError> {
    let request = validate(draft)?;
    let mut mapping = resolve_outputs(request.input_files(), request.output_mode());
    confirm_output_overwrites(&mut mapping, request.output_mode(), prompt)?;
    confirm_signature_overwrites(
        request.input_files(),
        request.signature_name(),
        signer,
        prompt,
    )?;
    Ok(SignJob { request, mapping })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Signed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SigningReport {
    pub files: Vec<FileOutcome>,
}

impl SigningReport {
    pub fn signed(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.status == FileStatus::Signed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.signed()
    }

    pub fn all_signed(&self) -> bool {
        self.failed() == 0
    }
}

/// Signs every pair of the job in order. A failure is recorded and the
/// remaining files are still signed.
pub fn sign_all(
    job: &SignJob,
    signer: &dyn JarSigner,
    credentials: &SigningCredentials,
    signer_identity: &str,
) -> SigningReport {
    let request = &job.request;
    let params = SignParams {
        credentials,
        signature_algorithm: request.signature_algorithm(),
        signature_name: request.signature_name(),
        signer_identity,
        digest_algorithm: request.digest_algorithm(),
        timestamp_url: request.timestamp_url(),
    };

    let files = job
        .mapping
        .iter()
        .map(|(input, output)| sign_one(signer, input, output, &params))
        .collect();
    let report = SigningReport { files };
    info!(
        signed = report.signed(),
        failed = report.failed(),
        "signing finished"
    );
    report
}

fn sign_one(
    signer: &dyn JarSigner,
    input: &Path,
    output: &Path,
    params: &SignParams<'_>,
) -> FileOutcome {
    let target = (input != output).then_some(output);
    let status = match signer.sign(input, target, params) {
        Ok(()) => FileStatus::Signed,
        Err(error) => {
            warn!(input = %input.display(), error = %error, "signing failed");
            FileStatus::Failed {
                error: error.to_string(),
            }
        }
    };
    FileOutcome {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        status,
    }
}
