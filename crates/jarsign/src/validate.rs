use tracing::debug;

use crate::error::ValidationError;
use crate::request::{OutputMode, SigningRequest, SigningRequestDraft};
use crate::signature_name::is_valid_signature_name;

/// Checks a draft and builds a [`SigningRequest`] from it.
///
/// Checks run in a fixed order and the first failure is returned. The
/// draft is never modified.
pub fn validate(draft: &SigningRequestDraft) -> Result<SigningRequest, ValidationError> {
    if draft.input_files.is_empty() {
        return Err(ValidationError::NoInputFiles);
    }

    let signature_name = draft.signature_name.trim();
    if signature_name.is_empty() {
        return Err(ValidationError::EmptySignatureName);
    }
    if !is_valid_signature_name(signature_name) {
        return Err(ValidationError::InvalidSignatureName(
            signature_name.to_string(),
        ));
    }

    let timestamp_url = draft.timestamp_url.trim();
    if draft.add_timestamp && timestamp_url.is_empty() {
        return Err(ValidationError::MissingTimestampUrl);
    }

    let output_mode = match &draft.output_mode {
        OutputMode::InPlace => OutputMode::InPlace,
        OutputMode::Affixed { prefix, suffix } => {
            let (prefix, suffix) = (prefix.trim(), suffix.trim());
            if prefix.is_empty() && suffix.is_empty() {
                return Err(ValidationError::MissingOutputAffix);
            }
            OutputMode::Affixed {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            }
        }
    };

    if let Some(key_type) = draft.key_pair_type {
        if draft.signature_algorithm.key_pair_type() != key_type {
            return Err(ValidationError::IncompatibleAlgorithm {
                algorithm: draft.signature_algorithm,
                key_type,
            });
        }
    }

    debug!(
        files = draft.input_files.len(),
        signature_name,
        algorithm = %draft.signature_algorithm,
        digest = %draft.digest_algorithm,
        "signing request validated"
    );

    Ok(SigningRequest {
        input_files: draft.input_files.clone(),
        signature_name: signature_name.to_string(),
        signature_algorithm: draft.signature_algorithm,
        digest_algorithm: draft.digest_algorithm,
        timestamp_url: draft.add_timestamp.then(|| timestamp_url.to_string()),
        output_mode,
    })
}
