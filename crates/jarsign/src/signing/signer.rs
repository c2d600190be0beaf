use std::io;
use std::path::Path;

use crate::error::SigningError;
use crate::request::{DigestAlgorithm, SignatureAlgorithm};

use super::key::SigningCredentials;

/// Everything besides the paths that signing one archive needs.
#[derive(Clone, Copy)]
pub struct SignParams<'a> {
    pub credentials: &'a SigningCredentials,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature_name: &'a str,
    /// Written as `Created-By` in the manifest and signature file.
    pub signer_identity: &'a str,
    pub digest_algorithm: DigestAlgorithm,
    pub timestamp_url: Option<&'a str>,
}

/// The collaborator that does the cryptographic work on an archive.
pub trait JarSigner {
    /// Whether the archive already holds a signature called `signature_name`.
    fn has_existing_signature(&self, jar: &Path, signature_name: &str) -> io::Result<bool>;

    /// Signs `input`. With `output` of `None` the input is replaced.
    fn sign(
        &self,
        input: &Path,
        output: Option<&Path>,
        params: &SignParams<'_>,
    ) -> Result<(), SigningError>;
}
