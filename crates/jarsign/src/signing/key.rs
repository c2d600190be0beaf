use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::request::{KeyPairType, SignatureAlgorithm};

/// A private key that can produce raw signature values.
///
/// Implementations are sync; signing is CPU-bound.
pub trait KeySigner: Send + Sync {
    /// Hashes `data` with the algorithm's digest and signs it. The result is
    /// the signature value as it goes into a PKCS#7 `SignerInfo`.
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// DER `SubjectPublicKeyInfo` of the matching public key.
    fn public_key_der(&self) -> anyhow::Result<Vec<u8>>;

    fn key_pair_type(&self) -> KeyPairType;
}

/// Container format of a DER-encoded EC private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcKeyEncoding {
    /// `PrivateKeyInfo`, PEM label `PRIVATE KEY`.
    Pkcs8,
    /// `ECPrivateKey`, PEM label `EC PRIVATE KEY`.
    Sec1,
}

/// Signing key plus the certificate chain that goes into each signature.
#[derive(Clone)]
pub struct SigningCredentials {
    pub signer: Arc<dyn KeySigner>,
    /// DER certificates, signer certificate first.
    pub certificate_chain: Vec<Vec<u8>>,
}

impl SigningCredentials {
    pub fn new(signer: Arc<dyn KeySigner>, certificate_chain: Vec<Vec<u8>>) -> Self {
        Self {
            signer,
            certificate_chain,
        }
    }

    pub fn key_pair_type(&self) -> KeyPairType {
        self.signer.key_pair_type()
    }

    pub fn signer_certificate(&self) -> Option<&[u8]> {
        self.certificate_chain.first().map(Vec::as_slice)
    }

    /// Hex SHA-256 of the signer certificate.
    pub fn certificate_fingerprint(&self) -> Option<String> {
        self.signer_certificate()
            .map(|der| hex::encode(Sha256::digest(der)))
    }
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("key_pair_type", &self.key_pair_type())
            .field("certificates", &self.certificate_chain.len())
            .finish()
    }
}
