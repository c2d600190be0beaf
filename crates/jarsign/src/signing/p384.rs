use anyhow::{Context, Result, anyhow};
use p384::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use p384::pkcs8::{DecodePrivateKey, EncodePublicKey};

use super::key::{EcKeyEncoding, KeySigner};
use crate::request::{KeyPairType, SignatureAlgorithm};

/// ECDSA signer on NIST P-384 (secp384r1).
///
/// Digests shorter than half the field size (SHA-1) are refused.
pub struct P384KeySigner {
    signing_key: SigningKey,
}

impl P384KeySigner {
    pub fn from_der(der: &[u8], encoding: EcKeyEncoding) -> Result<Self> {
        let secret_key = match encoding {
            EcKeyEncoding::Pkcs8 => p384::SecretKey::from_pkcs8_der(der)
                .map_err(|e| anyhow!("decoding PKCS#8 P-384 private key: {e}"))?,
            EcKeyEncoding::Sec1 => p384::SecretKey::from_sec1_der(der)
                .map_err(|e| anyhow!("decoding SEC1 P-384 private key: {e}"))?,
        };
        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }
}

impl KeySigner for P384KeySigner {
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        anyhow::ensure!(
            algorithm.key_pair_type() == KeyPairType::Ec,
            "{algorithm} cannot be used with an EC key"
        );
        let digest = algorithm.digest().digest(data);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| anyhow!("P-384 sign_prehash with {algorithm} failed: {e}"))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        let der = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .context("encoding P-384 public key to DER")?;
        Ok(der.into_vec())
    }

    fn key_pair_type(&self) -> KeyPairType {
        KeyPairType::Ec
    }
}
