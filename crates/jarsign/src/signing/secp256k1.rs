use anyhow::{Context, Result, anyhow};
use k256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use k256::pkcs8::{DecodePrivateKey, EncodePublicKey};
use sha2::{Digest, Sha256};

use super::key::{EcKeyEncoding, KeySigner};
use crate::request::{KeyPairType, SignatureAlgorithm};

/// ECDSA signer on the secp256k1 curve.
pub struct Secp256k1KeySigner {
    signing_key: SigningKey,
}

impl Secp256k1KeySigner {
    /// The SHA-256 hash of the seed becomes the 32-byte private key.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let signing_key = SigningKey::from_bytes((&hash).into())
            .map_err(|e| anyhow!("invalid seed: {e}"))?;
        Ok(Self { signing_key })
    }

    pub fn from_der(der: &[u8], encoding: EcKeyEncoding) -> Result<Self> {
        let secret_key = match encoding {
            EcKeyEncoding::Pkcs8 => k256::SecretKey::from_pkcs8_der(der)
                .map_err(|e| anyhow!("decoding PKCS#8 secp256k1 private key: {e}"))?,
            EcKeyEncoding::Sec1 => k256::SecretKey::from_sec1_der(der)
                .map_err(|e| anyhow!("decoding SEC1 secp256k1 private key: {e}"))?,
        };
        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }
}

impl KeySigner for Secp256k1KeySigner {
    /// Returns a DER-encoded `ECDSA-Sig-Value`.
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        anyhow::ensure!(
            algorithm.key_pair_type() == KeyPairType::Ec,
            "{algorithm} cannot be used with an EC key"
        );
        let digest = algorithm.digest().digest(data);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| anyhow!("secp256k1 sign_prehash failed: {e}"))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        let der = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .context("encoding secp256k1 public key to DER")?;
        Ok(der.into_vec())
    }

    fn key_pair_type(&self) -> KeyPairType {
        KeyPairType::Ec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    fn test_signer() -> Secp256k1KeySigner {
        Secp256k1KeySigner::from_seed("test-seed").unwrap()
    }

    #[test]
    fn deterministic_signing() {
        let signer = test_signer();
        let sig1 = signer.sign(SignatureAlgorithm::Sha256WithEcdsa, b"hello").unwrap();
        let sig2 = signer.sign(SignatureAlgorithm::Sha256WithEcdsa, b"hello").unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn different_seeds_produce_different_keys() {
        let signer_a = Secp256k1KeySigner::from_seed("seed-a").unwrap();
        let signer_b = Secp256k1KeySigner::from_seed("seed-b").unwrap();
        assert_ne!(
            signer_a.public_key_der().unwrap(),
            signer_b.public_key_der().unwrap()
        );
    }

    #[test]
    fn signature_is_der_sequence_and_verifies() {
        let signer = test_signer();
        for algorithm in SignatureAlgorithm::for_key_type(KeyPairType::Ec) {
            let der = signer.sign(algorithm, b"data").unwrap();
            assert_eq!(der[0], 0x30, "{algorithm}");

            let signature = Signature::from_der(&der).unwrap();
            let prehash = algorithm.digest().digest(b"data");
            signer
                .signing_key
                .verifying_key()
                .verify_prehash(&prehash, &signature)
                .unwrap();
        }
    }

    #[test]
    fn rsa_algorithm_is_refused() {
        assert!(test_signer().sign(SignatureAlgorithm::Sha256WithRsa, b"x").is_err());
    }
}
