use anyhow::{Context, Result, anyhow};
use p256::ecdsa::{Signature, SigningKey, signature::hazmat::PrehashSigner};
use p256::pkcs8::{DecodePrivateKey, EncodePublicKey};

use super::key::{EcKeyEncoding, KeySigner};
use crate::request::{KeyPairType, SignatureAlgorithm};

/// ECDSA signer on NIST P-256 (secp256r1).
pub struct P256KeySigner {
    signing_key: SigningKey,
}

impl P256KeySigner {
    pub fn from_der(der: &[u8], encoding: EcKeyEncoding) -> Result<Self> {
        let secret_key = match encoding {
            EcKeyEncoding::Pkcs8 => p256::SecretKey::from_pkcs8_der(der)
                .map_err(|e| anyhow!("decoding PKCS#8 P-256 private key: {e}"))?,
            EcKeyEncoding::Sec1 => p256::SecretKey::from_sec1_der(der)
                .map_err(|e| anyhow!("decoding SEC1 P-256 private key: {e}"))?,
        };
        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }
}

impl KeySigner for P256KeySigner {
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        anyhow::ensure!(
            algorithm.key_pair_type() == KeyPairType::Ec,
            "{algorithm} cannot be used with an EC key"
        );
        let digest = algorithm.digest().digest(data);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| anyhow!("P-256 sign_prehash failed: {e}"))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        let der = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .context("encoding P-256 public key to DER")?;
        Ok(der.into_vec())
    }

    fn key_pair_type(&self) -> KeyPairType {
        KeyPairType::Ec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::hazmat::PrehashVerifier;
    use std::path::Path;
    use x509_parser::pem::Pem;

    fn fixture_der(name: &str) -> Vec<u8> {
        let pem = std::fs::read(
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join(name),
        )
        .unwrap();
        Pem::iter_from_buffer(&pem).next().unwrap().unwrap().contents
    }

    fn test_signer() -> P256KeySigner {
        P256KeySigner::from_der(&fixture_der("p256-key.pem"), EcKeyEncoding::Pkcs8).unwrap()
    }

    #[test]
    fn pkcs8_and_sec1_files_hold_the_same_key() {
        let sec1 =
            P256KeySigner::from_der(&fixture_der("p256-sec1.pem"), EcKeyEncoding::Sec1).unwrap();
        assert_eq!(
            test_signer().public_key_der().unwrap(),
            sec1.public_key_der().unwrap()
        );
    }

    #[test]
    fn every_ecdsa_algorithm_verifies() {
        let signer = test_signer();
        for algorithm in SignatureAlgorithm::for_key_type(KeyPairType::Ec) {
            let der = signer.sign(algorithm, b"jar data").unwrap();
            let signature = Signature::from_der(&der).unwrap();
            let prehash = algorithm.digest().digest(b"jar data");
            signer
                .signing_key
                .verifying_key()
                .verify_prehash(&prehash, &signature)
                .unwrap();
        }
    }

    #[test]
    fn secp256k1_key_is_not_a_p256_key() {
        assert!(P256KeySigner::from_der(&fixture_der("ec-key.pem"), EcKeyEncoding::Pkcs8).is_err());
    }

    #[test]
    fn rsa_algorithm_is_refused() {
        assert!(test_signer().sign(SignatureAlgorithm::Sha256WithRsa, b"x").is_err());
    }
}
