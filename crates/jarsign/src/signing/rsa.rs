use anyhow::{Context, Result};
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use super::key::KeySigner;
use crate::request::{DigestAlgorithm, KeyPairType, SignatureAlgorithm};

/// RSA PKCS#1 v1.5 signer.
pub struct RsaKeySigner {
    private_key: RsaPrivateKey,
}

impl RsaKeySigner {
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    /// Deterministic key for throwaway and test use: the SHA-256 hash of
    /// the seed seeds the CSPRNG used for key generation.
    pub fn from_seed(seed: &str, bits: usize) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let mut rng = ChaCha20Rng::from_seed(hash.into());
        let private_key =
            RsaPrivateKey::new(&mut rng, bits).context("generating RSA key from seed")?;
        Ok(Self { private_key })
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key =
            RsaPrivateKey::from_pkcs8_der(der).context("decoding PKCS#8 RSA private key")?;
        Ok(Self { private_key })
    }

    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let private_key =
            RsaPrivateKey::from_pkcs1_der(der).context("decoding PKCS#1 RSA private key")?;
        Ok(Self { private_key })
    }
}

fn padding_for(digest: DigestAlgorithm) -> Pkcs1v15Sign {
    match digest {
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

impl KeySigner for RsaKeySigner {
    fn sign(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        anyhow::ensure!(
            algorithm.key_pair_type() == KeyPairType::Rsa,
            "{algorithm} cannot be used with an RSA key"
        );
        let digest = algorithm.digest();
        let hashed = digest.digest(data);
        self.private_key
            .sign(padding_for(digest), &hashed)
            .with_context(|| format!("{algorithm} signing failed"))
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        let der = self
            .private_key
            .to_public_key()
            .to_public_key_der()
            .context("encoding RSA public key to DER")?;
        Ok(der.into_vec())
    }

    fn key_pair_type(&self) -> KeyPairType {
        KeyPairType::Rsa
    }
}
