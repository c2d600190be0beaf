use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::signature_name::sanitize_signature_name;

/// Timestamp authorities offered when no URL is configured.
pub const KNOWN_TSA_URLS: &[&str] = &[
    "http://timestamp.digicert.com",
    "http://timestamp.sectigo.com",
    "http://time.certum.pl",
];

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownAlgorithm {
    kind: &'static str,
    value: String,
}

/// Hash used to fingerprint archive entries in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    /// Name used as the prefix of `-Digest` manifest attributes.
    pub fn manifest_name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "SHA1" => Ok(DigestAlgorithm::Sha1),
            "SHA224" => Ok(DigestAlgorithm::Sha224),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(UnknownAlgorithm {
                kind: "digest algorithm",
                value: s.to_string(),
            }),
        }
    }
}

/// Key family of the signing key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPairType {
    Rsa,
    Ec,
}

impl fmt::Display for KeyPairType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPairType::Rsa => f.write_str("RSA"),
            KeyPairType::Ec => f.write_str("EC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    Sha1WithRsa,
    Sha224WithRsa,
    Sha256WithRsa,
    Sha384WithRsa,
    Sha512WithRsa,
    Sha1WithEcdsa,
    Sha224WithEcdsa,
    Sha256WithEcdsa,
    Sha384WithEcdsa,
    Sha512WithEcdsa,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 10] = [
        SignatureAlgorithm::Sha1WithRsa,
        SignatureAlgorithm::Sha224WithRsa,
        SignatureAlgorithm::Sha256WithRsa,
        SignatureAlgorithm::Sha384WithRsa,
        SignatureAlgorithm::Sha512WithRsa,
        SignatureAlgorithm::Sha1WithEcdsa,
        SignatureAlgorithm::Sha224WithEcdsa,
        SignatureAlgorithm::Sha256WithEcdsa,
        SignatureAlgorithm::Sha384WithEcdsa,
        SignatureAlgorithm::Sha512WithEcdsa,
    ];

    /// JCA-style name, e.g. `SHA256withRSA`.
    pub fn jca_name(self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1WithRsa => "SHA1withRSA",
            SignatureAlgorithm::Sha224WithRsa => "SHA224withRSA",
            SignatureAlgorithm::Sha256WithRsa => "SHA256withRSA",
            SignatureAlgorithm::Sha384WithRsa => "SHA384withRSA",
            SignatureAlgorithm::Sha512WithRsa => "SHA512withRSA",
            SignatureAlgorithm::Sha1WithEcdsa => "SHA1withECDSA",
            SignatureAlgorithm::Sha224WithEcdsa => "SHA224withECDSA",
            SignatureAlgorithm::Sha256WithEcdsa => "SHA256withECDSA",
            SignatureAlgorithm::Sha384WithEcdsa => "SHA384withECDSA",
            SignatureAlgorithm::Sha512WithEcdsa => "SHA512withECDSA",
        }
    }

    pub fn key_pair_type(self) -> KeyPairType {
        match self {
            SignatureAlgorithm::Sha1WithRsa
            | SignatureAlgorithm::Sha224WithRsa
            | SignatureAlgorithm::Sha256WithRsa
            | SignatureAlgorithm::Sha384WithRsa
            | SignatureAlgorithm::Sha512WithRsa => KeyPairType::Rsa,
            _ => KeyPairType::Ec,
        }
    }

    /// Hash applied to the signature file before signing.
    pub fn digest(self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::Sha1WithRsa | SignatureAlgorithm::Sha1WithEcdsa => {
                DigestAlgorithm::Sha1
            }
            SignatureAlgorithm::Sha224WithRsa | SignatureAlgorithm::Sha224WithEcdsa => {
                DigestAlgorithm::Sha224
            }
            SignatureAlgorithm::Sha256WithRsa | SignatureAlgorithm::Sha256WithEcdsa => {
                DigestAlgorithm::Sha256
            }
            SignatureAlgorithm::Sha384WithRsa | SignatureAlgorithm::Sha384WithEcdsa => {
                DigestAlgorithm::Sha384
            }
            SignatureAlgorithm::Sha512WithRsa | SignatureAlgorithm::Sha512WithEcdsa => {
                DigestAlgorithm::Sha512
            }
        }
    }

    /// Algorithms usable with a key of the given type, in display order.
    pub fn for_key_type(key_type: KeyPairType) -> impl Iterator<Item = SignatureAlgorithm> {
        Self::ALL
            .into_iter()
            .filter(move |alg| alg.key_pair_type() == key_type)
    }

    pub fn default_for(key_type: KeyPairType) -> SignatureAlgorithm {
        match key_type {
            KeyPairType::Rsa => SignatureAlgorithm::Sha256WithRsa,
            KeyPairType::Ec => SignatureAlgorithm::Sha256WithEcdsa,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.jca_name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.jca_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownAlgorithm {
                kind: "signature algorithm",
                value: s.to_string(),
            })
    }
}

/// Where signed archives are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Overwrite each input archive.
    #[default]
    InPlace,
    /// Write `prefix + stem + suffix + ".jar"` next to each input.
    Affixed { prefix: String, suffix: String },
}

/// Raw field values collected before a confirm action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequestDraft {
    pub input_files: Vec<PathBuf>,
    /// Folder the inputs were discovered in, if they came from one.
    pub input_folder: Option<PathBuf>,
    pub signature_name: String,
    pub signature_algorithm: SignatureAlgorithm,
    pub digest_algorithm: DigestAlgorithm,
    /// Type of the signing key, when known.
    pub key_pair_type: Option<KeyPairType>,
    pub add_timestamp: bool,
    pub timestamp_url: String,
    pub output_mode: OutputMode,
}

impl SigningRequestDraft {
    /// A draft pre-filled the way a fresh signing form would be: the
    /// default name is sanitized, algorithms default for the key type.
    pub fn new(default_signature_name: &str, key_pair_type: KeyPairType) -> Self {
        Self {
            input_files: Vec::new(),
            input_folder: None,
            signature_name: sanitize_signature_name(default_signature_name),
            signature_algorithm: SignatureAlgorithm::default_for(key_pair_type),
            digest_algorithm: DigestAlgorithm::default(),
            key_pair_type: Some(key_pair_type),
            add_timestamp: false,
            timestamp_url: KNOWN_TSA_URLS[0].to_string(),
            output_mode: OutputMode::InPlace,
        }
    }
}

/// A request that passed validation. Only [`crate::validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub(crate) input_files: Vec<PathBuf>,
    pub(crate) signature_name: String,
    pub(crate) signature_algorithm: SignatureAlgorithm,
    pub(crate) digest_algorithm: DigestAlgorithm,
    pub(crate) timestamp_url: Option<String>,
    pub(crate) output_mode: OutputMode,
}

impl SigningRequest {
    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn signature_name(&self) -> &str {
        &self.signature_name
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn timestamp_url(&self) -> Option<&str> {
        self.timestamp_url.as_deref()
    }

    pub fn output_mode(&self) -> &OutputMode {
        &self.output_mode
    }
}
