mod archive;
mod credentials;
mod key;
mod manifest;
mod p256;
mod p384;
mod pkcs7;
mod rsa;
mod secp256k1;
mod signer;
mod timestamp;

pub use archive::ArchiveSigner;
pub use credentials::{load_credentials, parse_certificate_chain, parse_private_key};
pub use key::{EcKeyEncoding, KeySigner, SigningCredentials};
pub use manifest::{Manifest, RenderedManifest, signature_file};
pub use self::p256::P256KeySigner;
pub use self::p384::P384KeySigner;
pub use self::rsa::RsaKeySigner;
pub use secp256k1::Secp256k1KeySigner;
pub use signer::{JarSigner, SignParams};
pub use timestamp::{HttpTimestampAuthority, TimestampAuthority};
