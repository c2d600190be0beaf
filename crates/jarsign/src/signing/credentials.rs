use std::fs;
use std::path::Path;
use std::sync::Arc;

use der::asn1::{BitString, ObjectIdentifier, OctetString};
use der::{Decode, Sequence};
use eyre::{Result, WrapErr, bail, eyre};
use pkcs8::PrivateKeyInfo;
use tracing::{debug, info};
use x509_parser::pem::Pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use super::key::{EcKeyEncoding, KeySigner, SigningCredentials};
use super::p256::P256KeySigner;
use super::p384::P384KeySigner;
use super::rsa::RsaKeySigner;
use super::secp256k1::Secp256k1KeySigner;

const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS1_RSA_LABEL: &str = "RSA PRIVATE KEY";
const SEC1_EC_LABEL: &str = "EC PRIVATE KEY";
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP256K1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.10");

/// SEC1 `ECPrivateKey`, decoded only far enough to learn its curve.
#[derive(Sequence)]
struct EcPrivateKeyCurve {
    version: u8,
    private_key: OctetString,
    #[asn1(context_specific = "0", optional = "true")]
    parameters: Option<ObjectIdentifier>,
    #[asn1(context_specific = "1", optional = "true")]
    public_key: Option<BitString>,
}

/// Decodes a PEM private key.
///
/// The PEM label selects the container: PKCS#8, PKCS#1 RSA or SEC1 EC.
/// EC keys are dispatched on their named curve.
pub fn parse_private_key(pem: &str) -> Result<Arc<dyn KeySigner>> {
    let block = Pem::iter_from_buffer(pem.as_bytes())
        .next()
        .ok_or_else(|| eyre!("no PEM block found in private key"))?
        .map_err(|e| eyre!("reading private key PEM: {e}"))?;
    let der = block.contents.as_slice();

    match block.label.as_str() {
        PKCS8_LABEL => {
            let info = PrivateKeyInfo::try_from(der)
                .map_err(|e| eyre!("decoding PKCS#8 private key: {e}"))?;
            if info.algorithm.oid == RSA_ENCRYPTION {
                Ok(Arc::new(RsaKeySigner::from_pkcs8_der(der).map_err(report)?))
            } else if info.algorithm.oid == EC_PUBLIC_KEY {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| eyre!("PKCS#8 EC private key names no curve: {e}"))?;
                ec_signer(curve, der, EcKeyEncoding::Pkcs8)
            } else {
                bail!("unsupported PKCS#8 key algorithm {}", info.algorithm.oid)
            }
        }
        PKCS1_RSA_LABEL => Ok(Arc::new(RsaKeySigner::from_pkcs1_der(der).map_err(report)?)),
        SEC1_EC_LABEL => {
            let key = EcPrivateKeyCurve::from_der(der)
                .map_err(|e| eyre!("decoding SEC1 EC private key: {e}"))?;
            let curve = key
                .parameters
                .ok_or_else(|| eyre!("SEC1 EC private key names no curve"))?;
            ec_signer(curve, der, EcKeyEncoding::Sec1)
        }
        other => bail!("unsupported private key PEM block '{other}'"),
    }
}

fn ec_signer(
    curve: ObjectIdentifier,
    der: &[u8],
    encoding: EcKeyEncoding,
) -> Result<Arc<dyn KeySigner>> {
    debug!(%curve, ?encoding, "decoding EC private key");
    let signer: Arc<dyn KeySigner> = if curve == SECP256R1 {
        Arc::new(P256KeySigner::from_der(der, encoding).map_err(report)?)
    } else if curve == SECP384R1 {
        Arc::new(P384KeySigner::from_der(der, encoding).map_err(report)?)
    } else if curve == SECP256K1 {
        Arc::new(Secp256k1KeySigner::from_der(der, encoding).map_err(report)?)
    } else {
        bail!("unsupported EC curve {curve}");
    };
    Ok(signer)
}

fn report(error: anyhow::Error) -> eyre::Report {
    eyre!("{error:#}")
}

/// Decodes every `CERTIFICATE` block, in file order.
pub fn parse_certificate_chain(pem: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut chain = Vec::new();
    for block in Pem::iter_from_buffer(pem) {
        let block = block.map_err(|e| eyre!("reading certificate PEM: {e}"))?;
        if block.label != CERTIFICATE_LABEL {
            continue;
        }
        block
            .parse_x509()
            .map_err(|e| eyre!("parsing certificate {}: {e}", chain.len() + 1))?;
        chain.push(block.contents);
    }
    if chain.is_empty() {
        bail!("no certificates found");
    }
    Ok(chain)
}

/// Loads a PEM private key and its PEM certificate chain.
///
/// The first certificate must carry the key's public half.
pub fn load_credentials(key_path: &Path, certs_path: &Path) -> Result<SigningCredentials> {
    let key_pem = fs::read_to_string(key_path)
        .wrap_err_with(|| format!("reading private key {}", key_path.display()))?;
    let signer = parse_private_key(&key_pem)
        .wrap_err_with(|| format!("loading private key {}", key_path.display()))?;

    let certs_pem = fs::read(certs_path)
        .wrap_err_with(|| format!("reading certificates {}", certs_path.display()))?;
    let chain = parse_certificate_chain(&certs_pem)
        .wrap_err_with(|| format!("loading certificates {}", certs_path.display()))?;

    check_key_matches_certificate(signer.as_ref(), &chain[0])?;

    let credentials = SigningCredentials::new(signer, chain);
    info!(
        key_type = %credentials.key_pair_type(),
        certificates = credentials.certificate_chain.len(),
        fingerprint = credentials.certificate_fingerprint().unwrap_or_default(),
        "signing credentials loaded"
    );
    Ok(credentials)
}

fn check_key_matches_certificate(signer: &dyn KeySigner, certificate: &[u8]) -> Result<()> {
    let (_, cert) = X509Certificate::from_der(certificate)
        .map_err(|e| eyre!("parsing signer certificate: {e}"))?;
    let key_spki = signer.public_key_der().map_err(|e| eyre!("{e:#}"))?;
    if cert.public_key().raw != key_spki.as_slice() {
        bail!(
            "private key does not match certificate '{}'",
            cert.subject()
        );
    }
    debug!(subject = %cert.subject(), "private key matches signer certificate");
    Ok(())
}
