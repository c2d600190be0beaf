//! Detached PKCS#7 `SignedData` blocks as found in `META-INF/*.RSA|EC`.

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo, SignerInfos,
};
use der::asn1::{Any, AnyRef, ObjectIdentifier, OctetString, SetOfVec};
use der::{Decode, Encode};
use sha1::Sha1;
use sha2::digest::const_oid::AssociatedOid;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;
use x509_cert::attr::Attribute;

use crate::error::SigningError;
use crate::request::{DigestAlgorithm, KeyPairType, SignatureAlgorithm};

pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// id-aa-timeStampToken
pub const ID_TIMESTAMP_TOKEN: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");

const ECDSA_WITH_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA224: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1");
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

fn null_parameters() -> Option<Any> {
    Some(Any::from(AnyRef::NULL))
}

/// `AlgorithmIdentifier` for a digest, with NULL parameters.
pub fn digest_algorithm_identifier(digest: DigestAlgorithm) -> AlgorithmIdentifierOwned {
    let oid = match digest {
        DigestAlgorithm::Sha1 => Sha1::OID,
        DigestAlgorithm::Sha224 => Sha224::OID,
        DigestAlgorithm::Sha256 => Sha256::OID,
        DigestAlgorithm::Sha384 => Sha384::OID,
        DigestAlgorithm::Sha512 => Sha512::OID,
    };
    AlgorithmIdentifierOwned {
        oid,
        parameters: null_parameters(),
    }
}

/// RSA blocks name the key algorithm, ECDSA blocks the combined
/// signature algorithm.
fn signature_algorithm_identifier(algorithm: SignatureAlgorithm) -> AlgorithmIdentifierOwned {
    match algorithm.key_pair_type() {
        KeyPairType::Rsa => AlgorithmIdentifierOwned {
            oid: RSA_ENCRYPTION,
            parameters: null_parameters(),
        },
        KeyPairType::Ec => AlgorithmIdentifierOwned {
            oid: match algorithm.digest() {
                DigestAlgorithm::Sha1 => ECDSA_WITH_SHA1,
                DigestAlgorithm::Sha224 => ECDSA_WITH_SHA224,
                DigestAlgorithm::Sha256 => ECDSA_WITH_SHA256,
                DigestAlgorithm::Sha384 => ECDSA_WITH_SHA384,
                DigestAlgorithm::Sha512 => ECDSA_WITH_SHA512,
            },
            parameters: None,
        },
    }
}

/// Builder for a detached `SignedData` with one signer and no signed
/// attributes.
pub struct SignedDataBuilder<'a> {
    algorithm: SignatureAlgorithm,
    certificate_chain: &'a [Vec<u8>],
    signature: Vec<u8>,
    timestamp_token: Option<Vec<u8>>,
}

impl<'a> SignedDataBuilder<'a> {
    pub fn new(
        algorithm: SignatureAlgorithm,
        certificate_chain: &'a [Vec<u8>],
        signature: Vec<u8>,
    ) -> Self {
        Self {
            algorithm,
            certificate_chain,
            signature,
            timestamp_token: None,
        }
    }

    /// Adds an RFC 3161 token (a DER `ContentInfo`) as an unsigned attribute.
    pub fn timestamp_token(mut self, token: Vec<u8>) -> Self {
        self.timestamp_token = Some(token);
        self
    }

    pub fn build(self) -> Result<Vec<u8>, SigningError> {
        if self.certificate_chain.is_empty() {
            return Err(SigningError::MissingCertificate);
        }
        let certificates = self
            .certificate_chain
            .iter()
            .map(|der| Certificate::from_der(der))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SigningError::Certificate(e.to_string()))?;
        let signer = &certificates[0].tbs_certificate;

        let unsigned_attrs = match &self.timestamp_token {
            Some(token) => {
                let attribute = Attribute {
                    oid: ID_TIMESTAMP_TOKEN,
                    values: SetOfVec::try_from(vec![Any::from_der(token)?])?,
                };
                Some(SetOfVec::try_from(vec![attribute])?)
            }
            None => None,
        };

        let digest_alg = digest_algorithm_identifier(self.algorithm.digest());
        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: signer.issuer.clone(),
                serial_number: signer.serial_number.clone(),
            }),
            digest_alg: digest_alg.clone(),
            signed_attrs: None,
            signature_algorithm: signature_algorithm_identifier(self.algorithm),
            signature: OctetString::new(self.signature)?,
            unsigned_attrs,
        };

        let certificate_choices = certificates
            .into_iter()
            .map(CertificateChoices::Certificate)
            .collect::<Vec<_>>();
        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_alg])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: ID_DATA,
                econtent: None,
            },
            certificates: Some(CertificateSet(SetOfVec::try_from(certificate_choices)?)),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        let content_info = ContentInfo {
            content_type: ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        Ok(content_info.to_der()?)
    }
}

/// File extension of the signature block for a key type.
pub fn block_extension(key_type: KeyPairType) -> &'static str {
    match key_type {
        KeyPairType::Rsa => "RSA",
        KeyPairType::Ec => "EC",
    }
}

/// Decodes a block back into its `SignedData`.
#[cfg(test)]
pub(crate) fn decode_signed_data(block: &[u8]) -> SignedData {
    let content_info = ContentInfo::from_der(block).unwrap();
    assert_eq!(content_info.content_type, ID_SIGNED_DATA);
    content_info.content.decode_as::<SignedData>().unwrap()
}

/// The single `SignerInfo` of a block.
#[cfg(test)]
pub(crate) fn decode_signer_info(block: &[u8]) -> SignerInfo {
    let signed_data = decode_signed_data(block);
    assert_eq!(signed_data.signer_infos.0.len(), 1);
    signed_data.signer_infos.0.iter().next().unwrap().clone()
}
