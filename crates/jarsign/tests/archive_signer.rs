use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use jarsign::signing::{Manifest, TimestampAuthority};
use jarsign::{
    ArchiveSigner, DigestAlgorithm, JarSigner, SignParams, SignatureAlgorithm, SigningCredentials,
    SigningError, load_credentials,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn ec_credentials() -> SigningCredentials {
    load_credentials(&fixture("ec-key.pem"), &fixture("ec-cert.pem")).unwrap()
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

fn read_entry(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Hands out a fixed token and remembers what it was asked to stamp.
struct StubAuthority {
    token: Vec<u8>,
    requests: Mutex<Vec<(String, DigestAlgorithm, Vec<u8>)>>,
}

impl TimestampAuthority for StubAuthority {
    fn timestamp(
        &self,
        url: &str,
        digest: DigestAlgorithm,
        signature: &[u8],
    ) -> anyhow::Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), digest, signature.to_vec()));
        Ok(self.token.clone())
    }
}

#[test]
fn ec_signature_block_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("tool.jar");
    write_jar(&jar, &[("tool/Main.class", b"main"), ("tool/res.txt", b"res")]);

    let credentials = ec_credentials();
    let params = SignParams {
        credentials: &credentials,
        signature_algorithm: SignatureAlgorithm::Sha256WithEcdsa,
        signature_name: "tool_sig",
        signer_identity: "jarsign integration",
        digest_algorithm: DigestAlgorithm::Sha384,
        timestamp_url: None,
    };
    let signer = ArchiveSigner::default();
    signer.sign(&jar, None, &params).unwrap();

    assert!(signer.has_existing_signature(&jar, "tool_sig").unwrap());
    let block = read_entry(&jar, "META-INF/TOOL_SIG.EC");
    assert!(contains(&block, &credentials.certificate_chain[0]));

    let manifest = Manifest::parse(&read_entry(&jar, "META-INF/MANIFEST.MF")).unwrap();
    assert_eq!(
        manifest.main_attribute("Created-By"),
        Some("jarsign integration")
    );
    assert!(manifest
        .entry_attribute("tool/res.txt", "SHA-384-Digest")
        .is_some());

    let sf = Manifest::parse(&read_entry(&jar, "META-INF/TOOL_SIG.SF")).unwrap();
    assert!(sf.main_attribute("SHA-384-Digest-Manifest").is_some());
    assert_eq!(sf.entry_names().count(), 2);
}

#[test]
fn p256_signature_verifies_over_signature_file() {
    use cms::content_info::ContentInfo;
    use cms::signed_data::SignedData;
    use der::Decode;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, VerifyingKey};
    use p256::pkcs8::DecodePublicKey;
    use x509_parser::prelude::{FromDer, X509Certificate};

    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("tool.jar");
    write_jar(&jar, &[("tool/Main.class", b"main")]);

    let credentials = load_credentials(&fixture("p256-key.pem"), &fixture("p256-cert.pem")).unwrap();
    let params = SignParams {
        credentials: &credentials,
        signature_algorithm: SignatureAlgorithm::Sha256WithEcdsa,
        signature_name: "tool",
        signer_identity: "jarsign integration",
        digest_algorithm: DigestAlgorithm::Sha256,
        timestamp_url: None,
    };
    ArchiveSigner::default().sign(&jar, None, &params).unwrap();

    let block = read_entry(&jar, "META-INF/TOOL.EC");
    // ecdsa-with-SHA256
    assert!(contains(&block, &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02]));

    let (_, certificate) = X509Certificate::from_der(&credentials.certificate_chain[0]).unwrap();
    let verifying_key = VerifyingKey::from_public_key_der(certificate.public_key().raw).unwrap();
    let sf = read_entry(&jar, "META-INF/TOOL.SF");
    let signed_data = ContentInfo::from_der(&block)
        .unwrap()
        .content
        .decode_as::<SignedData>()
        .unwrap();
    let signer_info = signed_data.signer_infos.0.iter().next().unwrap();
    let signature = Signature::from_der(signer_info.signature.as_bytes()).unwrap();
    verifying_key.verify(&sf, &signature).unwrap();
}

#[test]
fn timestamp_token_is_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("app.jar");
    write_jar(&jar, &[("a.txt", b"a")]);

    let token = vec![0x30, 0x03, 0x02, 0x01, 0x2a];
    let authority = Arc::new(StubAuthority {
        token: token.clone(),
        requests: Mutex::new(Vec::new()),
    });
    let credentials = load_credentials(&fixture("rsa-key.pem"), &fixture("rsa-cert.pem")).unwrap();
    let params = SignParams {
        credentials: &credentials,
        signature_algorithm: SignatureAlgorithm::Sha512WithRsa,
        signature_name: "TS",
        signer_identity: "jarsign integration",
        digest_algorithm: DigestAlgorithm::Sha256,
        timestamp_url: Some("http://tsa.example.com"),
    };
    ArchiveSigner::with_timestamp_authority(authority.clone())
        .sign(&jar, None, &params)
        .unwrap();

    let requests = authority.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (url, digest, signature) = &requests[0];
    assert_eq!(url, "http://tsa.example.com");
    assert_eq!(*digest, DigestAlgorithm::Sha256);

    let block = read_entry(&jar, "META-INF/TS.RSA");
    assert!(contains(&block, &token));
    assert!(contains(&block, signature));
}

#[test]
fn missing_certificate_is_a_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("app.jar");
    write_jar(&jar, &[("a.txt", b"a")]);

    let loaded = ec_credentials();
    let credentials = SigningCredentials::new(loaded.signer.clone(), Vec::new());
    let params = SignParams {
        credentials: &credentials,
        signature_algorithm: SignatureAlgorithm::Sha256WithEcdsa,
        signature_name: "S",
        signer_identity: "jarsign integration",
        digest_algorithm: DigestAlgorithm::Sha256,
        timestamp_url: None,
    };
    let err = ArchiveSigner::default().sign(&jar, None, &params).unwrap_err();
    assert!(matches!(err, SigningError::MissingCertificate));
    assert!(!ArchiveSigner::default().has_existing_signature(&jar, "S").unwrap());
}
