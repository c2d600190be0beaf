use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::manifest::{Manifest, signature_file};
use super::pkcs7::{SignedDataBuilder, block_extension};
use super::signer::{JarSigner, SignParams};
use super::timestamp::{HttpTimestampAuthority, TimestampAuthority};
use crate::error::SigningError;

const META_INF: &str = "META-INF/";
const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const BLOCK_EXTENSIONS: [&str; 3] = ["RSA", "DSA", "EC"];

/// Signs archives in the standard JAR format: per-entry digests in the
/// manifest, a `<NAME>.SF` over the manifest and a PKCS#7 block over the
/// `.SF`.
#[derive(Clone)]
pub struct ArchiveSigner {
    timestamp_authority: Arc<dyn TimestampAuthority>,
}

impl Default for ArchiveSigner {
    fn default() -> Self {
        Self::with_timestamp_authority(Arc::new(HttpTimestampAuthority::default()))
    }
}

impl ArchiveSigner {
    pub fn with_timestamp_authority(timestamp_authority: Arc<dyn TimestampAuthority>) -> Self {
        Self {
            timestamp_authority,
        }
    }
}

/// Entries that belong to a signature and are never digested.
fn is_signature_related(name: &str) -> bool {
    let Some(file) = strip_prefix_ignore_case(name, META_INF) else {
        return false;
    };
    if file.contains('/') {
        return false;
    }
    let upper = file.to_ascii_uppercase();
    upper == "MANIFEST.MF"
        || upper.starts_with("SIG-")
        || upper.ends_with(".SF")
        || BLOCK_EXTENSIONS
            .iter()
            .any(|ext| upper.ends_with(&format!(".{ext}")))
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}

fn signature_file_path(signature_name: &str) -> String {
    format!("{META_INF}{}.SF", signature_name.to_ascii_uppercase())
}

/// Entries replaced when writing a signature called `signature_name`.
fn is_replaced(name: &str, signature_name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    if upper == META_INF || upper == MANIFEST_PATH {
        return true;
    }
    let base = format!("{META_INF}{}.", signature_name.to_ascii_uppercase());
    upper
        .strip_prefix(&base)
        .is_some_and(|ext| ext == "SF" || BLOCK_EXTENSIONS.contains(&ext))
}

struct ArchiveContents {
    manifest: Option<Vec<u8>>,
    /// Digests of every content entry, in archive order.
    digests: Vec<(String, Vec<u8>)>,
}

fn read_contents(
    archive: &mut ZipArchive<File>,
    params: &SignParams<'_>,
) -> Result<ArchiveContents, SigningError> {
    let mut manifest = None;
    let mut digests = Vec::new();
    let mut buffer = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            continue;
        }
        if name.eq_ignore_ascii_case(MANIFEST_PATH) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            manifest = Some(bytes);
            continue;
        }
        if is_signature_related(&name) {
            continue;
        }
        buffer.clear();
        entry.read_to_end(&mut buffer)?;
        digests.push((name, params.digest_algorithm.digest(&buffer)));
    }

    Ok(ArchiveContents { manifest, digests })
}

impl ArchiveSigner {
    fn write_signed(
        &self,
        archive: &mut ZipArchive<File>,
        destination: &Path,
        signed_files: [(String, Vec<u8>); 3],
        signature_name: &str,
    ) -> Result<NamedTempFile, SigningError> {
        let directory = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let temp = NamedTempFile::new_in(directory)?;

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(temp);
        writer.add_directory(META_INF, options)?;
        for (name, bytes) in signed_files {
            writer.start_file(name, options)?;
            writer.write_all(&bytes)?;
        }

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            if is_replaced(entry.name(), signature_name) {
                continue;
            }
            writer.raw_copy_file(entry)?;
        }

        Ok(writer.finish()?)
    }
}

impl JarSigner for ArchiveSigner {
    fn has_existing_signature(&self, jar: &Path, signature_name: &str) -> io::Result<bool> {
        let archive = ZipArchive::new(File::open(jar)?).map_err(|e| match e {
            zip::result::ZipError::Io(io) => io,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        })?;
        let wanted = signature_file_path(signature_name);
        let found = archive
            .file_names()
            .any(|name| name.eq_ignore_ascii_case(&wanted));
        debug!(jar = %jar.display(), signature_name, found, "checked for existing signature");
        Ok(found)
    }

    fn sign(
        &self,
        input: &Path,
        output: Option<&Path>,
        params: &SignParams<'_>,
    ) -> Result<(), SigningError> {
        let key_type = params.credentials.key_pair_type();
        if params.signature_algorithm.key_pair_type() != key_type {
            return Err(SigningError::AlgorithmMismatch {
                algorithm: params.signature_algorithm,
                key_type,
            });
        }
        if params.credentials.certificate_chain.is_empty() {
            return Err(SigningError::MissingCertificate);
        }

        let mut archive = ZipArchive::new(File::open(input)?)?;
        let contents = read_contents(&mut archive, params)?;

        let mut manifest = match &contents.manifest {
            Some(bytes) => Manifest::parse(bytes)?,
            None => Manifest::new(params.signer_identity),
        };
        manifest.update_digests(
            params.digest_algorithm,
            &contents.digests,
            params.signer_identity,
        );
        let rendered = manifest.render();
        let sf = signature_file(&rendered, params.digest_algorithm, params.signer_identity);

        let signature = params
            .credentials
            .signer
            .sign(params.signature_algorithm, &sf)
            .map_err(SigningError::Key)?;

        let mut block = SignedDataBuilder::new(
            params.signature_algorithm,
            &params.credentials.certificate_chain,
            signature.clone(),
        );
        if let Some(url) = params.timestamp_url {
            let token = self
                .timestamp_authority
                .timestamp(url, params.digest_algorithm, &signature)
                .map_err(SigningError::Timestamp)?;
            debug!(url, "signature timestamped");
            block = block.timestamp_token(token);
        }
        let block = block.build()?;

        let upper_name = params.signature_name.to_ascii_uppercase();
        let signed_files = [
            (MANIFEST_PATH.to_string(), rendered.bytes),
            (signature_file_path(params.signature_name), sf),
            (
                format!("{META_INF}{upper_name}.{}", block_extension(key_type)),
                block,
            ),
        ];

        let destination = output.unwrap_or(input);
        let temp = self.write_signed(
            &mut archive,
            destination,
            signed_files,
            params.signature_name,
        )?;
        drop(archive);
        temp.persist(destination).map_err(|e| e.error)?;

        info!(
            input = %input.display(),
            output = %destination.display(),
            entries = contents.digests.len(),
            algorithm = %params.signature_algorithm,
            "archive signed"
        );
        Ok(())
    }
}
