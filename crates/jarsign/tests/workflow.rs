use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use jarsign::{
    ArchiveSigner, AssumeYes, ConfirmPrompt, FileStatus, JarSigner, KeyPairType, OutputMode,
    OverwriteConflict, OverwritePolicy, SignJarError, SigningCredentials, SigningRequestDraft,
    ValidationError, confirm, load_credentials, sign_all,
};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn rsa_credentials() -> SigningCredentials {
    load_credentials(&fixture("rsa-pkcs1.pem"), &fixture("rsa-cert.pem")).unwrap()
}

fn write_jar(path: &Path) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    writer
        .start_file("pkg/App.class", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"\xca\xfe\xba\xbe").unwrap();
    writer.finish().unwrap();
}

struct Scripted {
    answers: VecDeque<OverwritePolicy>,
    questions: Vec<String>,
}

impl Scripted {
    fn new(answers: &[OverwritePolicy]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            questions: Vec::new(),
        }
    }
}

impl ConfirmPrompt for Scripted {
    fn confirm(&mut self, conflict: &OverwriteConflict<'_>) -> OverwritePolicy {
        self.questions.push(conflict.to_string());
        self.answers.pop_front().expect("unexpected prompt")
    }
}

#[test]
fn folder_is_signed_in_place() {
    let dir = tempfile::tempdir().unwrap();
    write_jar(&dir.path().join("a.jar"));
    write_jar(&dir.path().join("b.jar"));
    fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();
    fs::write(dir.path().join("c.JAR"), b"skip me too").unwrap();

    let credentials = rsa_credentials();
    let mut draft = SigningRequestDraft::new("release key", KeyPairType::Rsa);
    draft.select_folder(dir.path().to_path_buf()).unwrap();
    assert_eq!(draft.signature_name, "release_key");

    let signer = ArchiveSigner::default();
    let job = confirm(&draft, &signer, &mut AssumeYes).unwrap();
    let report = sign_all(&job, &signer, &credentials, "jarsign test");

    assert!(report.all_signed(), "{report:?}");
    assert_eq!(report.files.len(), 2);
    for file in &report.files {
        assert_eq!(file.input, file.output);
        assert!(signer.has_existing_signature(&file.input, "release_key").unwrap());
    }
}

#[test]
fn resigning_asks_about_existing_signature_and_declining_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("app.jar");
    write_jar(&jar);

    let credentials = rsa_credentials();
    let signer = ArchiveSigner::default();
    let mut draft = SigningRequestDraft::new("REL", KeyPairType::Rsa);
    draft.select_files(vec![jar.clone()]).unwrap();

    let job = confirm(&draft, &signer, &mut Scripted::new(&[])).unwrap();
    assert!(sign_all(&job, &signer, &credentials, "jarsign test").all_signed());
    let signed_once = fs::read(&jar).unwrap();

    let mut prompt = Scripted::new(&[OverwritePolicy::Abort]);
    let err = confirm(&draft, &signer, &mut prompt).unwrap_err();
    assert!(matches!(err, SignJarError::OverwriteDeclined { .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(prompt.questions.len(), 1);
    assert!(prompt.questions[0].contains("signature named 'REL'"));
    assert_eq!(fs::read(&jar).unwrap(), signed_once);
}

#[test]
fn affixed_outputs_are_written_beside_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("app.jar");
    write_jar(&jar);
    let original = fs::read(&jar).unwrap();

    let credentials = rsa_credentials();
    let signer = ArchiveSigner::default();
    let mut draft = SigningRequestDraft::new("REL", KeyPairType::Rsa);
    draft.select_files(vec![jar.clone()]).unwrap();
    draft.output_mode = OutputMode::Affixed {
        prefix: "signed_".to_string(),
        suffix: String::new(),
    };

    let job = confirm(&draft, &signer, &mut Scripted::new(&[])).unwrap();
    let report = sign_all(&job, &signer, &credentials, "jarsign test");
    let output = dir.path().join("signed_app.jar");
    assert_eq!(report.files[0].output, output);
    assert_eq!(report.files[0].status, FileStatus::Signed);
    assert_eq!(fs::read(&jar).unwrap(), original);
    assert!(signer.has_existing_signature(&output, "REL").unwrap());

    // the output now exists, so a second run has to confirm it
    let mut prompt = Scripted::new(&[OverwritePolicy::SkipRemaining]);
    confirm(&draft, &signer, &mut prompt).unwrap();
    assert_eq!(prompt.questions.len(), 1);
    assert!(prompt.questions[0].contains("signed_app.jar"));
}

#[test]
fn invalid_selection_and_validation_errors_map_to_exit_code_2() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.jar");
    let bad = dir.path().join("bad.jar");
    write_jar(&good);
    fs::write(&bad, b"not a zip").unwrap();

    let mut draft = SigningRequestDraft::new("REL", KeyPairType::Rsa);
    let err = draft.select_files(vec![good, bad.clone()]).unwrap_err();
    assert_eq!(err.path, bad);
    assert!(draft.input_files.is_empty());
    assert_eq!(SignJarError::from(err).exit_code(), 2);

    let err = confirm(&draft, &ArchiveSigner::default(), &mut AssumeYes).unwrap_err();
    assert!(matches!(
        err,
        SignJarError::Validation(ValidationError::NoInputFiles)
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn one_broken_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.jar");
    let second = dir.path().join("second.jar");
    write_jar(&first);
    write_jar(&second);

    let credentials = rsa_credentials();
    let signer = ArchiveSigner::default();
    let mut draft = SigningRequestDraft::new("REL", KeyPairType::Rsa);
    draft.select_files(vec![first.clone(), second.clone()]).unwrap();
    let job = confirm(&draft, &signer, &mut AssumeYes).unwrap();

    // corrupted between confirmation and signing
    fs::write(&first, b"truncated").unwrap();

    let report = sign_all(&job, &signer, &credentials, "jarsign test");
    assert_eq!(report.signed(), 1);
    assert!(matches!(report.files[0].status, FileStatus::Failed { .. }));
    assert_eq!(report.files[1].status, FileStatus::Signed);
    assert!(signer.has_existing_signature(&second, "REL").unwrap());
}
