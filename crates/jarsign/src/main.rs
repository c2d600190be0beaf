use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use jarsign::{
    ArchiveSigner, AssumeYes, ConfirmPrompt, DigestAlgorithm, FileStatus, OutputMode,
    SignJarError, SignatureAlgorithm, SigningCredentials, SigningReport, SigningRequestDraft,
    TerminalPrompt, confirm, load_credentials, sanitize_signature_name, sign_all,
};
use tracing_subscriber::EnvFilter;

const EXIT_SOME_FAILED: u8 = 1;
const EXIT_CREDENTIALS: u8 = 5;
const FALLBACK_SIGNATURE_NAME: &str = "SIGNER";

#[derive(Parser)]
#[clap(version, about = "Sign JAR files with a PEM key and certificate chain")]
struct Args {
    /// JAR file to sign; repeat for several
    #[clap(long = "jar", value_name = "FILE", conflicts_with = "folder")]
    jars: Vec<PathBuf>,
    /// Sign every *.jar directly inside this folder
    #[clap(long, value_name = "DIR")]
    folder: Option<PathBuf>,
    /// Signature name, used for META-INF/<NAME>.SF (default: key file name)
    #[clap(long)]
    name: Option<String>,
    #[clap(long, env = "JARSIGN_SIGNATURE_ALGORITHM")]
    signature_algorithm: Option<SignatureAlgorithm>,
    #[clap(long, env = "JARSIGN_DIGEST_ALGORITHM", default_value = "SHA-256")]
    digest_algorithm: DigestAlgorithm,
    /// Add an RFC 3161 timestamp to each signature
    #[clap(long)]
    timestamp: bool,
    #[clap(long, env = "JARSIGN_TSA_URL")]
    tsa_url: Option<String>,
    /// Write <prefix><name><suffix>.jar instead of signing in place
    #[clap(long)]
    prefix: Option<String>,
    #[clap(long)]
    suffix: Option<String>,
    /// PEM private key (PKCS#8, PKCS#1 RSA or SEC1 EC)
    #[clap(long, env = "JARSIGN_KEY")]
    key: PathBuf,
    /// PEM certificate chain, signer certificate first
    #[clap(long, env = "JARSIGN_CERTS")]
    certs: PathBuf,
    /// Created-By value written to the manifest
    #[clap(long, env = "JARSIGN_SIGNER")]
    signer: Option<String>,
    /// Answer every overwrite question with "yes, don't ask again"
    #[clap(long)]
    yes: bool,
    /// Print the report as JSON
    #[clap(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let credentials = match load_credentials(&args.key, &args.certs) {
        Ok(credentials) => credentials,
        Err(report) => {
            eprintln!("Error: {report:?}");
            return ExitCode::from(EXIT_CREDENTIALS);
        }
    };

    match run(&args, &credentials) {
        Ok(report) if report.all_signed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(EXIT_SOME_FAILED),
        Err(error) => {
            eprintln!("Error: {error}");
            if let SignJarError::FileFormat(format_error) = &error {
                eprintln!("Probable causes:");
                for cause in format_error.probable_causes() {
                    eprintln!("  - {cause}");
                }
            }
            ExitCode::from(error.exit_code())
        }
    }
}

fn run(args: &Args, credentials: &SigningCredentials) -> Result<SigningReport, SignJarError> {
    let draft = build_draft(args, credentials)?;

    let signer = ArchiveSigner::default();
    let mut prompt: Box<dyn ConfirmPrompt> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt::stdio())
    };
    let job = confirm(&draft, &signer, prompt.as_mut())?;

    let identity = args
        .signer
        .clone()
        .unwrap_or_else(|| format!("jarsign {}", env!("CARGO_PKG_VERSION")));
    let report = sign_all(&job, &signer, credentials, &identity);

    print_report(&report, args.json)?;
    Ok(report)
}

fn build_draft(
    args: &Args,
    credentials: &SigningCredentials,
) -> Result<SigningRequestDraft, SignJarError> {
    let mut draft = SigningRequestDraft::new(
        &default_signature_name(&args.key),
        credentials.key_pair_type(),
    );

    if let Some(name) = &args.name {
        draft.signature_name = name.clone();
    }
    if let Some(algorithm) = args.signature_algorithm {
        draft.signature_algorithm = algorithm;
    }
    draft.digest_algorithm = args.digest_algorithm;
    draft.add_timestamp = args.timestamp;
    if let Some(url) = &args.tsa_url {
        draft.timestamp_url = url.clone();
    }
    if args.prefix.is_some() || args.suffix.is_some() {
        draft.output_mode = OutputMode::Affixed {
            prefix: args.prefix.clone().unwrap_or_default(),
            suffix: args.suffix.clone().unwrap_or_default(),
        };
    }

    if let Some(folder) = &args.folder {
        draft.select_folder(folder.clone())?;
    } else if !args.jars.is_empty() {
        draft.select_files(args.jars.clone())?;
    }
    Ok(draft)
}

fn default_signature_name(key: &Path) -> String {
    key.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(sanitize_signature_name)
        .unwrap_or_else(|| FALLBACK_SIGNATURE_NAME.to_string())
}

fn print_report(report: &SigningReport, json: bool) -> eyre::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for file in &report.files {
        match &file.status {
            FileStatus::Signed => {
                println!("signed  {} -> {}", file.input.display(), file.output.display())
            }
            FileStatus::Failed { error } => {
                println!("FAILED  {}: {error}", file.input.display())
            }
        }
    }
    println!("{} signed, {} failed", report.signed(), report.failed());
    Ok(())
}
