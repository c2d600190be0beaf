pub mod error;
pub mod input;
pub mod output;
pub mod overwrite;
pub mod prompt;
pub mod request;
pub mod signature_name;
pub mod signing;
pub mod validate;
pub mod workflow;

pub use error::{FileFormatError, SignJarError, SigningError, ValidationError};
pub use output::{OutputMapping, resolve_outputs};
pub use overwrite::{AssumeYes, ConfirmPrompt, OverwriteConflict, OverwritePolicy};
pub use prompt::TerminalPrompt;
pub use request::{
    DigestAlgorithm, KNOWN_TSA_URLS, KeyPairType, OutputMode, SignatureAlgorithm, SigningRequest,
    SigningRequestDraft,
};
pub use signature_name::{is_valid_signature_name, sanitize_signature_name};
pub use signing::{ArchiveSigner, JarSigner, SignParams, SigningCredentials, load_credentials};
pub use validate::validate;
pub use workflow::{FileOutcome, FileStatus, SignJob, SigningReport, confirm, sign_all};
