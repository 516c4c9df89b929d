use thiserror::Error;

/// Credential field absent at protocol entry. Ordering matters: the validator
/// reports the first missing field only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingField {
    #[error("please provide a valid path to your keystore file")]
    KeystorePath,
    #[error("please provide a keystore password")]
    KeystorePassword,
    #[error("please provide a key password")]
    KeyPassword,
    #[error("an alias has not been provided")]
    Alias,
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("{0}")]
    MissingField(MissingField),

    #[error("unable to generate password hash: {0}")]
    HashGeneration(String),

    #[error("unable to create new wallet, alias already exists: {0}")]
    AliasTaken(String),

    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("filesystem failure: {0}")]
    Filesystem(String),

    #[error("cannot start a new wallet operation while another is pending")]
    PendingOperation,
}

impl From<MissingField> for WalletError {
    fn from(f: MissingField) -> Self {
        Self::MissingField(f)
    }
}
