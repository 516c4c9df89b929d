use crate::errors::WalletError;
use argon2::{
    password_hash::{PasswordHasher as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::Rng as _;
use secrecy::{ExposeSecret as _, SecretString};

/// The two plaintext passwords handed to the keystore subsystem for the
/// duration of one Create/Import call. Passed by reference into the adapter
/// calls, never through any process-global channel, and never persisted.
/// Dropping zeroizes the plaintext.
pub struct TransientSecrets {
    pub store_pass: SecretString,
    pub key_pass: SecretString,
}

impl TransientSecrets {
    pub const fn new(store_pass: SecretString, key_pass: SecretString) -> Self {
        Self {
            store_pass,
            key_pass,
        }
    }
}

pub fn fill_random(buf: &mut [u8]) {
    let mut rng = rand::rng();
    rng.fill_bytes(buf);
}

pub fn random_salt16() -> [u8; 16] {
    let mut s = [0_u8; 16];
    fill_random(&mut s);
    s
}

fn argon2id() -> Result<Argon2<'static>, WalletError> {
    // Freeze Argon2id parameters to avoid accidental changes across dependency
    // updates. These match `argon2::Params::DEFAULT` in argon2 0.5.x.
    let params = Params::new(19 * 1024, 2, 1, Some(32))
        .map_err(|e| WalletError::HashGeneration(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Salted one-way digest of a password, stored in place of the plaintext.
///
/// The salt is fresh per call, so two hashes of the same plaintext differ;
/// callers must never compare hash values across invocations.
pub fn salted_hash(plaintext: &SecretString) -> Result<String, WalletError> {
    let argon2 = argon2id()?;
    let salt16 = random_salt16();
    let salt = SaltString::encode_b64(&salt16)
        .map_err(|e| WalletError::HashGeneration(format!("encode salt: {e}")))?;
    let hash = argon2
        .hash_password(plaintext.expose_secret().as_bytes(), &salt)
        .map_err(|e| WalletError::HashGeneration(format!("argon2 hash: {e}")))?;
    Ok(hash.to_string())
}

/// Derive a 32-byte symmetric key from a password and a stored salt. Used by
/// the local keystore adapter to materialize/open the encrypted store.
pub fn derive_password_key(
    password: &SecretString,
    salt16: &[u8; 16],
) -> Result<[u8; 32], WalletError> {
    let argon2 = argon2id()?;
    let salt = SaltString::encode_b64(salt16)
        .map_err(|e| WalletError::HashGeneration(format!("encode salt: {e}")))?;
    let hash = argon2
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| WalletError::HashGeneration(format!("argon2 hash: {e}")))?;
    let bytes = hash
        .hash
        .ok_or_else(|| WalletError::HashGeneration("argon2 missing hash".to_owned()))?;
    let raw = bytes.as_bytes();
    let Some(prefix) = raw.get(..32) else {
        return Err(WalletError::HashGeneration("argon2 hash too short".to_owned()));
    };
    let mut out = [0_u8; 32];
    out.copy_from_slice(prefix);
    Ok(out)
}
