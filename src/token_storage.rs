use crate::errors::TokenStorageError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::Hmac;
use log::{debug, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fs;
use std::path::PathBuf;

const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

type Result<T> = std::result::Result<T, TokenStorageError>;

/// Token material persisted between server runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires.
    pub expires_at: u64,
}

/// On-disk envelope: everything base64, tokens encrypted with AES-256-GCM
/// under a PBKDF2-derived key.
#[derive(Debug, Serialize, Deserialize)]
struct StorageEnvelope {
    salt: String,
    nonce: String,
    ciphertext: String,
}

/// Encrypted file storage for OAuth tokens.
///
/// The interactive auth flow writes tokens here; the token manager reads
/// them at startup and writes back after each successful refresh. The
/// encryption passphrase is the OAuth client secret, so the token file is
/// useless without the credentials that minted it.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
    passphrase: String,
}

impl TokenStorage {
    /// Storage at the default location under the user config directory.
    pub fn new(passphrase: &str) -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            TokenStorageError::FormatError("Could not determine config directory".to_string())
        })?;
        Ok(Self::with_path(
            base.join("outlook-mcp").join("tokens.json"),
            passphrase,
        ))
    }

    /// Storage at an explicit path (used by tests).
    pub fn with_path(path: PathBuf, passphrase: &str) -> Self {
        Self {
            path,
            passphrase: passphrase.to_string(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Encrypt and persist the tokens, creating parent directories as needed.
    pub fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let plaintext = serde_json::to_vec(tokens)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = self.cipher(&salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|e| TokenStorageError::CryptoError(e.to_string()))?;

        let envelope = StorageEnvelope {
            salt: base64::encode(salt),
            nonce: base64::encode(nonce),
            ciphertext: base64::encode(ciphertext),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            &self.path,
            serde_json::to_vec_pretty(&envelope)
                .map_err(|e| TokenStorageError::FormatError(e.to_string()))?,
        )?;

        debug!("Tokens persisted to {}", self.path.display());
        Ok(())
    }

    /// Load and decrypt previously stored tokens. `Ok(None)` when no token
    /// file exists yet.
    pub fn load(&self) -> Result<Option<StoredTokens>> {
        if !self.path.exists() {
            debug!("No token file at {}", self.path.display());
            return Ok(None);
        }

        let raw = fs::read(&self.path)?;
        let envelope: StorageEnvelope = serde_json::from_slice(&raw)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;

        let salt = base64::decode(&envelope.salt)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;
        let nonce = base64::decode(&envelope.nonce)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;
        let ciphertext = base64::decode(&envelope.ciphertext)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;

        let cipher = self.cipher(&salt)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|e| TokenStorageError::CryptoError(e.to_string()))?;

        let tokens: StoredTokens = serde_json::from_slice(&plaintext)
            .map_err(|e| TokenStorageError::FormatError(e.to_string()))?;

        debug!("Tokens restored from {}", self.path.display());
        Ok(Some(tokens))
    }

    /// Remove the token file, if any. Called when a refresh fails and the
    /// stored credential is known to be dead.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            warn!("Cleared stored tokens at {}", self.path.display());
        }
        Ok(())
    }

    fn cipher(&self, salt: &[u8]) -> Result<Aes256Gcm> {
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(
            self.passphrase.as_bytes(),
            salt,
            PBKDF2_ROUNDS,
            &mut key,
        )
        .map_err(|e| TokenStorageError::CryptoError(e.to_string()))?;

        Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TokenStorageError::CryptoError(e.to_string()))
    }
}
