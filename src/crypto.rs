//! Passphrase-based encryption of output documents.
//!
//! The key and IV are derived with PBKDF2-HMAC-SHA256 (10 000 rounds, a
//! 16-byte zero salt); documents are AES-256-CBC with PKCS#7 padding and
//! travel as standard base64.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::BlockDecryptMut;
use aes::cipher::BlockEncryptMut;
use aes::cipher::KeyIvInit;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

type Aes256CbcEncryptor = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDecryptor = cbc::Decryptor<aes::Aes256>;

pub const MIN_PASSPHRASE_LENGTH: usize = 8;
const ROUNDS: u32 = 10_000;
const SALT: [u8; 16] = [0; 16];
const KEY_SIZE: usize = 32;
const IV_SIZE: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption key must be at least {MIN_PASSPHRASE_LENGTH} characters")]
    KeyTooShort,

    #[error("Invalid key or IV length")]
    InvalidKeyLength,

    #[error("Encrypted data is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Decryption failed: wrong key or corrupted data")]
    InvalidPadding,

    #[error("Decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

/// Key material derived once from a passphrase.
#[derive(Clone)]
pub struct DataCipher {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl std::fmt::Debug for DataCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataCipher { .. }")
    }
}

impl DataCipher {
    pub fn new(passphrase: &str) -> Result<Self, CipherError> {
        if !Self::is_valid_passphrase(passphrase) {
            return Err(CipherError::KeyTooShort);
        }
        let mut derived = [0u8; KEY_SIZE + IV_SIZE];
        pbkdf2::pbkdf2_hmac::<sha2::Sha256>(passphrase.as_bytes(), &SALT, ROUNDS, &mut derived);
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        key.copy_from_slice(&derived[..KEY_SIZE]);
        iv.copy_from_slice(&derived[KEY_SIZE..]);
        Ok(Self { key, iv })
    }

    /// At least eight characters.
    pub fn is_valid_passphrase(passphrase: &str) -> bool {
        passphrase.chars().count() >= MIN_PASSPHRASE_LENGTH
    }

    pub fn encrypt(&self, text: &str) -> Result<String, CipherError> {
        let encryptor = Aes256CbcEncryptor::new_from_slices(&self.key, &self.iv)
            .map_err(|_| CipherError::InvalidKeyLength)?;
        let encrypted = encryptor.encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes());
        Ok(STANDARD.encode(encrypted))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let encrypted = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CipherError::InvalidBase64(e.to_string()))?;
        let decryptor = Aes256CbcDecryptor::new_from_slices(&self.key, &self.iv)
            .map_err(|_| CipherError::InvalidKeyLength)?;
        let decrypted = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
            .map_err(|_| CipherError::InvalidPadding)?;
        String::from_utf8(decrypted).map_err(|_| CipherError::InvalidUtf8)
    }
}
