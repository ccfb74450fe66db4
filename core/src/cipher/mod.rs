use crate::error::CoreResult;
use std::fmt;
use std::path::Path;

pub mod openssl;

pub use openssl::OpensslCipher;

/// Secret used to derive the symmetric key. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Passphrase-based symmetric cipher applied to whole bundles.
pub trait BundleCipher {
    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> CoreResult<Vec<u8>>;

    fn decrypt(&self, ciphertext: &Path, passphrase: &Passphrase) -> CoreResult<Vec<u8>>;
}

impl<C: BundleCipher + ?Sized> BundleCipher for &C {
    fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        (**self).encrypt(plaintext, passphrase)
    }

    fn decrypt(&self, ciphertext: &Path, passphrase: &Passphrase) -> CoreResult<Vec<u8>> {
        (**self).decrypt(ciphertext, passphrase)
    }
}
