use ed25519_dalek::{
    Keypair as DalekKeypair, PublicKey as DalekPublicKey, SecretKey as DalekSecretKey, Signature,
    Signer, Verifier, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;
use std::convert::TryFrom;

use crate::error::{ErrorKind, PkiResult};

/// Represent the Ed25519 public key
#[derive(Debug, Clone)]
pub struct Ed25519PublicKey {
    key: DalekPublicKey,
}

impl Ed25519PublicKey {
    /// Create the Ed25519 public key from the 32 public bytes
    pub fn new(key: &[u8; PUBLIC_KEY_LENGTH]) -> PkiResult<Self> {
        Ok(Ed25519PublicKey {
            key: DalekPublicKey::from_bytes(key)?,
        })
    }

    pub fn from_bytes(key: &[u8]) -> PkiResult<Self> {
        if key.len() != PUBLIC_KEY_LENGTH {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        Ok(Ed25519PublicKey {
            key: DalekPublicKey::from_bytes(key)?,
        })
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.key.as_bytes()
    }

    pub fn size(&self) -> usize {
        256
    }

    /// Verify a 64-byte signature over `data`
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        if sig.len() != SIGNATURE_LENGTH {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        let sig = Signature::try_from(sig)?;
        Ok(self.key.verify(data, &sig).is_ok())
    }
}

impl PartialEq for Ed25519PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// Represent the Ed25519 key pair
///
/// Only the 32-byte seed is held; the expanded form the container carries
/// is regenerated on demand. The seed is wiped on drop by the backing type.
pub struct Ed25519KeyPair {
    key: DalekKeypair,
}

impl Ed25519KeyPair {
    /// Generate an Ed25519 key pair
    pub fn generate() -> PkiResult<Self> {
        Ok(Ed25519KeyPair {
            key: DalekKeypair::generate(&mut OsRng),
        })
    }

    /// Create a key pair from the 32-byte seed
    pub fn from_seed(seed: &[u8]) -> PkiResult<Self> {
        if seed.len() != SECRET_KEY_LENGTH {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        let secret = DalekSecretKey::from_bytes(seed)?;
        let public = DalekPublicKey::from(&secret);
        Ok(Ed25519KeyPair {
            key: DalekKeypair { secret, public },
        })
    }

    /// Create a key pair from the container form: the public bytes plus the
    /// 64-byte `seed ∥ pubkey` string
    pub(crate) fn from_container_bytes(pk: &[u8], sk: &[u8]) -> PkiResult<Self> {
        if pk.len() != PUBLIC_KEY_LENGTH || sk.len() != KEYPAIR_LENGTH {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        if pk != &sk[SECRET_KEY_LENGTH..] {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        let pair = Self::from_seed(&sk[..SECRET_KEY_LENGTH])?;
        if pair.key.public.as_bytes() != pk {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        Ok(pair)
    }

    pub fn seed(&self) -> &[u8; SECRET_KEY_LENGTH] {
        self.key.secret.as_bytes()
    }

    pub fn public_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.key.public.as_bytes()
    }

    pub fn size(&self) -> usize {
        256
    }

    /// Clone the public parts to generate a public key
    pub fn clone_public_key(&self) -> PkiResult<Ed25519PublicKey> {
        Ok(Ed25519PublicKey {
            key: self.key.public,
        })
    }

    /// Sign `data`, returning the 64-byte signature
    pub fn sign(&self, data: &[u8]) -> PkiResult<Vec<u8>> {
        Ok(self.key.sign(data).to_bytes().to_vec())
    }

    pub fn verify(&self, data: &[u8], sig: &[u8]) -> PkiResult<bool> {
        self.clone_public_key()?.verify(data, sig)
    }
}

impl Clone for Ed25519KeyPair {
    fn clone(&self) -> Self {
        // The seed is always a valid secret key, so this cannot fail
        Self::from_seed(self.seed()).expect("seed round-trip")
    }
}

impl PartialEq for Ed25519KeyPair {
    fn eq(&self, other: &Self) -> bool {
        openssl::memcmp::eq(self.seed(), other.seed())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair").finish_non_exhaustive()
    }
}
