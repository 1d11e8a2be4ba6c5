use oqs::sig::Sig;
use zeroize::Zeroizing;

use crate::error::{ErrorKind, PkiResult};
use crate::keytype::KeyAlgorithm;

fn mechanism(algorithm: KeyAlgorithm) -> PkiResult<Sig> {
    oqs::init();
    let alg = algorithm
        .oqs_algorithm()
        .ok_or(ErrorKind::UnsupportedType)?;
    Ok(Sig::new(alg)?)
}

/// Represent the post-quantum half of a key
///
/// The buffers are kept as raw bytes; their lengths always equal the ones
/// declared by the OQS mechanism descriptor.
pub struct OqsPublicKey {
    algorithm: KeyAlgorithm,
    pk: Vec<u8>,
}

impl OqsPublicKey {
    pub fn from_bytes(algorithm: KeyAlgorithm, pk: &[u8]) -> PkiResult<Self> {
        let sig = mechanism(algorithm)?;
        if pk.len() != sig.length_public_key() {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        Ok(OqsPublicKey {
            algorithm,
            pk: pk.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pk
    }

    pub fn size(&self) -> usize {
        self.pk.len() * 8
    }

    /// Verify a detached post-quantum signature over `data`
    pub fn verify(&self, data: &[u8], sig_bytes: &[u8]) -> PkiResult<bool> {
        let sig = mechanism(self.algorithm)?;
        let pk = sig
            .public_key_from_bytes(&self.pk)
            .ok_or(ErrorKind::InvalidKeySize)?;
        let signature = sig
            .signature_from_bytes(sig_bytes)
            .ok_or(ErrorKind::InvalidKeyFormat)?;
        Ok(sig.verify(data, signature, pk).is_ok())
    }
}

impl Clone for OqsPublicKey {
    fn clone(&self) -> Self {
        OqsPublicKey {
            algorithm: self.algorithm,
            pk: self.pk.clone(),
        }
    }
}

impl PartialEq for OqsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.pk == other.pk
    }
}

/// Represent a post-quantum key pair
///
/// The secret key buffer is zeroized on drop.
pub struct OqsKeyPair {
    algorithm: KeyAlgorithm,
    pk: Vec<u8>,
    sk: Zeroizing<Vec<u8>>,
}

impl OqsKeyPair {
    /// Generate a key pair for the mechanism behind `algorithm`
    pub fn generate(algorithm: KeyAlgorithm) -> PkiResult<Self> {
        let sig = mechanism(algorithm)?;
        let (pk, sk) = sig.keypair()?;
        Ok(OqsKeyPair {
            algorithm,
            pk: pk.into_vec(),
            sk: Zeroizing::new(sk.into_vec()),
        })
    }

    /// Rebuild a key pair from container bytes, enforcing the mechanism's
    /// declared lengths
    pub fn from_bytes(algorithm: KeyAlgorithm, pk: &[u8], sk: &[u8]) -> PkiResult<Self> {
        let sig = mechanism(algorithm)?;
        if pk.len() != sig.length_public_key() || sk.len() != sig.length_secret_key() {
            return Err(ErrorKind::InvalidKeySize.into());
        }
        Ok(OqsKeyPair {
            algorithm,
            pk: pk.to_vec(),
            sk: Zeroizing::new(sk.to_vec()),
        })
    }

    pub fn public_bytes(&self) -> &[u8] {
        &self.pk
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        &self.sk
    }

    pub fn size(&self) -> usize {
        self.pk.len() * 8
    }

    pub fn clone_public_key(&self) -> PkiResult<OqsPublicKey> {
        OqsPublicKey::from_bytes(self.algorithm, &self.pk)
    }

    /// Sign `data`, returning the detached post-quantum signature
    pub fn sign(&self, data: &[u8]) -> PkiResult<Vec<u8>> {
        let sig = mechanism(self.algorithm)?;
        let sk = sig
            .secret_key_from_bytes(&self.sk)
            .ok_or(ErrorKind::InvalidKeySize)?;
        Ok(sig.sign(data, sk)?.into_vec())
    }
}

impl Clone for OqsKeyPair {
    fn clone(&self) -> Self {
        OqsKeyPair {
            algorithm: self.algorithm,
            pk: self.pk.clone(),
            sk: Zeroizing::new(self.sk.to_vec()),
        }
    }
}

impl PartialEq for OqsKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && openssl::memcmp::eq(&self.sk, &other.sk)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn oqs_sign_verify() {
        let key = OqsKeyPair::generate(KeyAlgorithm::Dilithium2).unwrap();
        let sig = key.sign(b"pq test message").unwrap();
        let pubkey = key.clone_public_key().unwrap();
        assert!(pubkey.verify(b"pq test message", &sig).unwrap());
        assert!(!pubkey.verify(b"pq test messagf", &sig).unwrap());
    }

    #[test]
    fn oqs_length_checks() {
        let key = OqsKeyPair::generate(KeyAlgorithm::Falcon512).unwrap();
        assert!(OqsKeyPair::from_bytes(
            KeyAlgorithm::Falcon512,
            key.public_bytes(),
            &key.secret_bytes()[1..],
        )
        .is_err());
        assert!(OqsPublicKey::from_bytes(KeyAlgorithm::Dilithium2, key.public_bytes()).is_err());
    }
}
