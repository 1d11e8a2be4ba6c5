use digest::{Digest, FixedOutputReset};
use md5::Md5;
use sha2::{Sha256, Sha512};
use std::fmt;

use crate::cipher::Cipher;
use crate::error::{ErrorKind, PkiResult};
use crate::format;
use crate::format::ossh_privkey::serialize_ossh_privkey;
use crate::format::ossh_pubkey::{encode_pubkey_blob, serialize_authorized_line};
use crate::keytype::KeyAlgorithm;

/// DSA key type
pub mod dsa;
/// EcDSA key type
pub mod ecdsa;
/// Ed25519 key type
pub mod ed25519;
/// Post-quantum key material
#[cfg(feature = "post-quantum")]
pub mod oqs;
/// RSA key type
pub mod rsa;

use self::ecdsa::EcCurve;

/// The name of the MD5 hashing algorithm returned by [`FingerprintHash::name()`](enum.FingerprintHash.html#method.name)
pub const MD5_NAME: &str = "MD5";
/// The name of the sha2-256 algorithm returned by [`FingerprintHash::name()`](enum.FingerprintHash.html#method.name)
pub const SHA256_NAME: &str = "SHA256";
/// The name of the sha2-512 algorithm returned by [`FingerprintHash::name()`](enum.FingerprintHash.html#method.name)
pub const SHA512_NAME: &str = "SHA512";

/// An enum representing the hash function used to generate fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintHash {
    MD5,
    SHA256,
    SHA512,
}

impl FingerprintHash {
    fn hash(self, data: &[u8]) -> Vec<u8> {
        fn digest_hash<D>(hasher: &mut D, data: &[u8]) -> Vec<u8>
        where
            D: Digest + FixedOutputReset,
        {
            Digest::update(hasher, data);
            hasher.finalize_reset().to_vec()
        }
        match self {
            FingerprintHash::MD5 => digest_hash(&mut Md5::default(), data),
            FingerprintHash::SHA256 => digest_hash(&mut Sha256::default(), data),
            FingerprintHash::SHA512 => digest_hash(&mut Sha512::default(), data),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FingerprintHash::MD5 => MD5_NAME,
            FingerprintHash::SHA256 => SHA256_NAME,
            FingerprintHash::SHA512 => SHA512_NAME,
        }
    }
}

/// Select which part of two keys to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyParts {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub(crate) enum PublicKeyData {
    Dsa(dsa::DsaPublicKey),
    Rsa(rsa::RsaPublicKey),
    Ecdsa(ecdsa::EcDsaPublicKey),
    Ed25519(ed25519::Ed25519PublicKey),
    SkEcdsa {
        key: ecdsa::EcDsaPublicKey,
        application: String,
    },
    SkEd25519 {
        key: ed25519::Ed25519PublicKey,
        application: String,
    },
    #[cfg(feature = "post-quantum")]
    Oqs(oqs::OqsPublicKey),
    #[cfg(feature = "post-quantum")]
    Hybrid {
        classical: Box<PublicKeyData>,
        oqs: oqs::OqsPublicKey,
    },
}

impl PublicKeyData {
    fn size(&self) -> usize {
        match self {
            PublicKeyData::Dsa(key) => key.size(),
            PublicKeyData::Rsa(key) => key.size(),
            PublicKeyData::Ecdsa(key) => key.size(),
            PublicKeyData::Ed25519(key) => key.size(),
            PublicKeyData::SkEcdsa { key, .. } => key.size(),
            PublicKeyData::SkEd25519 { key, .. } => key.size(),
            #[cfg(feature = "post-quantum")]
            PublicKeyData::Oqs(key) => key.size(),
            #[cfg(feature = "post-quantum")]
            PublicKeyData::Hybrid { classical, .. } => classical.size(),
        }
    }

    fn eq_data(&self, other: &Self) -> bool {
        match (self, other) {
            (PublicKeyData::Dsa(a), PublicKeyData::Dsa(b)) => a == b,
            (PublicKeyData::Rsa(a), PublicKeyData::Rsa(b)) => a == b,
            (PublicKeyData::Ecdsa(a), PublicKeyData::Ecdsa(b)) => a == b,
            (PublicKeyData::Ed25519(a), PublicKeyData::Ed25519(b)) => a == b,
            (
                PublicKeyData::SkEcdsa {
                    key: a,
                    application: app_a,
                },
                PublicKeyData::SkEcdsa {
                    key: b,
                    application: app_b,
                },
            ) => a == b && app_a == app_b,
            (
                PublicKeyData::SkEd25519 {
                    key: a,
                    application: app_a,
                },
                PublicKeyData::SkEd25519 {
                    key: b,
                    application: app_b,
                },
            ) => a == b && app_a == app_b,
            #[cfg(feature = "post-quantum")]
            (PublicKeyData::Oqs(a), PublicKeyData::Oqs(b)) => a == b,
            #[cfg(feature = "post-quantum")]
            (
                PublicKeyData::Hybrid {
                    classical: ca,
                    oqs: oa,
                },
                PublicKeyData::Hybrid {
                    classical: cb,
                    oqs: ob,
                },
            ) => ca.eq_data(cb) && oa == ob,
            _ => false,
        }
    }
}

/// General public key type
///
/// Holds any of the supported public key algorithms, optionally together
/// with the raw OpenSSH certificate it was imported from.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub(crate) algorithm: KeyAlgorithm,
    pub(crate) data: PublicKeyData,
    pub(crate) cert: Option<Vec<u8>>,
    comment: String,
}

impl PublicKey {
    pub(crate) fn from_parts(
        algorithm: KeyAlgorithm,
        data: PublicKeyData,
        cert: Option<Vec<u8>>,
    ) -> Self {
        PublicKey {
            algorithm,
            data,
            cert,
            comment: String::new(),
        }
    }

    /// Parse an OpenSSH public key string
    ///
    /// Accepts the one-line authorized-keys form and the public section of
    /// an OpenSSH v1 private key container.
    pub fn from_keystr(keystr: &str) -> PkiResult<Self> {
        if keystr.trim_start().starts_with(format::OPENSSH_HEADER_BEGIN) {
            return format::ossh_privkey::decode_ossh_pubkey_of_privkey(keystr);
        }
        format::ossh_pubkey::parse_authorized_line(keystr)
    }

    /// Import a public key from an RFC 4253 §6.6 blob
    pub fn from_blob(blob: &[u8]) -> PkiResult<Self> {
        format::ossh_pubkey::decode_pubkey_blob(blob)
    }

    /// Indicate the algorithm of the key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The canonical SSH identifier of the key algorithm
    pub fn name(&self) -> &'static str {
        self.algorithm.name().unwrap_or("unknown")
    }

    /// The size in bits of the key
    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn is_public(&self) -> bool {
        true
    }

    pub fn is_private(&self) -> bool {
        false
    }

    pub fn is_cert(&self) -> bool {
        self.cert.is_some()
    }

    /// The raw certificate blob for certificate keys
    pub fn cert_blob(&self) -> Option<&[u8]> {
        self.cert.as_deref()
    }

    /// The FIDO application string of security-key types
    pub fn sk_application(&self) -> Option<&str> {
        match &self.data {
            PublicKeyData::SkEcdsa { application, .. }
            | PublicKeyData::SkEd25519 { application, .. } => Some(application),
            _ => None,
        }
    }

    /// Return the RFC 4253 binary representation of the public key
    ///
    /// For certificate keys this is the whole certificate blob.
    pub fn blob(&self) -> PkiResult<Vec<u8>> {
        match &self.cert {
            Some(cert) => Ok(cert.clone()),
            None => encode_pubkey_blob(self.algorithm, &self.data),
        }
    }

    /// Hash the blob of the public key to generate the fingerprint
    pub fn fingerprint(&self, hash: FingerprintHash) -> PkiResult<Vec<u8>> {
        let blob = self.blob()?;
        Ok(hash.hash(&blob))
    }

    /// Serialize the public key as the OpenSSH one-line format
    pub fn serialize(&self) -> PkiResult<String> {
        serialize_authorized_line(self, &self.comment)
    }

    /// Get the comment of the key
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Get the mutable reference of the key comment
    pub fn comment_mut(&mut self) -> &mut String {
        &mut self.comment
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.data.eq_data(&other.data)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.serialize() {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[derive(Clone)]
pub(crate) enum KeyPairData {
    Dsa(dsa::DsaKeyPair),
    Rsa(rsa::RsaKeyPair),
    Ecdsa(ecdsa::EcDsaKeyPair),
    Ed25519(ed25519::Ed25519KeyPair),
    #[cfg(feature = "post-quantum")]
    Oqs(oqs::OqsKeyPair),
    #[cfg(feature = "post-quantum")]
    Hybrid {
        classical: Box<KeyPairData>,
        oqs: oqs::OqsKeyPair,
    },
}

impl KeyPairData {
    fn size(&self) -> usize {
        match self {
            KeyPairData::Dsa(key) => key.size(),
            KeyPairData::Rsa(key) => key.size(),
            KeyPairData::Ecdsa(key) => key.size(),
            KeyPairData::Ed25519(key) => key.size(),
            #[cfg(feature = "post-quantum")]
            KeyPairData::Oqs(key) => key.size(),
            #[cfg(feature = "post-quantum")]
            KeyPairData::Hybrid { classical, .. } => classical.size(),
        }
    }

    pub(crate) fn clone_public_data(&self) -> PkiResult<PublicKeyData> {
        Ok(match self {
            KeyPairData::Dsa(key) => PublicKeyData::Dsa(key.clone_public_key()?),
            KeyPairData::Rsa(key) => PublicKeyData::Rsa(key.clone_public_key()?),
            KeyPairData::Ecdsa(key) => PublicKeyData::Ecdsa(key.clone_public_key()?),
            KeyPairData::Ed25519(key) => PublicKeyData::Ed25519(key.clone_public_key()?),
            #[cfg(feature = "post-quantum")]
            KeyPairData::Oqs(key) => PublicKeyData::Oqs(key.clone_public_key()?),
            #[cfg(feature = "post-quantum")]
            KeyPairData::Hybrid { classical, oqs } => PublicKeyData::Hybrid {
                classical: Box::new(classical.clone_public_data()?),
                oqs: oqs.clone_public_key()?,
            },
        })
    }

    fn eq_private(&self, other: &Self) -> bool {
        match (self, other) {
            (KeyPairData::Dsa(a), KeyPairData::Dsa(b)) => a == b,
            (KeyPairData::Rsa(a), KeyPairData::Rsa(b)) => a == b,
            (KeyPairData::Ecdsa(a), KeyPairData::Ecdsa(b)) => a == b,
            (KeyPairData::Ed25519(a), KeyPairData::Ed25519(b)) => a == b,
            #[cfg(feature = "post-quantum")]
            (KeyPairData::Oqs(a), KeyPairData::Oqs(b)) => a == b,
            #[cfg(feature = "post-quantum")]
            (
                KeyPairData::Hybrid {
                    classical: ca,
                    oqs: oa,
                },
                KeyPairData::Hybrid {
                    classical: cb,
                    oqs: ob,
                },
            ) => ca.eq_private(cb) && oa == ob,
            _ => false,
        }
    }
}

/// General key pair type
///
/// The key pair holds both the private and the public part of an asymmetric
/// key. Secret material is wiped when the value is dropped.
pub struct KeyPair {
    pub(crate) algorithm: KeyAlgorithm,
    pub(crate) data: KeyPairData,
    pub(crate) cert: Option<Vec<u8>>,
    pub(crate) pkcs11_uri: Option<String>,
    comment: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    pub(crate) fn from_parts(algorithm: KeyAlgorithm, data: KeyPairData) -> Self {
        KeyPair {
            algorithm,
            data,
            cert: None,
            pkcs11_uri: None,
            comment: String::new(),
        }
    }

    /// Parse a private key from the supported container types
    ///
    /// The passphrase is required if the key is encrypted.
    pub fn from_keystr(keystr: &str, passphrase: Option<&str>) -> PkiResult<Self> {
        format::parse_keystr(keystr.as_bytes(), passphrase, None)
    }

    /// Generate a key pair of the given algorithm
    ///
    /// `parameter` is the bit length for RSA and DSA keys and is ignored for
    /// the fixed-size algorithms; zero selects the default everywhere.
    pub fn generate(algorithm: KeyAlgorithm, parameter: usize) -> PkiResult<Self> {
        let data = match algorithm {
            KeyAlgorithm::Rsa => KeyPairData::Rsa(rsa::RsaKeyPair::generate(parameter)?),
            KeyAlgorithm::Dss => KeyPairData::Dsa(dsa::DsaKeyPair::generate(parameter)?),
            KeyAlgorithm::Ecdsa => {
                // Deprecated generic tag: the parameter picks the curve
                let curve = match parameter {
                    0 | 256 => EcCurve::Nistp256,
                    384 => EcCurve::Nistp384,
                    521 => EcCurve::Nistp521,
                    _ => return Err(ErrorKind::InvalidKeySize.into()),
                };
                let pair = ecdsa::EcDsaKeyPair::generate(curve)?;
                return Ok(KeyPair::from_parts(
                    curve.algorithm(),
                    KeyPairData::Ecdsa(pair),
                ));
            }
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::EcdsaP384 | KeyAlgorithm::EcdsaP521 => {
                let curve = EcCurve::from_algorithm(algorithm)?;
                KeyPairData::Ecdsa(ecdsa::EcDsaKeyPair::generate(curve)?)
            }
            KeyAlgorithm::Ed25519 => KeyPairData::Ed25519(ed25519::Ed25519KeyPair::generate()?),
            #[cfg(feature = "post-quantum")]
            alg if alg.is_hybrid() => {
                let classical = match alg.hybrid_classical() {
                    Some(KeyAlgorithm::Rsa) => {
                        Box::new(KeyPairData::Rsa(rsa::RsaKeyPair::generate(3072)?))
                    }
                    Some(KeyAlgorithm::EcdsaP256) => Box::new(KeyPairData::Ecdsa(
                        ecdsa::EcDsaKeyPair::generate(EcCurve::Nistp256)?,
                    )),
                    _ => return Err(ErrorKind::UnsupportedType.into()),
                };
                KeyPairData::Hybrid {
                    classical,
                    oqs: oqs::OqsKeyPair::generate(algorithm)?,
                }
            }
            #[cfg(feature = "post-quantum")]
            alg if alg.is_oqs() => KeyPairData::Oqs(oqs::OqsKeyPair::generate(alg)?),
            _ => return Err(ErrorKind::UnsupportedType.into()),
        };
        Ok(KeyPair::from_parts(algorithm, data))
    }

    /// Indicate the algorithm of the key
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// The canonical SSH identifier of the key algorithm
    pub fn name(&self) -> &'static str {
        self.algorithm.name().unwrap_or("unknown")
    }

    /// The size in bits of the key
    pub fn size(&self) -> usize {
        self.data.size()
    }

    pub fn is_public(&self) -> bool {
        true
    }

    pub fn is_private(&self) -> bool {
        true
    }

    /// The attached certificate blob, if any
    pub fn cert_blob(&self) -> Option<&[u8]> {
        self.cert.as_deref()
    }

    /// The PKCS#11 URI this key came from, if any
    pub fn pkcs11_uri(&self) -> Option<&str> {
        self.pkcs11_uri.as_deref()
    }

    /// Clone the public parts of the key pair
    ///
    /// This is the demoting duplication: the result carries no private
    /// material. An attached certificate is cloned along.
    pub fn clone_public_key(&self) -> PkiResult<PublicKey> {
        let mut key = PublicKey::from_parts(
            self.algorithm,
            self.data.clone_public_data()?,
            self.cert.clone(),
        );
        key.comment = self.comment.clone();
        Ok(key)
    }

    /// Compare two key pairs over the selected parts
    pub fn compare(&self, other: &KeyPair, what: KeyParts) -> bool {
        if self.algorithm != other.algorithm {
            return false;
        }
        match what {
            KeyParts::Private => self.data.eq_private(&other.data),
            KeyParts::Public => match (self.clone_public_key(), other.clone_public_key()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Serialize the key pair into the OpenSSH v1 container
    pub fn serialize_openssh(
        &self,
        passphrase: Option<&str>,
        cipher: Cipher,
    ) -> PkiResult<String> {
        self.check_exportable()?;
        match passphrase {
            Some(passphrase) if !passphrase.is_empty() => {
                serialize_ossh_privkey(self, passphrase, cipher, 0)
            }
            _ => serialize_ossh_privkey(self, "", Cipher::Null, 0),
        }
    }

    /// Serialize the key pair into the OpenSSL PEM format
    pub fn serialize_pem(&self, passphrase: Option<&str>) -> PkiResult<String> {
        self.check_exportable()?;
        format::pem::stringify_pem_privkey(self, passphrase)
    }

    /// Serialize into the format the key would usually be stored in:
    /// PEM for the classical non-Ed25519 types, OpenSSH v1 otherwise
    pub fn serialize(&self, passphrase: Option<&str>) -> PkiResult<String> {
        match self.data {
            KeyPairData::Dsa(_) | KeyPairData::Rsa(_) | KeyPairData::Ecdsa(_) => {
                self.serialize_pem(passphrase)
            }
            _ => self.serialize_openssh(passphrase, Cipher::Aes256_Ctr),
        }
    }

    /// Get the OpenSSH one-line public key of the public parts
    pub fn serialize_publickey(&self) -> PkiResult<String> {
        let pubkey = self.clone_public_key()?;
        serialize_authorized_line(&pubkey, &self.comment)
    }

    fn check_exportable(&self) -> PkiResult<()> {
        if self.pkcs11_uri.is_some() {
            return Err(ErrorKind::NotExportable.into());
        }
        Ok(())
    }

    /// Get the comment of the key
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Get the mutable reference of the key comment
    pub fn comment_mut(&mut self) -> &mut String {
        &mut self.comment
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        KeyPair {
            algorithm: self.algorithm,
            data: self.data.clone(),
            cert: self.cert.clone(),
            pkcs11_uri: self.pkcs11_uri.clone(),
            comment: self.comment.clone(),
        }
    }
}
