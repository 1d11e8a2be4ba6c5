use std::io::Cursor;

use log::{debug, warn};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{ErrorKind, PkiResult};
use crate::keys::{KeyPair, KeyPairData, PublicKey, PublicKeyData};
use crate::keytype::{DigestAlgorithm, KeyAlgorithm};
use crate::session::Session;
use crate::sshbuf::{SshReadExt, SshWriteExt};

const DSA_SIG_LEN: usize = 40;
const ED25519_SIG_LEN: usize = 64;

/// A detached SSH signature
///
/// `algorithm` is the signature algorithm tag (always a plain type: an RSA
/// signature made with SHA-2 still carries the RSA tag). The raw signature
/// bytes are wiped on drop.
pub struct Signature {
    pub(crate) algorithm: KeyAlgorithm,
    pub(crate) hash: DigestAlgorithm,
    pub(crate) sig: Zeroizing<Vec<u8>>,
    #[cfg(feature = "post-quantum")]
    pub(crate) pq_sig: Option<Zeroizing<Vec<u8>>>,
    pub(crate) sk_flags: u8,
    pub(crate) sk_counter: u32,
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("algorithm", &self.algorithm)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl Signature {
    fn new(algorithm: KeyAlgorithm, hash: DigestAlgorithm, sig: Vec<u8>) -> Self {
        Signature {
            algorithm,
            hash,
            sig: Zeroizing::new(sig),
            #[cfg(feature = "post-quantum")]
            pq_sig: None,
            sk_flags: 0,
            sk_counter: 0,
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn hash(&self) -> DigestAlgorithm {
        self.hash
    }

    /// The FIDO authenticator flags of a security-key signature
    pub fn sk_flags(&self) -> u8 {
        self.sk_flags
    }

    /// The FIDO authenticator counter of a security-key signature
    pub fn sk_counter(&self) -> u32 {
        self.sk_counter
    }

    /// Serialize the signature into its wire blob
    pub fn to_blob(&self) -> PkiResult<Vec<u8>> {
        #[cfg(feature = "post-quantum")]
        {
            if self.algorithm.is_oqs() && !self.algorithm.is_hybrid() {
                // Pure post-quantum signatures are the raw scheme bytes
                let pq = self.pq_sig.as_ref().ok_or(ErrorKind::InvalidKeyFormat)?;
                return Ok(pq.to_vec());
            }
        }

        let classical = self.classical_blob()?;

        #[cfg(feature = "post-quantum")]
        {
            if let Some(pq) = &self.pq_sig {
                // u32 len | classical blob | u32 len | pq signature
                let mut buf = Vec::new();
                buf.write_string(&classical)?;
                buf.write_string(pq)?;
                return Ok(buf);
            }
        }

        Ok(classical)
    }

    fn classical_blob(&self) -> PkiResult<Vec<u8>> {
        let name = if self.algorithm.is_ecdsa_hybrid() {
            // ECDSA hybrids sign under the hybrid identifier itself
            self.algorithm.name()
        } else if self.algorithm.is_rsa_hybrid() {
            // The classical half of an RSA hybrid keeps the RSA identifiers
            KeyAlgorithm::Rsa.signature_name(self.hash)
        } else {
            self.algorithm.signature_name(self.hash)
        };
        let name = name.ok_or(ErrorKind::UnsupportedType)?;

        let mut buf = Vec::new();
        buf.write_utf8(name)?;
        buf.write_string(&self.sig)?;
        if self.algorithm.is_sk() {
            buf.write_uint8(self.sk_flags)?;
            buf.write_uint32(self.sk_counter)?;
        }
        Ok(buf)
    }

    /// Import a signature blob, validating it against the public key it
    /// claims to match
    pub fn from_blob(sig_blob: &[u8], key: &PublicKey) -> PkiResult<Signature> {
        #[cfg(feature = "post-quantum")]
        {
            let key_type = key.algorithm().plain();
            if key_type.is_hybrid() {
                return Signature::from_hybrid_blob(sig_blob, key);
            }
            if key_type.is_oqs() {
                let mut sig = Signature::new(key_type, DigestAlgorithm::Auto, Vec::new());
                sig.pq_sig = Some(Zeroizing::new(sig_blob.to_vec()));
                return Ok(sig);
            }
        }
        Signature::from_classical_blob(sig_blob, key)
    }

    fn from_classical_blob(bytes: &[u8], key: &PublicKey) -> PkiResult<Signature> {
        let mut reader = Cursor::new(bytes);
        let alg_name = reader.read_utf8()?;
        let algorithm = KeyAlgorithm::from_signature_name(&alg_name);
        if algorithm == KeyAlgorithm::Unknown {
            return Err(ErrorKind::UnsupportedType.into());
        }
        let hash = KeyAlgorithm::hash_from_name(&alg_name);
        let sig_bytes = reader.read_string()?;

        let mut sig = Signature::new(algorithm, hash, sig_bytes);
        if algorithm.is_sk() {
            sig.sk_flags = reader.read_uint8()?;
            sig.sk_counter = reader.read_uint32()?;
        }
        sig.check_lengths(key)?;
        Ok(sig)
    }

    #[cfg(feature = "post-quantum")]
    fn from_hybrid_blob(sig_blob: &[u8], key: &PublicKey) -> PkiResult<Signature> {
        let mut reader = Cursor::new(sig_blob);
        let classical = reader.read_string()?;
        let pq = reader.read_string()?;
        // The four components must cover the blob exactly
        if reader.position() as usize != sig_blob.len() {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        let mut sig = Signature::from_classical_blob(&classical, key)?;
        sig.pq_sig = Some(Zeroizing::new(pq));
        Ok(sig)
    }

    // Cheap shape checks before any provider call.
    fn check_lengths(&self, key: &PublicKey) -> PkiResult<()> {
        let ok = match self.algorithm {
            KeyAlgorithm::Dss => self.sig.len() == DSA_SIG_LEN,
            KeyAlgorithm::Ed25519 | KeyAlgorithm::SkEd25519 => self.sig.len() == ED25519_SIG_LEN,
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::SkEcdsa => self.sig.len() == 64,
            KeyAlgorithm::EcdsaP384 => self.sig.len() == 96,
            KeyAlgorithm::EcdsaP521 => self.sig.len() == 132,
            KeyAlgorithm::Rsa => match &key.data {
                PublicKeyData::Rsa(rsa) => self.sig.len() <= (rsa.size() + 7) / 8,
                _ => true,
            },
            _ => true,
        };
        if !ok {
            return Err(ErrorKind::InvalidKeyFormat.into());
        }
        Ok(())
    }
}

/// Check that the key type may produce or check signatures with the given
/// digest
pub(crate) fn check_hash_compatible(
    algorithm: KeyAlgorithm,
    hash: DigestAlgorithm,
    fips: bool,
) -> PkiResult<()> {
    let compatible = match algorithm.plain() {
        KeyAlgorithm::Dss => hash == DigestAlgorithm::Sha1,
        KeyAlgorithm::Rsa => matches!(
            hash,
            DigestAlgorithm::Sha1 | DigestAlgorithm::Sha256 | DigestAlgorithm::Sha512
        ),
        KeyAlgorithm::EcdsaP256 | KeyAlgorithm::SkEcdsa => hash == DigestAlgorithm::Sha256,
        KeyAlgorithm::EcdsaP384 => hash == DigestAlgorithm::Sha384,
        KeyAlgorithm::EcdsaP521 => hash == DigestAlgorithm::Sha512,
        KeyAlgorithm::Ed25519 | KeyAlgorithm::SkEd25519 => hash == DigestAlgorithm::Auto,
        #[cfg(feature = "post-quantum")]
        alg if alg.is_rsa_hybrid() => matches!(
            hash,
            DigestAlgorithm::Sha1 | DigestAlgorithm::Sha256 | DigestAlgorithm::Sha512
        ),
        #[cfg(feature = "post-quantum")]
        alg if alg.is_ecdsa_hybrid() => hash == DigestAlgorithm::Sha256,
        #[cfg(feature = "post-quantum")]
        alg if alg.is_oqs() => hash == DigestAlgorithm::Auto,
        _ => {
            warn!("Unknown key type {:?}", algorithm);
            false
        }
    };
    if !compatible {
        warn!(
            "Key type {:?} incompatible with hash type {}",
            algorithm,
            hash.name()
        );
        return Err(ErrorKind::IncompatibleHash.into());
    }
    if fips && hash == DigestAlgorithm::Sha1 {
        warn!("SHA1 is not allowed in FIPS mode");
        return Err(ErrorKind::IncompatibleHash.into());
    }
    Ok(())
}

/// Sign arbitrary data with the private key (`pki_do_sign`)
///
/// The digest must be compatible with the key type; Ed25519 and pure
/// post-quantum schemes take `Auto` and hash internally.
pub fn sign_data(
    privkey: &KeyPair,
    data: &[u8],
    hash: DigestAlgorithm,
    fips: bool,
) -> PkiResult<Signature> {
    check_hash_compatible(privkey.algorithm(), hash, fips)?;
    sign_pair_data(&privkey.data, privkey.algorithm(), data, hash)
}

fn sign_pair_data(
    data_key: &KeyPairData,
    algorithm: KeyAlgorithm,
    data: &[u8],
    hash: DigestAlgorithm,
) -> PkiResult<Signature> {
    let sig = match data_key {
        KeyPairData::Rsa(key) => Signature::new(algorithm, hash, key.sign(data, hash)?),
        KeyPairData::Dsa(key) => Signature::new(algorithm, hash, key.sign(data)?),
        KeyPairData::Ecdsa(key) => Signature::new(algorithm, hash, key.sign(data)?),
        KeyPairData::Ed25519(key) => Signature::new(algorithm, hash, key.sign(data)?),
        #[cfg(feature = "post-quantum")]
        KeyPairData::Oqs(key) => {
            let mut sig = Signature::new(algorithm, DigestAlgorithm::Auto, Vec::new());
            sig.pq_sig = Some(Zeroizing::new(key.sign(data)?));
            sig
        }
        #[cfg(feature = "post-quantum")]
        KeyPairData::Hybrid { classical, oqs } => {
            // Sign twice over the same input, then compose
            let mut sig = sign_pair_data(classical, algorithm, data, hash)?;
            sig.pq_sig = Some(Zeroizing::new(oqs.sign(data)?));
            sig
        }
    };
    Ok(sig)
}

/// Build the pre-image a FIDO authenticator actually signed:
/// `SHA256(application) ∥ flags ∥ counter ∥ SHA256(input)`
fn sk_preimage(application: &str, flags: u8, counter: u32, input: &[u8]) -> Zeroizing<Vec<u8>> {
    let app_hash = Sha256::digest(application.as_bytes());
    let input_hash = Sha256::digest(input);

    let mut buf = Zeroizing::new(Vec::with_capacity(app_hash.len() + 5 + input_hash.len()));
    buf.extend_from_slice(&app_hash);
    buf.push(flags);
    buf.extend_from_slice(&counter.to_be_bytes());
    buf.extend_from_slice(&input_hash);
    buf
}

// Raw crypto verification, after all the policy checks.
fn verify_public_data(
    data_key: &PublicKeyData,
    sig: &Signature,
    data: &[u8],
) -> PkiResult<bool> {
    match data_key {
        PublicKeyData::Dsa(key) => key.verify(data, &sig.sig),
        PublicKeyData::Rsa(key) => key.verify(data, &sig.sig, sig.hash),
        PublicKeyData::Ecdsa(key) => key.verify(data, &sig.sig),
        PublicKeyData::Ed25519(key) => key.verify(data, &sig.sig),
        PublicKeyData::SkEcdsa { key, .. } => key.verify(data, &sig.sig),
        PublicKeyData::SkEd25519 { key, .. } => key.verify(data, &sig.sig),
        #[cfg(feature = "post-quantum")]
        PublicKeyData::Oqs(key) => {
            let pq = sig.pq_sig.as_ref().ok_or(ErrorKind::InvalidKeyFormat)?;
            key.verify(data, pq)
        }
        #[cfg(feature = "post-quantum")]
        PublicKeyData::Hybrid { classical, oqs } => {
            // Success requires BOTH halves to verify
            let pq = sig.pq_sig.as_ref().ok_or(ErrorKind::InvalidKeyFormat)?;
            Ok(verify_public_data(classical, sig, data)? && oqs.verify(data, pq)?)
        }
    }
}

pub(crate) fn verify_data_signature(
    sig: &Signature,
    key: &PublicKey,
    data: &[u8],
) -> PkiResult<()> {
    if verify_public_data(&key.data, sig, data)? {
        Ok(())
    } else {
        Err(ErrorKind::VerifyFailed.into())
    }
}

/// Verify a signature against a key in the context of a session
/// (`ssh_pki_signature_verify`)
pub fn signature_verify(
    session: &dyn Session,
    sig: &Signature,
    key: &PublicKey,
    input: &[u8],
) -> PkiResult<()> {
    let key_type = key.algorithm().plain();
    let classical_present = !key_type.is_oqs() || key_type.is_hybrid();

    if classical_present {
        debug!(
            "Going to verify a {} type signature",
            sig.algorithm.name().unwrap_or("unknown")
        );

        // RSA hybrids keep the classical RSA identifier in the blob
        let type_matches = key_type == sig.algorithm
            || (sig.algorithm == KeyAlgorithm::Rsa && key_type.is_rsa_hybrid());
        if !type_matches {
            warn!(
                "Can not verify {:?} signature with {:?} key",
                sig.algorithm,
                key.algorithm()
            );
            return Err(ErrorKind::AlgorithmMismatch.into());
        }

        check_hash_compatible(key.algorithm(), sig.hash, session.fips_mode())?;

        if key.algorithm().is_sk() {
            let application = key
                .sk_application()
                .ok_or(ErrorKind::InvalidKeyFormat)?;
            let preimage = sk_preimage(application, sig.sk_flags, sig.sk_counter, input);
            return verify_data_signature(sig, key, &preimage);
        }
    }

    verify_data_signature(sig, key, input)
}
