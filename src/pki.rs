//! The PKI façade: import/export entry points, key generation, and the
//! session-bound signing and verification operations.

use std::fs;
use std::str::FromStr;

use log::{info, warn};
use zeroize::Zeroizing;

use crate::cipher::Cipher;
use crate::error::{ErrorKind, PkiResult};
use crate::format::{self, AuthCallback};
use crate::keys::{KeyPair, PublicKey};
use crate::keytype::{DigestAlgorithm, KeyAlgorithm};
use crate::pkcs11::{self, Pkcs11Backend};
use crate::session::{AgentSigner, Session};
use crate::signature::{sign_data, Signature};
use crate::sshbuf::SshWriteExt;

/// The largest private key file accepted by the importers
#[cfg(feature = "post-quantum")]
pub const MAX_PRIVKEY_SIZE: u64 = 8 * 1024 * 1024;
/// The largest private key file accepted by the importers
#[cfg(not(feature = "post-quantum"))]
pub const MAX_PRIVKEY_SIZE: u64 = 4 * 1024 * 1024;
/// The largest public key file accepted by the importers
pub const MAX_PUBKEY_SIZE: u64 = 1024 * 1024;

fn read_file_capped(filename: &str, cap: u64) -> PkiResult<String> {
    let metadata = fs::metadata(filename)?;
    if metadata.len() > cap {
        warn!("Key file {} is bigger than {} bytes", filename, cap);
        return Err(ErrorKind::TooLarge.into());
    }
    let data = fs::read(filename)?;
    String::from_utf8(data).map_err(|_| ErrorKind::InvalidKeyFormat.into())
}

fn write_key_file(filename: &str, contents: &str) -> PkiResult<()> {
    if let Err(err) = fs::write(filename, contents) {
        // Never leave a half-written key file behind
        let _ = fs::remove_file(filename);
        return Err(err.into());
    }
    Ok(())
}

/// Import a private key from a memory string
///
/// The OpenSSH v1 container and the legacy PEM formats are both accepted;
/// the header decides which decoder runs.
pub fn import_privkey_base64(
    keystr: &str,
    passphrase: Option<&str>,
    auth: Option<AuthCallback>,
) -> PkiResult<KeyPair> {
    if keystr.is_empty() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    info!(
        "Trying to decode privkey passphrase={}",
        passphrase.is_some()
    );
    format::parse_keystr(keystr.as_bytes(), passphrase, auth)
}

/// Import a private key from a file
///
/// `pkcs11:` URIs are refused here; use
/// [`import_privkey_file_with_pkcs11()`](fn.import_privkey_file_with_pkcs11.html)
/// to route them to a backend.
pub fn import_privkey_file(
    filename: &str,
    passphrase: Option<&str>,
    auth: Option<AuthCallback>,
) -> PkiResult<KeyPair> {
    if filename.is_empty() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    if pkcs11::is_uri(filename) {
        return Err(ErrorKind::Pkcs11Unavailable.into());
    }
    let contents = read_file_capped(filename, MAX_PRIVKEY_SIZE)?;
    import_privkey_base64(&contents, passphrase, auth)
}

/// Import a private key from a file or a PKCS#11 device
pub fn import_privkey_file_with_pkcs11(
    filename: &str,
    passphrase: Option<&str>,
    auth: Option<AuthCallback>,
    backend: &dyn Pkcs11Backend,
) -> PkiResult<KeyPair> {
    if pkcs11::is_uri(filename) {
        return backend.import_keypair(filename);
    }
    import_privkey_file(filename, passphrase, auth)
}

/// Export a private key to a memory string
///
/// Classical non-Ed25519 keys are written as PEM, everything else as the
/// OpenSSH v1 container. Keys backed by a PKCS#11 token are refused.
pub fn export_privkey_base64(privkey: &KeyPair, passphrase: Option<&str>) -> PkiResult<String> {
    privkey.serialize(passphrase)
}

/// Export a private key to a file
///
/// On a write error the partially written file is removed.
pub fn export_privkey_file(
    privkey: &KeyPair,
    passphrase: Option<&str>,
    filename: &str,
) -> PkiResult<()> {
    let contents = export_privkey_base64(privkey, passphrase)?;
    write_key_file(filename, &contents)
}

/// Import a public key from its base64 blob, checking it against the
/// expected algorithm
pub fn import_pubkey_base64(b64_key: &str, algorithm: KeyAlgorithm) -> PkiResult<PublicKey> {
    let blob = base64::decode(b64_key)?;
    let key = PublicKey::from_blob(&blob)?;
    if key.algorithm() != algorithm {
        return Err(ErrorKind::InvalidKeyFormat.into());
    }
    Ok(key)
}

/// Import a public key from an RFC 4253 §6.6 blob
pub fn import_pubkey_blob(key_blob: &[u8]) -> PkiResult<PublicKey> {
    PublicKey::from_blob(key_blob)
}

/// Import a public key from a file
///
/// Recognizes the one-line authorized-keys format and the public section of
/// OpenSSH v1 private key files.
pub fn import_pubkey_file(filename: &str) -> PkiResult<PublicKey> {
    if filename.is_empty() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    if pkcs11::is_uri(filename) {
        return Err(ErrorKind::Pkcs11Unavailable.into());
    }
    let contents = read_file_capped(filename, MAX_PUBKEY_SIZE)?;
    PublicKey::from_keystr(&contents)
}

/// Import a public key from a file or a PKCS#11 device
pub fn import_pubkey_file_with_pkcs11(
    filename: &str,
    backend: &dyn Pkcs11Backend,
) -> PkiResult<PublicKey> {
    if pkcs11::is_uri(filename) {
        return backend.import_pubkey(filename);
    }
    import_pubkey_file(filename)
}

/// Import a certificate from its base64 blob
pub fn import_cert_base64(b64_cert: &str, algorithm: KeyAlgorithm) -> PkiResult<PublicKey> {
    import_pubkey_base64(b64_cert, algorithm)
}

/// Import a certificate from a blob
pub fn import_cert_blob(cert_blob: &[u8]) -> PkiResult<PublicKey> {
    import_pubkey_blob(cert_blob)
}

/// Import a certificate from a file
pub fn import_cert_file(filename: &str) -> PkiResult<PublicKey> {
    import_pubkey_file(filename)
}

/// Export a public key as its base64 encoded blob
pub fn export_pubkey_base64(key: &PublicKey) -> PkiResult<String> {
    Ok(base64::encode(key.blob()?))
}

/// Export a public key to a file in the authorized-keys format
pub fn export_pubkey_file(key: &PublicKey, filename: &str) -> PkiResult<()> {
    if filename.is_empty() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    let mut line = key.serialize()?;
    line.push('\n');
    write_key_file(filename, &line)
}

/// Create a public key from a private key (demoting duplication)
pub fn export_privkey_to_pubkey(privkey: &KeyPair) -> PkiResult<PublicKey> {
    privkey.clone_public_key()
}

/// Copy the certificate part of a public key into a private key
///
/// Fails when the source carries no certificate or the private key already
/// has one attached.
pub fn copy_cert_to_privkey(certkey: &PublicKey, privkey: &mut KeyPair) -> PkiResult<()> {
    if privkey.cert.is_some() {
        return Err(ErrorKind::InvalidArgument.into());
    }
    let cert = certkey.cert.as_ref().ok_or(ErrorKind::InvalidArgument)?;
    privkey.cert = Some(cert.clone());
    Ok(())
}

/// Generate a key pair
///
/// `parameter` is the bit length for RSA and DSA; it is ignored for the
/// fixed-parameter algorithms.
pub fn generate(algorithm: KeyAlgorithm, parameter: usize) -> PkiResult<KeyPair> {
    KeyPair::generate(algorithm, parameter)
}

/// Export an OpenSSH v1 container with an explicit cipher and bcrypt round
/// count
pub fn export_privkey_openssh(
    privkey: &KeyPair,
    passphrase: Option<&str>,
    cipher: Cipher,
) -> PkiResult<String> {
    privkey.serialize_openssh(passphrase, cipher)
}

/// Parse a cipher name for [`export_privkey_openssh()`](fn.export_privkey_openssh.html)
pub fn cipher_from_name(name: &str) -> PkiResult<Cipher> {
    Cipher::from_str(name)
}

/// Sign `data` for SSH user authentication (`ssh_pki_do_sign`)
///
/// The input actually signed is `string(session_id) ∥ data`; the result is
/// the serialized signature blob.
pub fn do_sign(
    session: &dyn Session,
    privkey: &KeyPair,
    data: &[u8],
    hash: DigestAlgorithm,
) -> PkiResult<Vec<u8>> {
    let session_id = session.session_id().ok_or(ErrorKind::InvalidArgument)?;

    let mut sign_input: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::new());
    sign_input.write_string(session_id)?;
    sign_input.extend_from_slice(data);

    let sig = sign_data(privkey, &sign_input, hash, session.fips_mode())?;
    sig.to_blob()
}

/// Sign through the SSH agent instead of a local private key
/// (`ssh_pki_do_sign_agent`)
pub fn do_sign_agent(
    session: &dyn Session,
    agent: &mut dyn AgentSigner,
    pubkey: &PublicKey,
    data: &[u8],
) -> PkiResult<Vec<u8>> {
    let session_id = session.session_id().ok_or(ErrorKind::InvalidArgument)?;

    let mut sig_input = Vec::new();
    sig_input.write_string(session_id)?;
    sig_input.extend_from_slice(data);

    agent.sign_data(pubkey, &sig_input)
}

/// Server-side host key signature over the current exchange hash
/// (`ssh_srv_pki_do_sign_sessionid`)
///
/// Unlike [`do_sign()`](fn.do_sign.html) the hash goes into the signed input
/// as a bare byte-run, without a length prefix.
pub fn srv_do_sign_session_id(
    session: &dyn Session,
    privkey: &KeyPair,
    hash: DigestAlgorithm,
) -> PkiResult<Vec<u8>> {
    let exchange_hash = session.exchange_hash().ok_or(ErrorKind::InvalidArgument)?;

    let sign_input = Zeroizing::new(exchange_hash.to_vec());
    let sig = sign_data(privkey, &sign_input, hash, session.fips_mode())?;
    sig.to_blob()
}

/// Verify a signature against a public key in the context of a session
pub fn signature_verify(
    session: &dyn Session,
    sig: &Signature,
    key: &PublicKey,
    input: &[u8],
) -> PkiResult<()> {
    crate::signature::signature_verify(session, sig, key, input)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::test::TestSession;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> String {
        let mut path = PathBuf::from(std::env::temp_dir());
        path.push(format!("sshpki-test-{}-{}", std::process::id(), name));
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn privkey_file_roundtrip() {
        let path = temp_path("ed25519");
        let keypair = generate(KeyAlgorithm::Ed25519, 0).unwrap();
        export_privkey_file(&keypair, Some("hunter2"), &path).unwrap();

        let imported = import_privkey_file(&path, Some("hunter2"), None).unwrap();
        assert!(imported.compare(&keypair, crate::keys::KeyParts::Private));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn pubkey_file_roundtrip() {
        let path = temp_path("ed25519-pub");
        let mut pubkey = generate(KeyAlgorithm::Ed25519, 0)
            .unwrap()
            .clone_public_key()
            .unwrap();
        *pubkey.comment_mut() = "user@host".into();
        export_pubkey_file(&pubkey, &path).unwrap();

        let imported = import_pubkey_file(&path).unwrap();
        assert!(imported == pubkey);
        assert_eq!(imported.comment(), "user@host");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_not_found() {
        let err = import_privkey_file("/nonexistent/sshpki-key", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = import_pubkey_file("/nonexistent/sshpki-key.pub").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn oversized_file_is_rejected() {
        let path = temp_path("oversized");
        let data = vec![b'a'; (MAX_PUBKEY_SIZE + 1) as usize];
        fs::write(&path, &data).unwrap();
        let err = import_pubkey_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn pkcs11_uri_needs_a_backend() {
        let err = import_privkey_file("pkcs11:object=my-key;type=private", None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Pkcs11Unavailable);
    }

    #[test]
    fn session_signing_binds_the_session_id() {
        let session = TestSession::default();
        let keypair = generate(KeyAlgorithm::Ed25519, 0).unwrap();
        let pubkey = keypair.clone_public_key().unwrap();

        let blob = do_sign(&session, &keypair, b"userauth request", DigestAlgorithm::Auto).unwrap();
        let sig = Signature::from_blob(&blob, &pubkey).unwrap();

        // The signed input is string(session_id) ∥ data
        let mut expected = Vec::new();
        expected.write_string(&session.session_id).unwrap();
        expected.extend_from_slice(b"userauth request");
        assert!(signature_verify(&session, &sig, &pubkey, b"userauth request").is_err());
        assert!(crate::signature::verify_data_signature(&sig, &pubkey, &expected).is_ok());

        // A different session id must not verify
        let mut other = TestSession::default();
        other.session_id = vec![0x5a; 32];
        let mut other_input = Vec::new();
        other_input.write_string(&other.session_id).unwrap();
        other_input.extend_from_slice(b"userauth request");
        assert!(crate::signature::verify_data_signature(&sig, &pubkey, &other_input).is_err());
    }

    #[test]
    fn server_signing_uses_bare_hash() {
        let session = TestSession::default();
        let keypair = generate(KeyAlgorithm::Ed25519, 0).unwrap();
        let pubkey = keypair.clone_public_key().unwrap();

        let blob = srv_do_sign_session_id(&session, &keypair, DigestAlgorithm::Auto).unwrap();
        let sig = Signature::from_blob(&blob, &pubkey).unwrap();

        // No length prefix on the server side
        assert!(crate::signature::verify_data_signature(&sig, &pubkey, &session.session_id).is_ok());
        let mut prefixed = Vec::new();
        prefixed.write_string(&session.session_id).unwrap();
        assert!(crate::signature::verify_data_signature(&sig, &pubkey, &prefixed).is_err());
    }

    #[test]
    fn agent_signing_gets_the_prefixed_buffer() {
        struct LocalAgent(KeyPair);
        impl AgentSigner for LocalAgent {
            fn sign_data(&mut self, _pubkey: &PublicKey, data: &[u8]) -> PkiResult<Vec<u8>> {
                sign_data(&self.0, data, DigestAlgorithm::Auto, false)?.to_blob()
            }
        }

        let session = TestSession::default();
        let keypair = generate(KeyAlgorithm::Ed25519, 0).unwrap();
        let pubkey = keypair.clone_public_key().unwrap();
        let mut agent = LocalAgent(keypair);

        let blob = do_sign_agent(&session, &mut agent, &pubkey, b"payload").unwrap();
        let sig = Signature::from_blob(&blob, &pubkey).unwrap();

        let mut expected = Vec::new();
        expected.write_string(&session.session_id).unwrap();
        expected.extend_from_slice(b"payload");
        assert!(crate::signature::verify_data_signature(&sig, &pubkey, &expected).is_ok());
    }
}
