use log::{debug, warn};

use crate::error::PkiResult;
use crate::keys::PublicKey;
use crate::keytype::{DigestAlgorithm, KeyAlgorithm};

/// RFC 8332: the peer advertised `rsa-sha2-256` via `server-sig-algs`
pub const SSH_EXT_SIG_RSA_SHA256: u32 = 0x01;
/// RFC 8332: the peer advertised `rsa-sha2-512` via `server-sig-algs`
pub const SSH_EXT_SIG_RSA_SHA512: u32 = 0x02;

/// Encode an OpenSSH version triple the way
/// [`Session::peer_openssh_version()`](trait.Session.html#method.peer_openssh_version)
/// reports it
pub const fn openssh_version(major: u32, minor: u32, micro: u32) -> u32 {
    (major << 16) | (minor << 8) | micro
}

const DEFAULT_HOSTKEY_ALGORITHMS: &str = "ssh-ed25519,ecdsa-sha2-nistp521,\
     ecdsa-sha2-nistp384,ecdsa-sha2-nistp256,rsa-sha2-512,rsa-sha2-256";
const FIPS_HOSTKEY_ALGORITHMS: &str =
    "ecdsa-sha2-nistp521,ecdsa-sha2-nistp384,ecdsa-sha2-nistp256,rsa-sha2-512,rsa-sha2-256";

/// Read-only view of the SSH session consulted by the signing and
/// verification entry points
///
/// The PKI layer never mutates the session; it only reads the negotiated
/// state.
pub trait Session {
    /// The session identifier (the hash of the initial key exchange)
    fn session_id(&self) -> Option<&[u8]>;

    /// The current exchange hash, used by server-side host key signing
    fn exchange_hash(&self) -> Option<&[u8]> {
        self.session_id()
    }

    /// Bitmask of the `SSH_EXT_SIG_RSA_*` extension flags
    fn extensions(&self) -> u32 {
        0
    }

    /// The peer's OpenSSH version as encoded by
    /// [`openssh_version()`](fn.openssh_version.html), or 0 when the peer is
    /// not OpenSSH
    fn peer_openssh_version(&self) -> u32 {
        0
    }

    fn is_client(&self) -> bool;

    fn is_server(&self) -> bool {
        !self.is_client()
    }

    /// The configured `PubkeyAcceptedTypes` list, if any
    fn pubkey_accepted_types(&self) -> Option<&str> {
        None
    }

    /// The host key algorithms a server is willing to use
    fn server_hostkey_algorithms(&self) -> Option<&str> {
        None
    }

    /// Whether the process runs in FIPS mode
    fn fips_mode(&self) -> bool {
        false
    }
}

/// The agent collaborator used by
/// [`pki::do_sign_agent()`](../pki/fn.do_sign_agent.html)
pub trait AgentSigner {
    /// Ask the agent holding `pubkey` to sign `data`, returning the
    /// serialized signature blob
    fn sign_data(&mut self, pubkey: &PublicKey, data: &[u8]) -> PkiResult<Vec<u8>>;
}

fn match_group(list: &str, name: &str) -> bool {
    list.split(',').any(|entry| entry == name)
}

/// Check a signature algorithm name against the session's allowed list
pub fn algorithm_allowed(session: &dyn Session, name: &str) -> bool {
    let allowed_list;
    if session.is_client() {
        allowed_list = match session.pubkey_accepted_types() {
            Some(list) => list,
            None => {
                if session.fips_mode() {
                    FIPS_HOSTKEY_ALGORITHMS
                } else {
                    DEFAULT_HOSTKEY_ALGORITHMS
                }
            }
        };
    } else {
        allowed_list = match session.server_hostkey_algorithms() {
            Some(list) => list,
            None => {
                warn!("Session invalid: no host key available");
                return false;
            }
        };
    }

    debug!("Checking {} with list <{}>", name, allowed_list);
    match_group(allowed_list, name)
}

/// Convert a key algorithm to the digest to sign with on this session
///
/// This is unambiguous for everything except RSA, where the RFC 8332
/// extensions negotiated during key exchange (and, for certificates, the
/// peer's OpenSSH version) decide between SHA-2 and SHA-1.
pub fn hash_for_key_type(session: &dyn Session, algorithm: KeyAlgorithm) -> DigestAlgorithm {
    match algorithm {
        KeyAlgorithm::Dss | KeyAlgorithm::DssCert => DigestAlgorithm::Sha1,
        KeyAlgorithm::Rsa | KeyAlgorithm::RsaCert => {
            if algorithm == KeyAlgorithm::RsaCert {
                // Old OpenSSH versions do not support SHA2 in certificates
                let peer = session.peer_openssh_version();
                if peer > 0 && peer < openssh_version(7, 2, 0) {
                    debug!(
                        "We are talking to an old OpenSSH ({:x}); using SHA1",
                        peer
                    );
                    return DigestAlgorithm::Sha1;
                }
            }
            if algorithm_allowed(session, "rsa-sha2-512")
                && (session.extensions() & SSH_EXT_SIG_RSA_SHA512) != 0
            {
                return DigestAlgorithm::Sha512;
            }
            if algorithm_allowed(session, "rsa-sha2-256")
                && (session.extensions() & SSH_EXT_SIG_RSA_SHA256) != 0
            {
                return DigestAlgorithm::Sha256;
            }
            DigestAlgorithm::Sha1
        }
        KeyAlgorithm::EcdsaP256
        | KeyAlgorithm::EcdsaP256Cert
        | KeyAlgorithm::EcdsaP384
        | KeyAlgorithm::EcdsaP384Cert
        | KeyAlgorithm::EcdsaP521
        | KeyAlgorithm::EcdsaP521Cert
        | KeyAlgorithm::Ed25519
        | KeyAlgorithm::Ed25519Cert
        | KeyAlgorithm::SkEcdsa
        | KeyAlgorithm::SkEcdsaCert
        | KeyAlgorithm::SkEd25519
        | KeyAlgorithm::SkEd25519Cert => algorithm.default_digest(),
        #[cfg(feature = "post-quantum")]
        alg if alg.is_oqs() => alg.default_digest(),
        _ => {
            warn!(
                "Digest algorithm to be used with key type {:?} is not defined",
                algorithm
            );
            DigestAlgorithm::Auto
        }
    }
}

/// The signature algorithm name to use with the given key type on this
/// session
pub fn signature_algorithm_for(
    session: &dyn Session,
    algorithm: KeyAlgorithm,
) -> Option<&'static str> {
    if algorithm == KeyAlgorithm::RsaCert {
        // Old OpenSSH versions lack rsa-sha2-*-cert-v01@openssh.com
        let peer = session.peer_openssh_version();
        if peer > 0 && peer < openssh_version(7, 8, 0) {
            debug!(
                "We are talking to an old OpenSSH ({:x}); using the old cert format",
                peer
            );
            return Some("ssh-rsa-cert-v01@openssh.com");
        }
    }

    let hash = hash_for_key_type(session, algorithm);
    algorithm.signature_name(hash)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Minimal client session for the unit tests
    pub(crate) struct TestSession {
        pub session_id: Vec<u8>,
        pub extensions: u32,
        pub peer_openssh: u32,
        pub client: bool,
        pub accepted: Option<String>,
        pub hostkeys: Option<String>,
        pub fips: bool,
    }

    impl Default for TestSession {
        fn default() -> Self {
            TestSession {
                session_id: vec![0xa5; 32],
                extensions: 0,
                peer_openssh: 0,
                client: true,
                accepted: None,
                hostkeys: None,
                fips: false,
            }
        }
    }

    impl Session for TestSession {
        fn session_id(&self) -> Option<&[u8]> {
            Some(&self.session_id)
        }
        fn extensions(&self) -> u32 {
            self.extensions
        }
        fn peer_openssh_version(&self) -> u32 {
            self.peer_openssh
        }
        fn is_client(&self) -> bool {
            self.client
        }
        fn pubkey_accepted_types(&self) -> Option<&str> {
            self.accepted.as_deref()
        }
        fn server_hostkey_algorithms(&self) -> Option<&str> {
            self.hostkeys.as_deref()
        }
        fn fips_mode(&self) -> bool {
            self.fips
        }
    }

    #[test]
    fn rsa_prefers_sha512_then_sha256() {
        let mut session = TestSession::default();
        session.extensions = SSH_EXT_SIG_RSA_SHA256 | SSH_EXT_SIG_RSA_SHA512;
        assert_eq!(
            hash_for_key_type(&session, KeyAlgorithm::Rsa),
            DigestAlgorithm::Sha512
        );

        session.extensions = SSH_EXT_SIG_RSA_SHA256;
        assert_eq!(
            hash_for_key_type(&session, KeyAlgorithm::Rsa),
            DigestAlgorithm::Sha256
        );

        session.extensions = 0;
        assert_eq!(
            hash_for_key_type(&session, KeyAlgorithm::Rsa),
            DigestAlgorithm::Sha1
        );
    }

    #[test]
    fn old_openssh_cert_downgrades() {
        let mut session = TestSession::default();
        session.extensions = SSH_EXT_SIG_RSA_SHA512;
        session.peer_openssh = openssh_version(7, 1, 0);
        assert_eq!(
            hash_for_key_type(&session, KeyAlgorithm::RsaCert),
            DigestAlgorithm::Sha1
        );
        // Plain RSA keys are unaffected by the certificate quirk
        assert_eq!(
            hash_for_key_type(&session, KeyAlgorithm::Rsa),
            DigestAlgorithm::Sha512
        );

        session.peer_openssh = openssh_version(7, 6, 0);
        assert_eq!(
            signature_algorithm_for(&session, KeyAlgorithm::RsaCert),
            Some("ssh-rsa-cert-v01@openssh.com")
        );
        session.peer_openssh = openssh_version(8, 0, 0);
        assert_eq!(
            signature_algorithm_for(&session, KeyAlgorithm::RsaCert),
            Some("rsa-sha2-512-cert-v01@openssh.com")
        );
    }

    #[test]
    fn allowed_list_is_consulted() {
        let mut session = TestSession::default();
        assert!(algorithm_allowed(&session, "rsa-sha2-256"));
        session.accepted = Some("ssh-ed25519".to_string());
        assert!(!algorithm_allowed(&session, "rsa-sha2-256"));
        assert!(algorithm_allowed(&session, "ssh-ed25519"));
    }

    #[test]
    fn fips_list_excludes_ed25519() {
        let mut session = TestSession::default();
        session.fips = true;
        assert!(!algorithm_allowed(&session, "ssh-ed25519"));
        assert!(algorithm_allowed(&session, "ecdsa-sha2-nistp256"));
    }

    #[test]
    fn server_without_hostkeys_rejects() {
        let mut session = TestSession::default();
        session.client = false;
        assert!(!algorithm_allowed(&session, "ssh-ed25519"));
        session.hostkeys = Some("ssh-ed25519".to_string());
        assert!(algorithm_allowed(&session, "ssh-ed25519"));
    }
}
