#![allow(dead_code)]

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng, RngCore};
use sshpki::keys::{FingerprintHash, PublicKey};
use sshpki::Session;

/// Client-side session stub used across the integration tests
pub struct MockSession {
    pub session_id: Vec<u8>,
    pub extensions: u32,
    pub peer_openssh: u32,
    pub client: bool,
    pub accepted: Option<String>,
    pub hostkeys: Option<String>,
    pub fips: bool,
}

impl Default for MockSession {
    fn default() -> Self {
        MockSession {
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

impl Session for MockSession {
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

/// Assert two keys hold the same public material under every fingerprint
/// digest
pub fn fingerprint_assert(key1: &PublicKey, key2: &PublicKey) {
    for hash in [
        FingerprintHash::MD5,
        FingerprintHash::SHA256,
        FingerprintHash::SHA512,
    ] {
        assert_eq!(
            key1.fingerprint(hash).unwrap(),
            key2.fingerprint(hash).unwrap(),
            "{} fingerprints differ",
            hash.name()
        );
    }
}

/// Random alphanumeric passphrase for container round-trips
pub fn gen_random_pass(len: usize) -> String {
    thread_rng().sample_iter(Alphanumeric).take(len).collect()
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    thread_rng().fill_bytes(&mut data);
    data
}

pub fn temp_key_path(name: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("sshpki-it-{}-{}", std::process::id(), name));
    path.to_string_lossy().into_owned()
}
