use crate::error::PkiResult;
use crate::keys::{KeyPair, PublicKey};

const PKCS11_URI_SCHEME: &str = "pkcs11:";

/// Detect whether a key path is a PKCS#11 URI
pub fn is_uri(path: &str) -> bool {
    path.starts_with(PKCS11_URI_SCHEME)
}

/// Derive a public PKCS#11 URI from a private one by replacing
/// `type=private` with `type=public`
pub fn export_pub_uri_from_priv_uri(priv_uri: &str) -> String {
    priv_uri.replace("type=private", "type=public")
}

/// Backend resolving `pkcs11:` URIs to keys
///
/// Key pairs materialized by a backend keep their URI attached and are
/// refused by the private-key exporters, since the private material never
/// leaves the token.
pub trait Pkcs11Backend {
    fn import_pubkey(&self, uri: &str) -> PkiResult<PublicKey>;
    fn import_keypair(&self, uri: &str) -> PkiResult<KeyPair>;
}
