use std::fmt::{Display, Formatter, Result as FmtResult};
use thiserror::Error as ThisError;

pub type PkiResult<T> = Result<T, Error>;

/// The error type of this crate
///
/// Carries an [`ErrorKind`](enum.ErrorKind.html) and, when the failure
/// originated in a lower layer, the underlying error as source.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error { kind, inner: None }
    }

    pub(crate) fn with_source<E>(kind: ErrorKind, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error {
            kind,
            inner: Some(Box::new(source)),
        }
    }

    /// Indicate the category of the error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.kind)?;
        if let Some(cause) = &self.inner {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;
        match err.kind() {
            IoKind::NotFound | IoKind::PermissionDenied => {
                Self::with_source(ErrorKind::NotFound, err)
            }
            _ => Self::with_source(ErrorKind::IOError, err),
        }
    }
}
impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Self::with_source(ErrorKind::OpenSslError, err)
    }
}
impl From<ed25519_dalek::SignatureError> for Error {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        Self::with_source(ErrorKind::Ed25519Error, err)
    }
}
impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::with_source(ErrorKind::Base64Error, err)
    }
}
impl From<pem::PemError> for Error {
    fn from(err: pem::PemError) -> Self {
        Self::with_source(ErrorKind::InvalidKeyFormat, err)
    }
}
impl From<bcrypt_pbkdf::Error> for Error {
    fn from(err: bcrypt_pbkdf::Error) -> Self {
        Self::with_source(ErrorKind::KdfError, err)
    }
}
#[cfg(feature = "post-quantum")]
impl From<oqs::Error> for Error {
    fn from(err: oqs::Error) -> Self {
        Self::with_source(ErrorKind::OqsError, err)
    }
}

/// The categories of errors returned by this crate
///
/// Decryption failures are deliberately folded into
/// [`IncorrectPassphrase`](#variant.IncorrectPassphrase) so that callers never
/// see low-level cipher diagnostics.
#[derive(ThisError, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    #[error("OpenSSL error")]
    OpenSslError,
    #[error("Ed25519 error")]
    Ed25519Error,
    #[error("post-quantum provider error")]
    OqsError,
    #[error("key derivation error")]
    KdfError,
    #[error("I/O error")]
    IOError,
    #[error("file not found or not accessible")]
    NotFound,
    #[error("base64 decode error")]
    Base64Error,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid key format")]
    InvalidKeyFormat,
    #[error("invalid key size")]
    InvalidKeySize,
    #[error("key file exceeds the size limit")]
    TooLarge,
    #[error("unsupported key type")]
    UnsupportedType,
    #[error("unsupported cipher")]
    UnsupportedCipher,
    #[error("unsupported elliptic curve")]
    UnsupportedCurve,
    #[error("incorrect passphrase")]
    IncorrectPassphrase,
    #[error("digest algorithm is not compatible with the key type")]
    IncompatibleHash,
    #[error("signature algorithm does not match the key algorithm")]
    AlgorithmMismatch,
    #[error("signature verification failed")]
    VerifyFailed,
    #[error("key carries no exportable private material")]
    NotExportable,
    #[error("no PKCS#11 backend available")]
    Pkcs11Unavailable,
}
