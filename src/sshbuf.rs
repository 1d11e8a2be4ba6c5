use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
pub use openssl::bn::{BigNum, BigNumRef};
use std::io;
use std::io::Read;
use std::str;
use zeroize::Zeroizing;

// Largest integer the codec will materialize; sized for the biggest RSA
// modulus this crate generates.
const MAX_BIGNUM_BYTES: usize = 16384 / 8;

// Upper bound on the capacity reserved before any byte of a string has
// actually arrived.
const STRING_PREALLOC: usize = 4096;

fn data_error(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// [io::Read](https://doc.rust-lang.org/std/io/trait.Read.html) extension to
/// read the ssh data representations defined in
/// [RFC 4251 §5](https://tools.ietf.org/html/rfc4251#section-5)
pub trait SshReadExt {
    /// Read a single byte
    fn read_uint8(&mut self) -> io::Result<u8>;

    /// Read a 32 bits unsigned integer in big endian
    fn read_uint32(&mut self) -> io::Result<u32>;

    /// Read a byte string
    ///
    /// The binary string is preceded by a 32 bits unsigned integer holding
    /// its length, and is **NOT** null-terminated.
    fn read_string(&mut self) -> io::Result<Vec<u8>>;

    /// Read a byte string and require it to be valid UTF-8
    fn read_utf8(&mut self) -> io::Result<String>;

    /// Read a multiple precision integer
    ///
    /// Negative numbers and integers longer than 16384 bits are rejected.
    fn read_mpint(&mut self) -> io::Result<BigNum>;
}

impl<R: io::Read> SshReadExt for R {
    fn read_uint8(&mut self) -> io::Result<u8> {
        self.read_u8()
    }
    fn read_uint32(&mut self) -> io::Result<u32> {
        self.read_u32::<BigEndian>()
    }
    fn read_string(&mut self) -> io::Result<Vec<u8>> {
        // The length prefix is untrusted input; cap it with take() so a
        // lying prefix cannot force a huge upfront allocation.
        let len = u64::from(self.read_uint32()?);
        let mut buf = Vec::with_capacity(len.min(STRING_PREALLOC as u64) as usize);
        let got = self.by_ref().take(len).read_to_end(&mut buf)?;
        if (got as u64) < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "ssh string ends early",
            ));
        }
        Ok(buf)
    }
    fn read_utf8(&mut self) -> io::Result<String> {
        String::from_utf8(self.read_string()?)
            .map_err(|_| data_error("ssh string is not valid UTF-8"))
    }
    fn read_mpint(&mut self) -> io::Result<BigNum> {
        bignum_from_mpint(&self.read_string()?)
    }
}

/// Variant of [SshReadExt](trait.SshReadExt.html) which doesn't leave copies
/// of the data in memory
///
/// Used wherever the bytes being read belong to the private section of a key
/// container.
pub trait ZeroizeReadExt {
    fn read_uint32_zeroize(&mut self) -> io::Result<Zeroizing<u32>>;
    fn read_string_zeroize(&mut self) -> io::Result<Zeroizing<Vec<u8>>>;
    fn read_utf8_zeroize(&mut self) -> io::Result<Zeroizing<String>>;
    fn read_mpint_zeroize(&mut self) -> io::Result<BigNum>;
}

impl<R: io::Read> ZeroizeReadExt for R {
    fn read_uint32_zeroize(&mut self) -> io::Result<Zeroizing<u32>> {
        let mut word = Zeroizing::new([0u8; 4]);
        self.read_exact(&mut *word)?;
        Ok(Zeroizing::new(u32::from_be_bytes(*word)))
    }
    fn read_string_zeroize(&mut self) -> io::Result<Zeroizing<Vec<u8>>> {
        // Unlike read_string(), allocate the exact size in one go: growing
        // the buffer would leave unscrubbed copies behind. The length
        // prefix itself is public framing.
        let len = self.read_uint32()? as usize;
        let mut buf = Zeroizing::new(vec![0u8; len]);
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
    fn read_utf8_zeroize(&mut self) -> io::Result<Zeroizing<String>> {
        let data = self.read_string_zeroize()?;
        // Validate in place; the raw bytes stay zeroized either way
        match str::from_utf8(&data) {
            Ok(s) => Ok(Zeroizing::new(s.to_owned())),
            Err(_) => Err(data_error("ssh string is not valid UTF-8")),
        }
    }
    fn read_mpint_zeroize(&mut self) -> io::Result<BigNum> {
        bignum_from_mpint(&self.read_string_zeroize()?)
    }
}

// BigNum clears its buffer on drop, so only the transit copies above need
// explicit zeroizing.
fn bignum_from_mpint(data: &[u8]) -> io::Result<BigNum> {
    if data.first().map_or(false, |b| b & 0x80 != 0) {
        return Err(data_error("negative mpint"));
    }
    let body_at = data.iter().position(|&b| b != 0).unwrap_or(data.len());
    let body = &data[body_at..];
    if body.len() > MAX_BIGNUM_BYTES {
        return Err(data_error("mpint too long"));
    }
    BigNum::from_slice(body).map_err(|_| data_error("malformed mpint"))
}

/// [io::Write](https://doc.rust-lang.org/std/io/trait.Write.html) extension to
/// write the ssh data representations
pub trait SshWriteExt {
    /// Write a single byte
    fn write_uint8(&mut self, value: u8) -> io::Result<()>;

    /// Write a 32 bits unsigned integer in big endian
    fn write_uint32(&mut self, value: u32) -> io::Result<()>;

    /// Write binary string data
    ///
    /// A 32 bits unsigned integer holding the length is emitted first; the
    /// string is **NOT** null-terminated.
    fn write_string(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Write a UTF-8 string
    fn write_utf8(&mut self, value: &str) -> io::Result<()>;

    /// Write a multiple precision integer
    fn write_mpint(&mut self, value: &BigNumRef) -> io::Result<()>;
}

impl<W: io::Write> SshWriteExt for W {
    fn write_uint8(&mut self, value: u8) -> io::Result<()> {
        self.write_u8(value)
    }
    fn write_uint32(&mut self, value: u32) -> io::Result<()> {
        self.write_u32::<BigEndian>(value)
    }
    fn write_string(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_uint32(buf.len() as u32)?;
        self.write_all(buf)
    }
    fn write_utf8(&mut self, value: &str) -> io::Result<()> {
        self.write_string(value.as_bytes())
    }
    fn write_mpint(&mut self, value: &BigNumRef) -> io::Result<()> {
        // BigNum::to_vec emits no leading zeros, so the only fixup needed
        // is a pad byte when the sign bit would read as negative.
        let bytes = value.to_vec();
        let pad = bytes.first().map_or(false, |b| b & 0x80 != 0);
        self.write_uint32((bytes.len() + pad as usize) as u32)?;
        if pad {
            self.write_uint8(0)?;
        }
        self.write_all(&bytes)
    }
}
