//! Status-line extraction straight from the socket bytes.
//!
//! Only the first bytes of the response are read. The status code sits at a
//! fixed offset: `HTTP/x.y SSS`.

use tokio::io::{AsyncRead, AsyncReadExt};

const STATUS_OFFSET: usize = 9;
const STATUS_DIGITS: usize = 3;

/// Bytes needed before the status code can be parsed.
pub const STATUS_LINE_END: usize = STATUS_OFFSET + STATUS_DIGITS;

/// Read at most `len` bytes, tolerating short reads.
///
/// Returns as soon as the status code bytes are in, so a peer that keeps the
/// connection open after a short reply does not stall the read. Stops early
/// on EOF.
pub async fn read_status_prefix<R>(reader: &mut R, len: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; len];
    let enough = len.min(STATUS_LINE_END);
    let mut filled = 0;
    while filled < enough {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// Three-digit status code, or `None` when the bytes at the offset are missing or not digits.
pub fn parse_status_code(prefix: &[u8]) -> Option<u16> {
    let digits = prefix.get(STATUS_OFFSET..STATUS_OFFSET + STATUS_DIGITS)?;
    digits.iter().try_fold(0u16, |acc, byte| {
        byte.is_ascii_digit()
            .then(|| acc * 10 + u16::from(byte - b'0'))
    })
}
