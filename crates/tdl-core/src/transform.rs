//! ASCII upper-case fold applied to every written byte.
//!
//! Only `b'a'..=b'z'` change; every other byte, including non-ASCII and
//! control bytes, passes through untouched.

/// Fold one byte to upper case.
#[inline]
pub const fn fold_upper(byte: u8) -> u8 {
    if byte >= b'a' && byte <= b'z' {
        byte - (b'a' - b'A')
    } else {
        byte
    }
}

/// Fold `src` into the front of `dst`.
///
/// Copies `min(dst.len(), src.len())` bytes and returns that count.
pub fn fold_into(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    for (out, byte) in dst[..n].iter_mut().zip(src) {
        *out = fold_upper(*byte);
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_letters_fold() {
        for c in b'a'..=b'z' {
            assert_eq!(fold_upper(c), c.to_ascii_uppercase());
        }
    }

    #[test]
    fn test_other_bytes_pass_through() {
        for b in 0u8..=255 {
            if !b.is_ascii_lowercase() {
                assert_eq!(fold_upper(b), b, "byte 0x{:02x} changed", b);
            }
        }
    }

    #[test]
    fn test_fold_into_mixed_text() {
        let mut out = [0u8; 12];
        let n = fold_into(&mut out, b"Hi there 123");
        assert_eq!(n, 12);
        assert_eq!(&out, b"HI THERE 123");
    }

    #[test]
    fn test_fold_into_short_destination() {
        let mut out = [0u8; 2];
        assert_eq!(fold_into(&mut out, b"abc"), 2);
        assert_eq!(&out, b"AB");
    }
}
