//! Little-endian number decoding for the binary workbook containers.
//! Callers slice exact-width records first; a short slice decodes as zero-padded.

/// Copies the leading `N` bytes of a slice, zero-padding when it is shorter.
#[inline]
fn leading<const N: usize>(s: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    let size = s.len().min(N);
    bytes[..size].copy_from_slice(&s[..size]);
    bytes
}

/// Iterates over the little-endian `u32` words of a byte slice as `usize` values.
/// A trailing partial word is ignored.
pub(crate) fn to_usize_iter(bytes: &[u8]) -> impl ExactSizeIterator<Item = usize> + '_ {
    bytes.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(leading(chunk)) as usize)
}

#[inline]
pub(crate) fn to_f64(s: &[u8]) -> f64 {
    f64::from_le_bytes(leading(s))
}

#[inline]
pub(crate) fn to_u64(s: &[u8]) -> u64 {
    u64::from_le_bytes(leading(s))
}

#[inline]
pub(crate) fn to_u32(s: &[u8]) -> u32 {
    u32::from_le_bytes(leading(s))
}

#[inline]
pub(crate) fn to_u16(s: &[u8]) -> u16 {
    u16::from_le_bytes(leading(s))
}

#[inline]
pub(crate) fn to_usize(s: &[u8]) -> usize {
    to_u32(s) as usize
}
