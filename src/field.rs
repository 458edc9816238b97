//! Big-endian fixed-width integer access at byte offsets.
//!
//! Callers validate the remaining length first; an out-of-range offset panics
//! through slice indexing.

#[inline]
pub fn get_u8(buf: &[u8], off: usize) -> u8 {
    buf[off]
}

#[inline]
pub fn get_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([buf[off], buf[off + 1]])
}

#[inline]
pub fn get_u24(buf: &[u8], off: usize) -> u32 {
    ((buf[off] as u32) << 16) | ((buf[off + 1] as u32) << 8) | buf[off + 2] as u32
}

#[inline]
pub fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
pub fn put_u8(buf: &mut [u8], off: usize, v: u8) {
    buf[off] = v;
}

#[inline]
pub fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_be_bytes());
}

/// Writes the low 24 bits of `v`.
#[inline]
pub fn put_u24(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 3].copy_from_slice(&v.to_be_bytes()[1..]);
}

#[inline]
pub fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_be_bytes());
}
