//! Quadrature decoding for two-channel rotary encoders.
//!
//! The two encoder lines are sampled into a 2-bit code (`A` is the high bit).
//! The previous and current codes together form a 4-bit transition code.
//! Exactly eight of the sixteen transitions are valid single steps:
//!
//! ```text
//! +1: 1101 0100 0010 1011
//! -1: 1110 0111 0001 1000
//! ```
//!
//! Everything else, including "no change" and both lines flipping at once,
//! decodes to 0.

/// Increment for each 4-bit transition code `(previous << 2) | current`.
const TRANSITIONS: [i8; 16] = [
    0,  // 0000
    -1, // 0001
    1,  // 0010
    0,  // 0011
    1,  // 0100
    0,  // 0101
    0,  // 0110
    -1, // 0111
    -1, // 1000
    0,  // 1001
    0,  // 1010
    1,  // 1011
    0,  // 1100
    1,  // 1101
    -1, // 1110
    0,  // 1111
];

/// Packs the two channel levels into a 2-bit code.
pub fn encode(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | b as u8
}

/// Returns the step (`-1`, `0` or `+1`) for a transition between two 2-bit
/// codes.  Bits above the low two are ignored.
pub fn step(previous: u8, current: u8) -> i64 {
    let code = ((previous & 0b11) << 2) | (current & 0b11);
    i64::from(TRANSITIONS[code as usize])
}
