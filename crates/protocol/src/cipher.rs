//! Reversible packet obfuscation
//!
//! Outbound: flip high bits, interleave, then reverse every run of bytes
//! divisible by the session multiplier. Inbound undoes the steps in the
//! opposite order. A multiplier of 0 disables the transform.

/// Smallest multiplier handed out at handshake
pub const MIN_MULTIPLE: u8 = 6;
/// Largest multiplier handed out at handshake
pub const MAX_MULTIPLE: u8 = 12;

/// Apply the outbound transform in place.
pub fn encrypt(data: &mut [u8], multiple: u8) {
    if multiple == 0 {
        return;
    }
    flip_msb(data);
    interleave(data);
    swap_multiples(data, multiple);
}

/// Undo [`encrypt`] in place.
pub fn decrypt(data: &mut [u8], multiple: u8) {
    if multiple == 0 {
        return;
    }
    swap_multiples(data, multiple);
    deinterleave(data);
    flip_msb(data);
}

/// Toggle the top bit of every byte whose low seven bits are not all zero.
fn flip_msb(data: &mut [u8]) {
    for byte in data.iter_mut().filter(|b| **b & 0x7F != 0) {
        *byte ^= 0x80;
    }
}

/// Reorder as first, last, second, second-to-last, ...
fn interleave(data: &mut [u8]) {
    let source = data.to_vec();
    let len = source.len();
    let (mut front, mut back) = (0usize, len);
    for (i, slot) in data.iter_mut().enumerate() {
        if i % 2 == 0 {
            *slot = source[front];
            front += 1;
        } else {
            back -= 1;
            *slot = source[back];
        }
    }
}

fn deinterleave(data: &mut [u8]) {
    let source = data.to_vec();
    let len = source.len();
    let (mut front, mut back) = (0usize, len);
    for (i, &byte) in source.iter().enumerate() {
        if i % 2 == 0 {
            data[front] = byte;
            front += 1;
        } else {
            back -= 1;
            data[back] = byte;
        }
    }
}

/// Reverse each maximal run of two or more bytes divisible by `multiple`.
/// Applying it twice restores the input.
fn swap_multiples(data: &mut [u8], multiple: u8) {
    let mut start = 0;
    while start < data.len() {
        if data[start] % multiple != 0 {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < data.len() && data[end] % multiple == 0 {
            end += 1;
        }
        data[start..end].reverse();
        start = end;
    }
}
