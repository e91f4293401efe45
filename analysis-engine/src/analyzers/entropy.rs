//! Byte entropy analysis.
//!
//! Entropy is computed per section rather than over the whole file: packers
//! pad their output with nulls, which drags the whole-file figure down and
//! hides the high-entropy region. Callers keep the per-section list and only
//! aggregate it when building the feature record.

/// Upper bound for a byte alphabet: log2(256).
pub const MAX_ENTROPY: f64 = 8.0;

/// Count occurrences of each byte value.
pub fn byte_histogram(data: &[u8]) -> [u64; 256] {
    let mut freq = [0u64; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    freq
}

/// Shannon entropy in bits per byte, in `[0, 8]`.
///
/// An empty buffer has entropy `0.0`.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let freq = byte_histogram(data);
    let len = data.len() as f64;
    let entropy = freq.iter().filter(|&&f| f > 0).fold(0.0, |ent, &f| {
        let p = f as f64 / len;
        ent - p * p.log2()
    });

    // rounding can leave -0.0 or a hair above 8
    entropy.clamp(0.0, MAX_ENTROPY)
}
