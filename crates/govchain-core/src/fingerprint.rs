//! Opaque identifiers for blocks and ballots.
//!
//! The default source draws random hex: a fingerprint is unique-ish but says
//! nothing about the content it is attached to. `DigestFingerprints` is the
//! content-addressed alternative (SHA-256 over the canonical JSON of the
//! fingerprinted fields).

use crate::ledger::Transaction;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex characters after the `0x` prefix.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Fields a fingerprint is computed over.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FingerprintInput<'a> {
    Block {
        index: u64,
        timestamp: DateTime<Utc>,
        previous_fingerprint: &'a str,
        transactions: &'a [Transaction],
    },
    Vote {
        voter_id: &'a str,
        ranked_choices: &'a [String],
        timestamp: DateTime<Utc>,
    },
}

pub trait FingerprintSource {
    fn fingerprint(&mut self, input: &FingerprintInput<'_>) -> String;
}

/// `0x` followed by `len` random lowercase hex digits.
pub fn random_hex<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(len + 2);
    out.push_str("0x");
    for _ in 0..len {
        out.push(DIGITS[rng.gen_range(0..16)] as char);
    }
    out
}

/// Abbreviated form for logs and explorer views: `0x12345678...9abcdef0`.
pub fn short_fingerprint(fingerprint: &str) -> String {
    let len = fingerprint.chars().count();
    if len <= 18 {
        return fingerprint.to_string();
    }
    let head: String = fingerprint.chars().take(10).collect();
    let tail: String = fingerprint.chars().skip(len - 8).collect();
    format!("{head}...{tail}")
}

/// Content-independent random fingerprints.
pub struct RandomFingerprints {
    rng: StdRng,
}

impl RandomFingerprints {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and replayable simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FingerprintSource for RandomFingerprints {
    fn fingerprint(&mut self, _input: &FingerprintInput<'_>) -> String {
        random_hex(&mut self.rng, FINGERPRINT_HEX_LEN)
    }
}

/// SHA-256 over the serde_json encoding of the input.
#[derive(Default)]
pub struct DigestFingerprints;

impl FingerprintSource for DigestFingerprints {
    fn fingerprint(&mut self, input: &FingerprintInput<'_>) -> String {
        // Every fingerprinted type has string map keys, so encoding cannot fail.
        let canonical = serde_json::to_vec(input).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        format!("0x{}", hex::encode(digest))
    }
}
