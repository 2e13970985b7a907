use govchain_core::fingerprint::random_hex;
use rand::Rng;
use uuid::Builder;

pub const VOTER_KEY_HEX_LEN: usize = 40;
pub const SIGNATURE_HEX_LEN: usize = 128;

/// Placeholder credentials for a synthesized ballot. Nothing verifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockVoter {
    pub voter_id: String,
    pub public_key: String,
    pub signature: String,
}

impl MockVoter {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, index: usize) -> Self {
        let nonce = Builder::from_random_bytes(rng.gen()).into_uuid();
        Self {
            voter_id: format!("voter_{index}_{}", nonce.simple()),
            public_key: random_hex(rng, VOTER_KEY_HEX_LEN),
            signature: random_hex(rng, SIGNATURE_HEX_LEN),
        }
    }
}
