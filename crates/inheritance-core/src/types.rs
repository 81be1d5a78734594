use serde::{Deserialize, Serialize};
use std::fmt;

/// Coin amount in a denomination's smallest unit.
pub type Balance = u128;

/// Block time, Unix seconds UTC. Supplied by the host context — never read
/// from the wall clock.
pub type BlockTime = i64;

/// Duration in seconds.
pub type Seconds = i64;

/// Monotonic plan identifier.
pub type PlanId = u64;

/// Percentage expressed in parts-per-million (0..=1_000_000), so that the
/// exact-sum invariant and the floor-division asset math can be
/// checked and computed with pure integer arithmetic.
pub const PPM_SCALE: u64 = 1_000_000;

/// Account address. The host runtime owns the address codec (bech32, etc.);
/// this module only ever holds the already-decoded 32-byte form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, bs58::decode::Error> {
        let bytes = bs58::decode(s).into_vec()?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32]);
        Ok(Self(arr))
    }

    /// Deterministic address from an arbitrary byte string (test/demo use).
    pub fn from_seed(seed: &[u8]) -> Self {
        let hash = blake3_like_hash(seed);
        Self(hash)
    }
}

/// Small non-cryptographic 32-byte expansion used only to mint distinct
/// demo/test addresses from short seeds; never used for anything the
/// protocol treats as a security boundary.
fn blake3_like_hash(seed: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut state: u64 = 0xcbf29ce484222325;
    for (i, b) in seed.iter().enumerate() {
        state ^= *b as u64;
        state = state.wrapping_mul(0x100000001b3);
        out[i % 32] ^= (state & 0xff) as u8;
    }
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_b58()[..8.min(self.to_b58().len())])
    }
}
