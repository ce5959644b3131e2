//! Seeding for chaos rounds.
//!
//! A chaos run draws one session seed up front. Every round then builds its
//! own ChaCha8 generator from that seed and the round index, so replaying a
//! run with a fixed seed picks the same victims and severs the same edges,
//! and no round's draws depend on how many values an earlier round consumed.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generator for round `round` of the run seeded with `session_seed`.
pub fn round_rng(session_seed: u64, round: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(session_seed.wrapping_add(round))
}

/// The configured seed, or a fresh one from entropy when none is set.
pub fn session_seed(configured: Option<u64>) -> u64 {
    configured.unwrap_or_else(rand::random)
}
