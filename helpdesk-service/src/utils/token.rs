//! Invitation tokens: random, single-use, stored only as a digest.

use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

pub const INVITATION_TOKEN_LEN: usize = 32;

pub fn generate_invitation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hex SHA-256 of the token, the form persisted and looked up.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
