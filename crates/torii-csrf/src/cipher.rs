//! Salted token cipher
//!
//! A token is a random salt followed by the secret shifted, character by character, by the salt.
//! Every minted token looks different even though it unsalts to the same secret, which keeps the
//! secret itself out of rendered pages.

use rand::{distributions::Alphanumeric, Rng};
use std::fmt;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SECRET_LENGTH: usize = 32;
pub const TOKEN_LENGTH: usize = 2 * SECRET_LENGTH;

const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[inline]
fn index_of(ch: u8) -> usize {
    match ch {
        b'a'..=b'z' => usize::from(ch - b'a'),
        b'A'..=b'Z' => usize::from(ch - b'A') + 26,
        b'0'..=b'9' => usize::from(ch - b'0') + 52,
        _ => unreachable!("[Bug] character outside of the token alphabet"),
    }
}

#[inline]
fn is_well_formed(candidate: &str, len: usize) -> bool {
    candidate.len() == len && candidate.bytes().all(|ch| ch.is_ascii_alphanumeric())
}

/// Base value a token is derived from. Never leaves the server in clear form
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn generate() -> Self {
        let secret = rand::thread_rng()
            .sample_iter(Alphanumeric)
            .map(char::from)
            .take(SECRET_LENGTH)
            .collect();

        Self(secret)
    }

    #[must_use]
    pub fn parse(candidate: &str) -> Option<Self> {
        is_well_formed(candidate, SECRET_LENGTH).then(|| Self(candidate.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ConstantTimeEq for Secret {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.as_bytes().ct_eq(other.0.as_bytes())
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Salt followed by the ciphered secret
///
/// Always [`TOKEN_LENGTH`] characters long and purely alphanumeric.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Token(String);

impl Token {
    /// Accept the candidate as-is if it has the shape of a token
    #[must_use]
    pub fn parse(candidate: &str) -> Option<Self> {
        is_well_formed(candidate, TOKEN_LENGTH).then(|| Self(candidate.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.0).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode_with_salt(secret: &Secret, salt: &Secret) -> Token {
    let mut token = String::with_capacity(TOKEN_LENGTH);
    token.push_str(salt.as_str());
    token.extend(
        secret
            .as_str()
            .bytes()
            .zip(salt.as_str().bytes())
            .map(|(secret_ch, salt_ch)| {
                let idx = (index_of(secret_ch) + index_of(salt_ch)) % ALPHABET.len();
                char::from(ALPHABET[idx])
            }),
    );

    Token(token)
}

/// Cipher the secret with a fresh random salt
#[must_use]
pub fn encode(secret: &Secret) -> Token {
    encode_with_salt(secret, &Secret::generate())
}

/// Recover the secret from a token
#[must_use]
pub fn decode(token: &Token) -> Secret {
    let (salt, body) = token.as_str().as_bytes().split_at(SECRET_LENGTH);
    let secret = body
        .iter()
        .zip(salt)
        .map(|(&body_ch, &salt_ch)| {
            let idx = (index_of(body_ch) + ALPHABET.len() - index_of(salt_ch)) % ALPHABET.len();
            char::from(ALPHABET[idx])
        })
        .collect();

    Secret(secret)
}

#[must_use]
pub fn new_token() -> Token {
    encode(&Secret::generate())
}

/// Malformed input is replaced with a fresh token instead of failing.
/// A replaced token simply won't match anything later on
#[must_use]
pub fn sanitize(candidate: &str) -> Token {
    Token::parse(candidate).unwrap_or_else(new_token)
}

/// Whether both tokens carry the same secret. Constant-time
#[must_use]
pub fn compare_salted(left: &Token, right: &Token) -> bool {
    decode(left).ct_eq(&decode(right)).into()
}
