use rand::{distributions::Uniform, rngs::OsRng, Rng};

pub const ID_LENGTH: usize = 30;

const ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque identifier carried by the session cookie
#[aliri_braid::braid]
pub struct SessionId;

impl SessionId {
    /// Random identifier drawn from the operating system's CSPRNG
    #[must_use]
    pub fn generate() -> Self {
        let id = OsRng
            .sample_iter(Uniform::from(0..ALPHABET.len()))
            .take(ID_LENGTH)
            .map(|idx| char::from(ALPHABET[idx]))
            .collect();

        Self::new(id)
    }

    /// Accept a cookie value only if it could have been generated by us
    #[must_use]
    pub fn parse(candidate: &str) -> Option<Self> {
        let is_well_formed = candidate.len() == ID_LENGTH
            && candidate
                .bytes()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit());

        is_well_formed.then(|| Self::new(candidate.to_owned()))
    }
}
