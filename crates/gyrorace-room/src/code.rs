//! Room code generation.

use gyrorace_protocol::RoomCode;
use rand::Rng;

use crate::{RoomConfig, RoomError};

/// Draws a code of `config.code_length` characters from
/// `config.code_alphabet`, retrying while `taken` reports a collision.
///
/// # Errors
/// Returns [`RoomError::RegistryExhausted`] after
/// `config.max_code_attempts` collisions, or immediately when the
/// alphabet is empty.
pub(crate) fn generate_code<R: Rng>(
    rng: &mut R,
    config: &RoomConfig,
    taken: impl Fn(&RoomCode) -> bool,
) -> Result<RoomCode, RoomError> {
    let alphabet: Vec<char> = config.code_alphabet.chars().collect();
    if alphabet.is_empty() || config.code_length == 0 {
        return Err(RoomError::RegistryExhausted(0));
    }

    for _ in 0..config.max_code_attempts {
        let candidate: String = (0..config.code_length)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())])
            .collect();
        let Some(code) = RoomCode::normalize(&candidate) else {
            continue;
        };
        if !taken(&code) {
            return Ok(code);
        }
    }

    tracing::error!(
        attempts = config.max_code_attempts,
        "room code space exhausted"
    );
    Err(RoomError::RegistryExhausted(config.max_code_attempts))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generated_code_has_configured_shape() {
        let config = RoomConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let code = generate_code(&mut rng, &config, |_| false).unwrap();

        assert_eq!(code.as_str().len(), 6);
        assert!(code
            .as_str()
            .chars()
            .all(|c| config.code_alphabet.contains(c)));
    }

    #[test]
    fn test_generated_codes_skip_taken() {
        let config = RoomConfig {
            code_alphabet: "AB".into(),
            code_length: 1,
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let taken: HashSet<RoomCode> = ["A".parse().unwrap()].into();

        let code =
            generate_code(&mut rng, &config, |c| taken.contains(c)).unwrap();

        assert_eq!(code.as_str(), "B");
    }

    #[test]
    fn test_exhausted_space_is_an_error() {
        let config = RoomConfig {
            code_alphabet: "A".into(),
            code_length: 1,
            max_code_attempts: 5,
            ..RoomConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        let result = generate_code(&mut rng, &config, |_| true);

        assert!(matches!(result, Err(RoomError::RegistryExhausted(5))));
    }

    #[test]
    fn test_empty_alphabet_is_an_error() {
        let config = RoomConfig {
            code_alphabet: String::new(),
            ..RoomConfig::default()
        };
        let result = generate_code(&mut rand::rng(), &config, |_| false);
        assert!(matches!(result, Err(RoomError::RegistryExhausted(0))));
    }
}
