//! One-time code generation.
//!
//! Codes gate an unlock path, so the default generator draws from the
//! operating system's cryptographic RNG ([`OsRng`]). Each of the six
//! characters is sampled independently and uniformly from `0-9` with
//! `gen_range`, which rejects out-of-range samples instead of reducing them
//! modulo ten, so no digit is favored.
//!
//! # Example
//!
//! ```
//! use safebridge_protocol::OneTimeCodeGenerator;
//!
//! let mut generator = OneTimeCodeGenerator::new();
//! let code = generator.generate();
//! assert_eq!(code.as_str().len(), 6);
//! assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
//! ```

use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use safebridge_core::OneTimeCode;
use safebridge_core::constants::OTP_ALPHABET;

/// Anything that can hand out one-time codes.
///
/// The event dispatcher is generic over this trait so tests can supply
/// predetermined codes.
pub trait CodeSource {
    fn next_code(&mut self) -> OneTimeCode;
}

/// Uniform six-digit code generator.
#[derive(Debug, Clone)]
pub struct OneTimeCodeGenerator<R = OsRng> {
    rng: R,
}

impl OneTimeCodeGenerator<OsRng> {
    /// Generator backed by the operating system's CSPRNG.
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for OneTimeCodeGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> OneTimeCodeGenerator<R> {
    /// Generator backed by a caller-supplied RNG (seeded RNGs in tests).
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> OneTimeCode {
        OneTimeCode::from_draws(|| self.rng.gen_range(0..OTP_ALPHABET.len()))
    }
}

impl<R: RngCore> CodeSource for OneTimeCodeGenerator<R> {
    fn next_code(&mut self) -> OneTimeCode {
        self.generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use safebridge_core::constants::OTP_LENGTH;

    #[test]
    fn test_codes_are_six_digits() {
        let mut generator = OneTimeCodeGenerator::new();
        for _ in 0..1_000 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), OTP_LENGTH);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let mut a = OneTimeCodeGenerator::with_rng(StdRng::seed_from_u64(7));
        let mut b = OneTimeCodeGenerator::with_rng(StdRng::seed_from_u64(7));
        for _ in 0..10 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_code_source_impl() {
        let mut source: Box<dyn CodeSource> = Box::new(OneTimeCodeGenerator::new());
        assert_eq!(source.next_code().as_str().len(), OTP_LENGTH);
    }
}
