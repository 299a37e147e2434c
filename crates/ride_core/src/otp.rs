//! Pickup codes handed to the rider and checked by the captain at the curb.

use rand::Rng;

/// Draw a 4-digit code in `1000..=9999`.
pub fn generate_otp<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(1000..=9999u16).to_string()
}

/// Exact comparison without early exit on the first differing byte.
pub fn otp_matches(expected: &str, attempt: &str) -> bool {
    if expected.len() != attempt.len() {
        return false;
    }
    expected
        .bytes()
        .zip(attempt.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn codes_are_four_ascii_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let code = generate_otp(&mut rng);
            assert_eq!(code.len(), 4);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_is_exact() {
        assert!(otp_matches("0427", "0427"));
        assert!(!otp_matches("0427", "427"));
        assert!(!otp_matches("0427", " 0427"));
        assert!(!otp_matches("0427", "0428"));
    }
}
