// ABOUTME: Wrapper for the privileged service key
// ABOUTME: Wiped from memory on drop, redacted in Debug, compared without early exit

use std::fmt;

use zeroize::Zeroizing;

/// Privileged key; wiped from memory on drop and never printed
#[derive(Clone)]
pub struct ServiceKey(Zeroizing<String>);

impl ServiceKey {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    /// Whether `candidate` is this key. Runtime depends only on the lengths.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        if expected.len() != candidate.len() {
            return false;
        }
        expected
            .iter()
            .zip(candidate)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceKey([REDACTED])")
    }
}
