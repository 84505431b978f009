//! Pickup order codes.
//!
//! A code is a short digit string shown to the customer and typed in at
//! pickup. It must be unique among all open orders, across producers, so a
//! customer lookup without producer scoping resolves to one order. Codes on
//! completed or cancelled orders may be reused.

use std::collections::HashSet;

use rand::Rng;

use super::models::OrderStatus;

/// Shortest code accepted at lookup
pub const MIN_CODE_LEN: usize = 6;
/// Longest code accepted at lookup
pub const MAX_CODE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderCodeError {
    #[error("Invalid order code policy: {0}")]
    InvalidPolicy(String),

    #[error("No free order code after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Code length and collision policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePolicy {
    length: usize,
    fallback_length: usize,
    attempts: u32,
}

impl CodePolicy {
    pub fn new(length: usize, fallback_length: usize, attempts: u32) -> Result<Self, OrderCodeError> {
        let valid = MIN_CODE_LEN..=MAX_CODE_LEN;
        if !valid.contains(&length) || !valid.contains(&fallback_length) {
            return Err(OrderCodeError::InvalidPolicy(format!(
                "lengths must be within {}..={}",
                MIN_CODE_LEN, MAX_CODE_LEN
            )));
        }
        if fallback_length < length {
            return Err(OrderCodeError::InvalidPolicy(
                "fallback length must not be shorter than the base length".to_string(),
            ));
        }
        if attempts == 0 {
            return Err(OrderCodeError::InvalidPolicy("attempts must be positive".to_string()));
        }
        Ok(Self {
            length,
            fallback_length,
            attempts,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn fallback_length(&self) -> usize {
        self.fallback_length
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for CodePolicy {
    fn default() -> Self {
        Self {
            length: 6,
            fallback_length: 8,
            attempts: 5,
        }
    }
}

/// Uniform random code of `length` digits without a leading zero
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    let length = length.clamp(MIN_CODE_LEN, MAX_CODE_LEN) as u32;
    let low = 10u64.pow(length - 1);
    let high = 10u64.pow(length);
    rng.gen_range(low..high).to_string()
}

/// Codes that block reuse: those on orders not yet completed or cancelled
pub fn open_codes<I>(orders: I) -> HashSet<String>
where
    I: IntoIterator<Item = (String, OrderStatus)>,
{
    orders
        .into_iter()
        .filter(|(_, status)| !status.is_terminal())
        .map(|(code, _)| code)
        .collect()
}

/// Pick a random code for which `is_taken` is false
pub fn allocate_code<R, F>(
    rng: &mut R,
    policy: &CodePolicy,
    is_taken: F,
) -> Result<String, OrderCodeError>
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    allocate_code_with(|length| generate_code(rng, length), policy, is_taken)
}

/// Pick a code from `generate` for which `is_taken` is false.
///
/// Tries `attempts` codes at the base length, then as many at the fallback
/// length, before giving up.
pub fn allocate_code_with<G, F>(
    mut generate: G,
    policy: &CodePolicy,
    is_taken: F,
) -> Result<String, OrderCodeError>
where
    G: FnMut(usize) -> String,
    F: Fn(&str) -> bool,
{
    for length in [policy.length, policy.fallback_length] {
        for _ in 0..policy.attempts {
            let code = generate(length);
            if !is_taken(&code) {
                return Ok(code);
            }
        }
        tracing::warn!("Order code collisions at length {}", length);
    }

    Err(OrderCodeError::Exhausted {
        attempts: policy.attempts * 2,
    })
}

/// Normalize user input for an exact-match lookup.
///
/// Surrounding whitespace is ignored; anything other than 6-8 digits cannot be a
/// code and yields `None`.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    let valid = (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
        && code.bytes().all(|b| b.is_ascii_digit());
    valid.then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for length in MIN_CODE_LEN..=MAX_CODE_LEN {
            for _ in 0..100 {
                let code = generate_code(&mut rng, length);
                assert_eq!(code.len(), length);
                assert!(code.bytes().all(|b| b.is_ascii_digit()));
                assert_ne!(code.as_bytes()[0], b'0');
            }
        }
    }

    #[test]
    fn test_allocate_avoids_taken_codes() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut taken: HashSet<String> = HashSet::new();
        for _ in 0..200 {
            let code =
                allocate_code(&mut rng, &CodePolicy::default(), |c| taken.contains(c)).unwrap();
            assert!(taken.insert(code));
        }
    }

    #[test]
    fn test_allocate_falls_back_to_longer_code() {
        // Every 6-digit code is taken
        let mut rng = StdRng::seed_from_u64(1);
        let code = allocate_code(&mut rng, &CodePolicy::default(), |c| c.len() == 6).unwrap();
        assert_eq!(code.len(), 8);
    }

    #[test]
    fn test_allocate_exhausted() {
        let policy = CodePolicy::new(6, 6, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            allocate_code(&mut rng, &policy, |_| true),
            Err(OrderCodeError::Exhausted { attempts: 6 })
        );
    }

    fn rows(rows: &[(&str, OrderStatus)]) -> Vec<(String, OrderStatus)> {
        rows.iter().map(|(c, s)| (c.to_string(), *s)).collect()
    }

    #[test]
    fn test_cancelled_order_code_is_reissued() {
        let open = open_codes(rows(&[
            ("482913", OrderStatus::Cancelled),
            ("100200", OrderStatus::Completed),
            ("555111", OrderStatus::Ready),
        ]));
        assert!(!open.contains("100200"));
        assert!(open.contains("555111"));

        let is_taken = |c: &str| open.contains(c);
        assert!(!is_taken("482913"));

        let code = allocate_code_with(|_| "482913".to_string(), &CodePolicy::default(), is_taken)
            .unwrap();
        assert_eq!(code, "482913");
    }

    #[test]
    fn test_open_code_is_skipped() {
        let open = open_codes(rows(&[
            ("482913", OrderStatus::Pending),
            ("482913", OrderStatus::Cancelled),
        ]));

        let mut candidates = ["482913", "731004"].into_iter();
        let code = allocate_code_with(
            |_| candidates.next().unwrap_or("999999").to_string(),
            &CodePolicy::default(),
            |c| open.contains(c),
        )
        .unwrap();
        assert_eq!(code, "731004");
    }

    #[test]
    fn test_policy_validation() {
        assert!(CodePolicy::new(6, 8, 5).is_ok());
        assert!(CodePolicy::new(5, 8, 5).is_err());
        assert!(CodePolicy::new(6, 9, 5).is_err());
        assert!(CodePolicy::new(8, 6, 5).is_err());
        assert!(CodePolicy::new(6, 8, 0).is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  482913 \n"), Some("482913".to_string()));
        assert_eq!(normalize_code("12345678"), Some("12345678".to_string()));
        assert_eq!(normalize_code("12345"), None);
        assert_eq!(normalize_code("123456789"), None);
        assert_eq!(normalize_code("48a913"), None);
        assert_eq!(normalize_code("482 913"), None);
    }
}
