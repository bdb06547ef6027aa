//! National tax identifier validation (CPF / CNPJ)
//!
//! Pure checksum routines for the two-part national identifiers carried by
//! customers: the 11-digit person identifier (CPF) and the 14-digit
//! organization identifier (CNPJ). Both end in two check digits computed as
//! weighted sums over successive prefixes, with weights descending from one
//! more than the prefix length and the modulo-11 remainder mapped to zero
//! when it is 0 or 1.
//!
//! These functions only answer yes/no; callers raise the typed
//! `InvalidTaxId` error when validation fails.

/// Digit count of a person identifier (CPF)
pub const CPF_LEN: usize = 11;

/// Digit count of an organization identifier (CNPJ)
pub const CNPJ_LEN: usize = 14;

/// Strips everything but ASCII digits from a raw identifier
///
/// `"529.982.247-25"` normalizes to `"52998224725"`.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Computes one check digit over a digit prefix
///
/// Weights run from `prefix.len() + 1` down to 2. A remainder of 0 or 1
/// maps to digit 0, anything else to `11 - remainder`.
fn check_digit(prefix: &[u8]) -> u8 {
    let sum: u32 = prefix
        .iter()
        .zip((2..=prefix.len() as u32 + 1).rev())
        .map(|(&d, w)| u32::from(d) * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => (11 - r) as u8,
    }
}

fn digits_of(normalized: &str) -> Option<Vec<u8>> {
    normalized
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// Validates an already-normalized identifier of the expected length
fn is_valid(normalized: &str, expected_len: usize) -> bool {
    if normalized.len() != expected_len {
        return false;
    }
    let Some(digits) = digits_of(normalized) else {
        return false;
    };
    // Sequences of one repeated digit satisfy the checksum but are not
    // assignable identifiers.
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }
    let first = check_digit(&digits[..expected_len - 2]);
    let second = check_digit(&digits[..expected_len - 1]);
    first == digits[expected_len - 2] && second == digits[expected_len - 1]
}

/// Checks whether `raw` is a checksum-valid person identifier (CPF)
///
/// Accepts punctuated or bare input; blank input is invalid.
pub fn is_valid_cpf(raw: &str) -> bool {
    if raw.trim().is_empty() {
        return false;
    }
    is_valid(&normalize(raw), CPF_LEN)
}

/// Checks whether `raw` is a checksum-valid organization identifier (CNPJ)
pub fn is_valid_cnpj(raw: &str) -> bool {
    if raw.trim().is_empty() {
        return false;
    }
    is_valid(&normalize(raw), CNPJ_LEN)
}

/// Formats 11 normalized digits as `###.###.###-##`
///
/// Input that is not exactly 11 digits is returned unchanged.
pub fn format_cpf(digits: &str) -> String {
    if digits.len() != CPF_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Formats 14 normalized digits as `##.###.###/####-##`
///
/// Input that is not exactly 14 digits is returned unchanged.
pub fn format_cnpj(digits: &str) -> String {
    if digits.len() != CNPJ_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.to_string();
    }
    format!(
        "{}.{}.{}/{}-{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..14]
    )
}
