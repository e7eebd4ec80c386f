// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., C_K7NP3X for clients)
//!
//! Benefits:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - ~1 billion combinations per entity type (32^6)
//! - Easy to read, type, and communicate verbally

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Client (C_)
    Client,
    /// Linked provider account (A_)
    Account,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Client => "C",
            EntityPrefix::Account => "A",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Arguments
/// * `prefix` - The entity type prefix
///
/// # Returns
/// A string in format "PREFIX_XXXXXX" (e.g., "C_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a Client ID (C_XXXXXX)
pub fn generate_client_id() -> String {
    generate_id(EntityPrefix::Client)
}

/// Generate a LinkedAccount ID (A_XXXXXX)
pub fn generate_account_id() -> String {
    generate_id(EntityPrefix::Account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let client_id = generate_client_id();
        assert!(client_id.starts_with("C_"));
        assert_eq!(client_id.len(), 8); // "C_" + 6 chars

        let account_id = generate_account_id();
        assert!(account_id.starts_with("A_"));
        assert_eq!(account_id.len(), 8);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_client_id();
        let random_part = &id[2..]; // Skip "C_"

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        // Verify no ambiguous characters
        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_client_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }
}
