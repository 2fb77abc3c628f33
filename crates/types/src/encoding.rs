//! Publisher id derivation
//!
//! The publisher id is the 13 character suffix of every full and family
//! name. It is the first 8 bytes of the SHA-256 digest of the UTF-16LE
//! encoded publisher string, rendered with Crockford's base32 alphabet in
//! lower case and without padding.

use sha2::{Digest, Sha256};

const BASE32_DIGITS: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";
const PUBLISHER_ID_LEN: usize = 13;

/// Compute the publisher id for a manifest publisher string.
#[must_use]
pub fn publisher_id(publisher: &str) -> String {
    let mut hasher = Sha256::new();
    for unit in publisher.encode_utf16() {
        hasher.update(unit.to_le_bytes());
    }
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);

    // 64 bits padded with one zero bit make 13 five-bit groups.
    let bits = u128::from(u64::from_be_bytes(prefix)) << 1;
    (0..PUBLISHER_ID_LEN)
        .map(|i| {
            let shift = 60 - 5 * i;
            let index = usize::try_from((bits >> shift) & 0x1f).unwrap_or_default();
            char::from(BASE32_DIGITS[index])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_publisher_id() {
        let id = publisher_id(
            "CN=Microsoft Corporation, O=Microsoft Corporation, L=Redmond, S=Washington, C=US",
        );
        assert_eq!(id, "8wekyb3d8bbwe");
    }

    #[test]
    fn test_publisher_id_shape() {
        for publisher in ["CN=Contoso", "CN=A", "CN=Fabrikam, O=Fabrikam, C=US"] {
            let id = publisher_id(publisher);
            assert_eq!(id.len(), 13);
            assert!(id.bytes().all(|b| BASE32_DIGITS.contains(&b)));
        }
    }

    #[test]
    fn test_publisher_id_is_case_sensitive() {
        assert_ne!(publisher_id("CN=Contoso"), publisher_id("cn=contoso"));
    }
}
