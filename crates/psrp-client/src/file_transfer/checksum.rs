//! Incremental SHA-256 checksumming (§4.G "Checksum"): computed locally
//! while streaming a file so no second read pass is needed, then compared
//! case-insensitively against whatever hex digest the remote side reports.

use sha2::{Digest, Sha256};

#[derive(Default)]
pub struct IncrementalSha256 {
    hasher: Sha256,
}

impl IncrementalSha256 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finalize_hex(self) -> String {
        let digest = self.hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Remote checksums may come back upper- or lower-case depending on the
/// shell computing them; compare case-insensitively (§4.G).
pub fn checksums_match(local_hex: &str, remote_hex: &str) -> bool {
    local_hex.eq_ignore_ascii_case(remote_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_single_shot() {
        let mut incremental = IncrementalSha256::new();
        incremental.update(b"hello ");
        incremental.update(b"world");
        let incremental_hex = incremental.finalize_hex();

        let mut single_shot = Sha256::new();
        single_shot.update(b"hello world");
        let single_shot_hex: String = single_shot
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        assert_eq!(incremental_hex, single_shot_hex);
    }

    #[test]
    fn test_checksums_match_case_insensitive() {
        assert!(checksums_match("ABCDEF", "abcdef"));
        assert!(!checksums_match("abcdef", "abcdee"));
    }
}
