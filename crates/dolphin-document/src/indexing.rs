use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Hex digits kept from the digest.
const FINGERPRINT_LEN: usize = 32;

/// Key for a file, derived from its canonical path. SHA-256 keeps it
/// identical across builds and toolchains.
pub fn compute_fingerprint(path: &Path) -> String {
    let resolved = canonicalize_lossy(path);
    let digest = Sha256::digest(resolved.as_bytes());

    digest[..FINGERPRINT_LEN / 2]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn canonicalize_lossy(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn relative_and_absolute_paths_agree() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.jsonl");
        fs::write(&file, "{}\n").unwrap();

        let dotted = dir.path().join(".").join("a.jsonl");
        assert_eq!(compute_fingerprint(&file), compute_fingerprint(&dotted));
        assert_ne!(compute_fingerprint(&file), compute_fingerprint(&dir.path().join("b.jsonl")));
    }

    #[test]
    fn fingerprint_is_fixed_for_a_path() {
        // SHA-256 of "/nonexistent/events.jsonl"; the path cannot be
        // canonicalized, so it is hashed as given.
        let fingerprint = compute_fingerprint(Path::new("/nonexistent/events.jsonl"));
        assert_eq!(fingerprint.len(), FINGERPRINT_LEN);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(fingerprint, "06c90f4664ce48e5017560ae56bc0c25");
    }
}
