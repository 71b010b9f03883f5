//! Export: single-message verbatim copies and year-filtered mbox extraction.

pub mod eml;
pub mod mbox;

use std::path::Path;

/// Whether `a` and `b` name the same existing file, through relative
/// components, `..` or symlinks. A path that does not exist yet never
/// matches.
pub fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_same_file_sees_through_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let mbox = dir.path().join("mail.mbox");
        std::fs::write(&mbox, b"From a@b.c Thu Jun  1 09:15:33 2023\n\nbody\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let dotted = dir.path().join("sub").join("..").join("mail.mbox");
        assert_ne!(dotted, mbox);
        assert!(is_same_file(&mbox, &dotted));
        assert!(!is_same_file(&mbox, &dir.path().join("other.mbox")));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_same_file_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let mbox = dir.path().join("mail.mbox");
        std::fs::write(&mbox, b"x").unwrap();
        let link = dir.path().join("link.mbox");
        std::os::unix::fs::symlink(&mbox, &link).unwrap();
        assert!(is_same_file(&link, &mbox));
    }
}
