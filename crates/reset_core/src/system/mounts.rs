//! Mount table reading.
//!
//! Parses the `/proc/mounts` format: one mount per line, whitespace
//! separated, with spaces and other specials in paths octal-escaped
//! (`\040` for a space).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Mount targets at or below `root`, deepest first.
///
/// Deepest first is the order they have to be unmounted in.
pub fn mounts_under(mounts_file: &Path, root: &Path) -> io::Result<Vec<PathBuf>> {
    let content = fs::read_to_string(mounts_file)?;
    Ok(filter_mounts(&content, root))
}

fn filter_mounts(content: &str, root: &Path) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = content
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|target| PathBuf::from(unescape(target)))
        .filter(|target| target.starts_with(root))
        .collect();

    targets.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| b.cmp(a))
    });
    targets.dedup();
    targets
}

/// Decode the `\ooo` octal escapes the kernel uses in mount paths.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let digits = &bytes[i + 1..i + 4];
            out.push((digits[0] - b'0') * 64 + (digits[1] - b'0') * 8 + (digits[2] - b'0'));
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_triplet(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
