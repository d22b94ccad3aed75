use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGE_PATTERN: &str = "*.jpg";

/// Lists regular files in `dir` whose file name matches `pattern`.
///
/// Paths come back in `read_dir` order, which the filesystem decides.
pub fn list_images(dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let files = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| glob_match(pattern, name))
        })
        .collect();
    Ok(files)
}

/// Glob matching with `*` (any run) and `?` (one char). Case-sensitive.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p).copied() {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
