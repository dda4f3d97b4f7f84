//! Path normalization and candidate outline enumeration.
//!
//! A request path of `n` segments maps to `2^n` candidate outlines. For every
//! prefix length `len` from `n` down to 1, every mask in
//! `[2^(len-1), 2^len)` is enumerated in descending order: bit `len-1-k` of
//! the mask selects the literal segment `k`, a clear bit selects `%`. The
//! leading segment of a candidate is therefore always literal. The root
//! outline `/` closes the list.
//!
//! Descending masks put the most literal outlines first, and longer prefixes
//! before shorter ones, which is the order stored routes are ranked in.

use crate::routing::compiler::{MAX_PARTS, WILDCARD};

/// Normalize a request path to `/a/b/c` form; the root is `/`.
pub fn normalize_path(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

/// Non-empty path segments, truncated to [`MAX_PARTS`].
pub fn path_parts(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .take(MAX_PARTS)
        .collect()
}

/// Every outline a stored route would need to have to match `parts`.
pub fn candidate_outlines(parts: &[&str]) -> Vec<String> {
    let parts = &parts[..parts.len().min(MAX_PARTS)];
    let mut outlines = Vec::with_capacity(1 << parts.len());

    for len in (1..=parts.len()).rev() {
        let upper = (1u32 << len) - 1;
        let lower = 1u32 << (len - 1);
        for mask in (lower..=upper).rev() {
            let segments: Vec<&str> = (0..len)
                .map(|k| {
                    if mask & (1 << (len - 1 - k)) != 0 {
                        parts[k]
                    } else {
                        WILDCARD
                    }
                })
                .collect();
            outlines.push(format!("/{}", segments.join("/")));
        }
    }
    outlines.push("/".to_string());

    outlines
}
