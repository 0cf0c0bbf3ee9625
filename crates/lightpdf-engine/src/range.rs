// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page range resolver — turns "1-3,5,7-10" into 0-based page indices.

use std::collections::BTreeSet;

use lightpdf_core::error::{EngineError, Result};

/// Resolve a page range expression against a document of `total` pages.
///
/// Tokens are 1-based and comma separated; each is either `n` or `a-b`
/// (inclusive). Whitespace anywhere in the expression is ignored. A missing
/// or empty expression selects every page. Single pages outside the document
/// are dropped, ranges are clamped to `total`, and the result is ascending
/// with duplicates removed.
pub fn resolve(expr: Option<&str>, total: usize) -> Result<Vec<usize>> {
    let compact: String = expr
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if compact.is_empty() {
        return Ok((0..total).collect());
    }

    let mut pages = BTreeSet::new();
    for token in compact.split(',') {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start, token)?;
                let end = parse_number(end, token)?;
                if start == 0 {
                    return Err(EngineError::validation(format!(
                        "page numbers start at 1, got '{token}'"
                    )));
                }
                pages.extend((start - 1)..end.min(total));
            }
            None => {
                let page = parse_number(token, token)?;
                if page == 0 {
                    return Err(EngineError::validation(format!(
                        "page numbers start at 1, got '{token}'"
                    )));
                }
                if page <= total {
                    pages.insert(page - 1);
                }
            }
        }
    }

    Ok(pages.into_iter().collect())
}

fn parse_number(digits: &str, token: &str) -> Result<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::validation(format!(
            "invalid page range token '{token}'"
        )));
    }
    digits
        .parse()
        .map_err(|_| EngineError::validation(format!("page number too large in '{token}'")))
}

/// Sizes of `chunks` near-equal groups covering `total` pages in order. The
/// first `total % chunks` groups hold one extra page.
pub fn chunk_sizes(total: usize, chunks: usize) -> Vec<usize> {
    if chunks == 0 {
        return Vec::new();
    }
    let base = total / chunks;
    let remainder = total % chunks;
    (0..chunks)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_mixed_expression() {
        assert_eq!(
            resolve(Some("1-3,5,7-10"), 12).unwrap(),
            vec![0, 1, 2, 4, 6, 7, 8, 9]
        );
    }

    #[test]
    fn resolve_single_and_range() {
        assert_eq!(resolve(Some("2,4-6"), 6).unwrap(), vec![1, 3, 4, 5]);
    }

    #[test]
    fn resolve_none_or_empty_selects_all() {
        assert_eq!(resolve(None, 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(resolve(Some("  "), 2).unwrap(), vec![0, 1]);
    }

    #[test]
    fn whitespace_is_stripped() {
        assert_eq!(resolve(Some(" 1 - 2 , 4 "), 5).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn out_of_bounds_single_dropped_and_range_clamped() {
        assert_eq!(resolve(Some("9"), 4).unwrap(), Vec::<usize>::new());
        assert_eq!(resolve(Some("3-99"), 4).unwrap(), vec![2, 3]);
    }

    #[test]
    fn reversed_range_selects_nothing() {
        assert_eq!(resolve(Some("3-1"), 5).unwrap(), Vec::<usize>::new());
        assert_eq!(resolve(Some("4-2,5"), 5).unwrap(), vec![4]);
    }

    #[test]
    fn duplicates_collapse_and_sort() {
        assert_eq!(resolve(Some("5,1-3,2-4"), 6).unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn malformed_expressions_rejected() {
        for expr in ["a", "1-", "-3", "1-2-3", "1,,2", "1;2", "x-4", "0"] {
            let err = resolve(Some(expr), 10).unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)), "{expr} accepted");
        }
    }

    #[test]
    fn chunk_sizes_spread_at_most_one() {
        assert_eq!(chunk_sizes(10, 3), vec![4, 3, 3]);
        assert_eq!(chunk_sizes(2, 4), vec![1, 1, 0, 0]);
        for total in 0..30 {
            for chunks in 1..8 {
                let sizes = chunk_sizes(total, chunks);
                assert_eq!(sizes.iter().sum::<usize>(), total);
                let max = sizes.iter().max().unwrap();
                let min = sizes.iter().min().unwrap();
                assert!(max - min <= 1);
            }
        }
    }
}
