//! Normalized string similarity for matching OCR tokens to brand variants.
//!
//! The score is the normalized InDel similarity on a 0-100 scale:
//! `100 * 2 * lcs(a, b) / (len(a) + len(b))`, where `lcs` is the length of the
//! longest common subsequence. It is symmetric, 100 for identical strings and
//! 0 when no character is shared. Lengths are counted in chars.

use crate::models::BrandKeywordTable;

/// Length of the longest common subsequence of two char slices.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Use two rows instead of full matrix for space efficiency
    let mut prev_row: Vec<usize> = vec![0; b.len() + 1];
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for a_char in a {
        for (j, b_char) in b.iter().enumerate() {
            curr_row[j + 1] = if a_char == b_char {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Similarity of two strings, 0-100.
///
/// Two empty strings are considered identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(&a_chars, &b_chars);
    100.0 * (2 * lcs) as f64 / total as f64
}

/// First variant of one brand that a token matched.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantMatch<'a> {
    /// Column position of the brand in the table.
    pub brand_idx: usize,
    pub brand: &'a str,
    pub variant: &'a str,
    pub score: f64,
}

/// Matches tokens against every brand of a keyword table.
#[derive(Debug, Clone, Copy)]
pub struct BrandMatcher<'a> {
    table: &'a BrandKeywordTable,
    threshold: f64,
}

impl<'a> BrandMatcher<'a> {
    pub fn new(table: &'a BrandKeywordTable, threshold: f64) -> Self {
        Self { table, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// For each brand in table order, the first variant scoring at or above
    /// the threshold. A token may match several brands, but at most once each.
    pub fn match_token(&self, token: &str) -> Vec<VariantMatch<'a>> {
        let table: &'a BrandKeywordTable = self.table;
        table
            .entries()
            .iter()
            .enumerate()
            .filter_map(|(brand_idx, entry)| {
                entry.variants.iter().find_map(|variant| {
                    let score = ratio(token, variant);
                    (score >= self.threshold).then(|| VariantMatch {
                        brand_idx,
                        brand: entry.name.as_str(),
                        variant: variant.as_str(),
                        score,
                    })
                })
            })
            .collect()
    }
}
