//! Word-level diff between the learner's text and the corrected text.
//!
//! Both texts are split into words, whitespace runs and single punctuation
//! characters; the longest common subsequence of those tokens is kept as
//! unchanged and everything else is reported as removed (only in the
//! original) or added (only in the correction). Adjacent tokens of the same
//! kind are merged into one segment.
//!
//! The shared prefix and suffix are matched first and only the region in
//! between is aligned, so the alignment table stays small for the usual
//! edit. An oversized region is not aligned at all.

use serde::{Deserialize, Serialize};

/// How a segment relates the two texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Unchanged,
    Added,
    Removed,
}

/// A run of text with a single change kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub kind: ChangeKind,
    pub value: String,
}

/// Largest alignment table, in token pairs, built for the changed middle of
/// a diff. Beyond it the middle is reported as one removal and one addition.
const MAX_TABLE_CELLS: usize = 1 << 20;

/// Diff `original` against `corrected`.
pub fn word_diff(original: &str, corrected: &str) -> Vec<DiffSegment> {
    let a = tokenize(original);
    let b = tokenize(corrected);

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut segments = Vec::new();
    for token in &a[..prefix] {
        push(&mut segments, ChangeKind::Unchanged, token);
    }

    if a_mid.len().saturating_mul(b_mid.len()) > MAX_TABLE_CELLS {
        tracing::debug!(
            removed = a_mid.len(),
            added = b_mid.len(),
            "changed region too large to align, replacing it whole"
        );
        for token in a_mid {
            push(&mut segments, ChangeKind::Removed, token);
        }
        for token in b_mid {
            push(&mut segments, ChangeKind::Added, token);
        }
    } else {
        align(a_mid, b_mid, &mut segments);
    }

    for token in &a[a.len() - suffix..] {
        push(&mut segments, ChangeKind::Unchanged, token);
    }
    segments
}

/// LCS alignment of `a` against `b`.
fn align(a: &[&str], b: &[&str], segments: &mut Vec<DiffSegment>) {
    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            push(segments, ChangeKind::Unchanged, a[i]);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            push(segments, ChangeKind::Removed, a[i]);
            i += 1;
        } else {
            push(segments, ChangeKind::Added, b[j]);
            j += 1;
        }
    }
    for token in &a[i..] {
        push(segments, ChangeKind::Removed, token);
    }
    for token in &b[j..] {
        push(segments, ChangeKind::Added, token);
    }
}

fn push(segments: &mut Vec<DiffSegment>, kind: ChangeKind, token: &str) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.value.push_str(token),
        _ => segments.push(DiffSegment {
            kind,
            value: token.to_string(),
        }),
    }
}

#[derive(PartialEq, Eq)]
enum Class {
    Word,
    Space,
    Other,
}

fn class(c: char) -> Class {
    if c.is_alphanumeric() || c == '_' || c == '\'' {
        Class::Word
    } else if c.is_whitespace() {
        Class::Space
    } else {
        Class::Other
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Class> = None;

    for (idx, c) in text.char_indices() {
        let next = class(c);
        let continues = match &current {
            Some(prev) => *prev == next && next != Class::Other,
            None => false,
        };
        if !continues {
            if idx > start {
                tokens.push(&text[start..idx]);
            }
            start = idx;
        }
        current = Some(next);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(segments: &[DiffSegment], kind: ChangeKind) -> Vec<String> {
        segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.value.trim().to_string())
            .collect()
    }

    #[test]
    fn tokenizer_splits_words_spaces_and_punctuation() {
        assert_eq!(
            tokenize("Hoe gaat het?  Goed!"),
            vec!["Hoe", " ", "gaat", " ", "het", "?", "  ", "Goed", "!"]
        );
        assert_eq!(tokenize("café's"), vec!["café's"]);
    }

    #[test]
    fn identical_texts_are_one_unchanged_segment() {
        let diff = word_diff("Ik ben thuis.", "Ik ben thuis.");
        assert_eq!(
            diff,
            vec![DiffSegment {
                kind: ChangeKind::Unchanged,
                value: "Ik ben thuis.".into()
            }]
        );
    }

    #[test]
    fn moved_participle_is_removed_and_added() {
        let diff = word_diff("Ik ben gaan naar huis", "Ik ben naar huis gegaan");

        assert_eq!(text_of(&diff, ChangeKind::Removed), vec!["gaan"]);
        assert_eq!(text_of(&diff, ChangeKind::Added), vec!["gegaan"]);
        assert_eq!(
            text_of(&diff, ChangeKind::Unchanged),
            vec!["Ik ben", "naar huis"]
        );
    }

    #[test]
    fn diff_reassembles_both_texts() {
        let original = "De kat zitten op de mat.";
        let corrected = "De kat zit op de mat.";
        let diff = word_diff(original, corrected);

        let rebuilt_original: String = diff
            .iter()
            .filter(|s| s.kind != ChangeKind::Added)
            .map(|s| s.value.as_str())
            .collect();
        let rebuilt_corrected: String = diff
            .iter()
            .filter(|s| s.kind != ChangeKind::Removed)
            .map(|s| s.value.as_str())
            .collect();

        assert_eq!(rebuilt_original, original);
        assert_eq!(rebuilt_corrected, corrected);
    }

    #[test]
    fn long_rewrite_is_replaced_whole() {
        let original: String = (0..2000).map(|n| format!("oud{n} ")).collect();
        let corrected: String = (0..2000).map(|n| format!("nieuw{n} ")).collect();
        let original = format!("Begin. {original}Einde.");
        let corrected = format!("Begin. {corrected}Einde.");

        let diff = word_diff(&original, &corrected);
        let kinds: Vec<ChangeKind> = diff.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Unchanged,
                ChangeKind::Removed,
                ChangeKind::Added,
                ChangeKind::Unchanged
            ]
        );
        assert_eq!(diff[0].value, "Begin. ");
        assert_eq!(diff[3].value, " Einde.");
    }

    #[test]
    fn empty_sides() {
        assert!(word_diff("", "").is_empty());
        assert_eq!(text_of(&word_diff("", "Hallo"), ChangeKind::Added), vec!["Hallo"]);
        assert_eq!(text_of(&word_diff("Hallo", ""), ChangeKind::Removed), vec!["Hallo"]);
    }
}
