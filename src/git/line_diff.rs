//! Line-level diff counts between two blob versions.
//!
//! Counts are the insert/delete sizes of an LCS-minimal edit script, so a
//! line that keeps its relative position is never double-counted. Each
//! line's identity includes its terminator, and terminated content carries
//! a final empty line after the last newline. Appending a newline to an
//! unterminated file therefore deletes the old final line and adds two
//! lines: the terminated text and the new empty tail.

/// Returns `(added, deleted)` line counts between the two contents.
pub fn diff_lines(old: &[u8], new: &[u8]) -> (usize, usize) {
    if old == new {
        return (0, 0);
    }
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    // Trim the common prefix and suffix before the quadratic LCS pass;
    // for typical edits the remaining window is small.
    let mut start = 0;
    while start < old_lines.len() && start < new_lines.len() && old_lines[start] == new_lines[start]
    {
        start += 1;
    }
    let mut old_end = old_lines.len();
    let mut new_end = new_lines.len();
    while old_end > start && new_end > start && old_lines[old_end - 1] == new_lines[new_end - 1] {
        old_end -= 1;
        new_end -= 1;
    }

    let common = lcs_length(&old_lines[start..old_end], &new_lines[start..new_end]);
    let deleted = (old_end - start) - common;
    let added = (new_end - start) - common;
    (added, deleted)
}

/// Number of lines in a blob, an unterminated trailing line counting as
/// one. This is a terminator count, not the diff engine's line model: the
/// empty tail after a final newline is not a line here.
pub fn count_lines(data: &[u8]) -> usize {
    let terminated = data.iter().filter(|&&b| b == b'\n').count();
    match data.last() {
        None | Some(b'\n') => terminated,
        Some(_) => terminated + 1,
    }
}

/// Splits on `\n`, keeping the terminator inside each line so terminated
/// and unterminated variants of the same text stay distinct. The slice
/// after the last newline is always a line, so terminated content ends in
/// an empty line and empty content is a single empty line.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            lines.push(&data[start..=i]);
            start = i + 1;
        }
    }
    lines.push(&data[start..]);
    lines
}

/// Two-row dynamic program for the LCS length; only the length is needed
/// for counting, never the script itself.
fn lcs_length(a: &[&[u8]], b: &[&[u8]]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for line_a in a {
        for (j, line_b) in b.iter().enumerate() {
            row[j + 1] = if line_a == line_b {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_is_a_no_op() {
        assert_eq!(diff_lines(b"a\nb\nc\n", b"a\nb\nc\n"), (0, 0));
        assert_eq!(diff_lines(b"", b""), (0, 0));
    }

    #[test]
    fn pure_insertions() {
        assert_eq!(diff_lines(b"a\nc\n", b"a\nb\nc\n"), (1, 0));
        assert_eq!(diff_lines(b"", b"a\nb\n"), (2, 0));
    }

    #[test]
    fn pure_deletions() {
        assert_eq!(diff_lines(b"a\nb\nc\n", b"a\nc\n"), (0, 1));
        assert_eq!(diff_lines(b"a\n", b""), (0, 1));
    }

    #[test]
    fn replacement_counts_both_sides() {
        assert_eq!(diff_lines(b"old\n", b"new\n"), (1, 1));
    }

    #[test]
    fn unchanged_middle_is_not_double_counted() {
        // "b" keeps its relative position; only the edges change.
        assert_eq!(diff_lines(b"a\nb\nc\n", b"x\nb\ny\n"), (2, 2));
    }

    #[test]
    fn terminator_appended_to_single_line_file() {
        // The unterminated "one" dies; "one\n" and the empty tail are new.
        assert_eq!(diff_lines(b"one", b"one\n"), (2, 1));
    }

    #[test]
    fn terminator_removed_from_final_line() {
        assert_eq!(diff_lines(b"one\n", b"one"), (1, 2));
    }

    #[test]
    fn count_delta_matches_length_delta() {
        // Holds whenever both sides share terminator parity.
        let cases: [(&[u8], &[u8]); 4] = [
            (b"a\nb\nc\n", b"a\nc\n"),
            (b"one", b"one\ntwo"),
            (b"", b"x\ny\nz\n"),
            (b"m\nn\n", b"n\nm\n"),
        ];
        for (old, new) in cases {
            let (added, deleted) = diff_lines(old, new);
            assert_eq!(
                added as i64 - deleted as i64,
                count_lines(new) as i64 - count_lines(old) as i64,
            );
        }
    }

    #[test]
    fn line_counts() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"\n"), 1);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\nb"), 2);
        assert_eq!(count_lines(b"a\nb\n"), 2);
    }
}
