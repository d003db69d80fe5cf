//! Natural ordering for sample names ("S2" before "S10").

use std::cmp::Ordering;

/// A run of either digits or non-digits.
#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(&'a str),
    Digits(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if is_digit {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    })
}

/// Compares digit runs by numeric value without parsing, so runs of any
/// length are ordered correctly.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Natural comparison: digit runs compare numerically, text runs compare
/// case-insensitively.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => cmp_text(x, y),
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digits(x, y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

/// Sorts names in natural order.
pub fn sort_natural<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs() {
        assert_eq!(natural_cmp("S2", "S10"), Ordering::Less);
        assert_eq!(natural_cmp("S10", "S9"), Ordering::Greater);
        assert_eq!(natural_cmp("S007", "S7"), Ordering::Equal);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(natural_cmp("sample1", "SAMPLE1"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "B"), Ordering::Less);
    }

    #[test]
    fn test_prefix_is_less() {
        assert_eq!(natural_cmp("S1", "S1_b"), Ordering::Less);
        assert_eq!(natural_cmp("", "S"), Ordering::Less);
    }

    #[test]
    fn test_long_digit_runs() {
        assert_eq!(
            natural_cmp("x123456789012345678901234567890", "x99"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_sort_natural() {
        let mut names = vec!["tonsil10", "Tonsil2", "tonsil1", "lung3"];
        sort_natural(&mut names);
        assert_eq!(names, vec!["lung3", "tonsil1", "Tonsil2", "tonsil10"]);
    }
}
