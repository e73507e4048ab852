//! Title normalization and fuzzy comparison.

/// Folds a title into a comparable form: lowercase, apostrophe variants
/// unified, anything outside `[a-z0-9 :,-]` blanked, whitespace collapsed.
pub fn normalize(input: Option<&str>) -> String {
    let lowered = input.unwrap_or_default().to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '\u{02BC}' | '`' => '\'',
            other => other,
        })
        .map(|c| match c {
            'a'..='z' | '0'..='9' | ':' | ',' | '-' => c,
            _ => ' ',
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ratcliff/Obershelp ratio of the normalized titles: `2·M / (|a| + |b|)`
/// where `M` counts characters in the recursively found longest common
/// blocks. Two empty titles are identical.
///
/// The ratio depends on argument order: blocks are anchored at their
/// earliest position in `a`, as difflib's `SequenceMatcher` does, so
/// swapping the arguments can change `M`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(Some(a)).chars().collect();
    let b: Vec<char> = normalize(Some(b)).chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

/// Longest common block as `(start_a, start_b, len)`; earliest in `a`, then
/// earliest in `b`, on ties.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev[j] + 1;
                cur[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        prev = cur;
    }
    best
}
