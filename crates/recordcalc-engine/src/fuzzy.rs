//! Fuzzy-match helpers backing the validator's "did you mean" suggestions.

/// Classic Levenshtein edit distance.
#[must_use]
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Suggestion criterion: case-insensitive substring containment in either
/// direction, or an edit distance of at most 2.
#[must_use]
pub(crate) fn is_close_match(input: &str, candidate: &str) -> bool {
    let input_lower = input.to_lowercase();
    let candidate_lower = candidate.to_lowercase();
    if !input_lower.is_empty()
        && (candidate_lower.contains(&input_lower) || input_lower.contains(&candidate_lower))
    {
        return true;
    }
    edit_distance(&input_lower, &candidate_lower) <= 2
}

/// Rank `candidates` against `input` and return the closest few names.
#[must_use]
pub(crate) fn suggestions<'a, I>(input: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let input_lower = input.to_lowercase();
    let mut matches: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|c| is_close_match(input, c))
        .map(|c| (edit_distance(&input_lower, &c.to_lowercase()), c))
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    matches
        .into_iter()
        .map(|(_, c)| c.to_string())
        .take(limit)
        .collect()
}
