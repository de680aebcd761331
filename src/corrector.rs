//! Closest-word lookup for mistyped command names.

/// Edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Furthest a typo may be from a known word and still be corrected.
const MAX_DISTANCE: usize = 2;

pub struct Corrector<'a> {
    words: Vec<&'a str>,
}

impl<'a> Corrector<'a> {
    pub fn new(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }

    /// The known word closest to `input`, if any is within the max distance.
    /// Ties go to the word listed first.
    pub fn get_word(&self, input: &str) -> Option<&'a str> {
        if input.is_empty() {
            return None;
        }
        if let Some(exact) = self.words.iter().find(|w| **w == input) {
            return Some(*exact);
        }

        self.words
            .iter()
            .map(|word| (levenshtein(input, word), *word))
            .min_by_key(|(steps, _)| *steps)
            .filter(|(steps, _)| *steps <= MAX_DISTANCE)
            .map(|(_, word)| word)
    }
}
