//! The static pool of practice questions.

use std::collections::HashSet;

use rand::Rng;

/// Prompts used when the configuration does not provide its own.
const DEFAULT_QUESTIONS: &[&str] = &[
    "Wat heb je gisteren gedaan?",
    "Waar woon je en wat vind je van je buurt?",
    "Wat is je favoriete seizoen en waarom?",
    "Wat eet je meestal als ontbijt?",
    "Hoe ga je naar je werk of school?",
    "Wat ga je dit weekend doen?",
    "Welk boek of welke film heb je onlangs leuk gevonden?",
    "Beschrijf je beste vriend of vriendin.",
    "Wat zou je doen als je een dag vrij had?",
    "Waarom leer je Nederlands?",
    "Hoe ziet een gewone werkdag er voor jou uit?",
    "Naar welk land zou je graag op vakantie gaan?",
];

/// An immutable, ordered list of question prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPool {
    questions: Vec<String>,
}

impl QuestionPool {
    /// Build a pool from the given prompts. Blank prompts are dropped.
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions
                .into_iter()
                .map(Into::into)
                .filter(|q| !q.trim().is_empty())
                .collect(),
        }
    }

    /// All prompts, in order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Number of prompts.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the pool holds no prompts.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Prompts not in `used`, in pool order.
    pub fn unused<'a>(&'a self, used: &HashSet<&str>) -> Vec<&'a str> {
        self.questions
            .iter()
            .map(String::as_str)
            .filter(|q| !used.contains(q))
            .collect()
    }

    /// Pick an unused prompt uniformly at random, or `None` once the pool
    /// is exhausted.
    pub fn pick_unused<R>(&self, used: &HashSet<&str>, rng: &mut R) -> Option<&str>
    where
        R: Rng + ?Sized,
    {
        let unused = self.unused(used);
        if unused.is_empty() {
            return None;
        }
        Some(unused[rng.random_range(0..unused.len())])
    }
}

impl Default for QuestionPool {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_pool_is_populated() {
        let pool = QuestionPool::default();
        assert_eq!(pool.len(), DEFAULT_QUESTIONS.len());
    }

    #[test]
    fn blank_prompts_are_dropped() {
        let pool = QuestionPool::new(["Hoe heet je?", "  ", ""]);
        assert_eq!(pool.questions(), ["Hoe heet je?".to_string()]);
    }

    #[test]
    fn picks_only_unused_prompts() {
        let pool = QuestionPool::new(["a", "b", "c"]);
        let used: HashSet<&str> = ["a", "c"].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            assert_eq!(pool.pick_unused(&used, &mut rng), Some("b"));
        }
    }

    #[test]
    fn pick_covers_every_unused_prompt() {
        let pool = QuestionPool::new(["a", "b", "c", "d"]);
        let used = HashSet::new();
        let mut rng = StdRng::seed_from_u64(42);

        let seen: HashSet<&str> = (0..200)
            .filter_map(|_| pool.pick_unused(&used, &mut rng))
            .collect();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn exhausted_pool_yields_none() {
        let pool = QuestionPool::new(["a"]);
        let used: HashSet<&str> = ["a"].into_iter().collect();
        assert_eq!(pool.pick_unused(&used, &mut rand::rng()), None);
    }
}
