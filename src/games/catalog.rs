//! Question catalog for the buzz-in game: the data type, a built-in default
//! set, and the category-filtered random selection used at game start.

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Number of questions sampled when a category filter matches nothing.
pub const FALLBACK_COUNT: usize = 10;
/// Smallest question count a host may request.
pub const MIN_QUESTION_COUNT: usize = 5;
/// Largest question count a host may request.
pub const MAX_QUESTION_COUNT: usize = 50;
/// Question count used when the host does not specify one.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// A single trivia question in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier within the catalog.
    pub id: u32,
    /// Category tag used for host-side filtering.
    pub category: String,
    /// The question text read or shown to players.
    pub prompt: String,
    /// The expected answer, shown to the host for judging.
    pub answer: String,
}

impl Question {
    fn new(id: u32, category: &str, prompt: &str, answer: &str) -> Self {
        Self {
            id,
            category: category.into(),
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }
}

/// Clamp a requested question count into the allowed bounds, defaulting when
/// the host did not specify one.
pub fn clamp_question_count(requested: Option<u64>) -> usize {
    match requested {
        Some(count) => (count as usize).clamp(MIN_QUESTION_COUNT, MAX_QUESTION_COUNT),
        None => DEFAULT_QUESTION_COUNT,
    }
}

/// Select up to `count` questions matching `categories`, sampled without
/// replacement. An empty filter result falls back to a random
/// [`FALLBACK_COUNT`] from the whole catalog so a typo never yields an empty
/// game. Sampling is unseeded; no reproducibility is guaranteed.
pub fn select_questions(catalog: &[Question], categories: &[String], count: usize) -> Vec<Question> {
    let mut rng = rand::rng();

    let filtered: Vec<&Question> = catalog
        .iter()
        .filter(|question| categories.contains(&question.category))
        .collect();

    if filtered.is_empty() {
        catalog
            .choose_multiple(&mut rng, FALLBACK_COUNT)
            .cloned()
            .collect()
    } else {
        filtered
            .choose_multiple(&mut rng, count)
            .map(|question| (*question).clone())
            .collect()
    }
}

/// The catalog baked into the binary, used when the config file provides none.
pub fn default_catalog() -> Vec<Question> {
    vec![
        Question::new(1, "science", "What planet is known as the Red Planet?", "Mars"),
        Question::new(2, "science", "What gas do plants absorb from the atmosphere?", "Carbon dioxide"),
        Question::new(3, "science", "What is the chemical symbol for gold?", "Au"),
        Question::new(4, "science", "How many bones are in the adult human body?", "206"),
        Question::new(5, "science", "What force keeps planets in orbit around the Sun?", "Gravity"),
        Question::new(6, "science", "What is the hardest natural substance on Earth?", "Diamond"),
        Question::new(7, "history", "In what year did the Berlin Wall fall?", "1989"),
        Question::new(8, "history", "Who was the first president of the United States?", "George Washington"),
        Question::new(9, "history", "Which ancient civilization built Machu Picchu?", "The Inca"),
        Question::new(10, "history", "What ship sank on its maiden voyage in 1912?", "The Titanic"),
        Question::new(11, "geography", "What is the longest river in the world?", "The Nile"),
        Question::new(12, "geography", "Which country has the largest population?", "India"),
        Question::new(13, "geography", "What is the capital of Australia?", "Canberra"),
        Question::new(14, "geography", "Which desert is the largest hot desert on Earth?", "The Sahara"),
        Question::new(15, "entertainment", "Who directed the film Jurassic Park?", "Steven Spielberg"),
        Question::new(16, "entertainment", "How many strings does a standard guitar have?", "Six"),
        Question::new(17, "entertainment", "Which band recorded the album Abbey Road?", "The Beatles"),
        Question::new(18, "entertainment", "What board game features the squares Boardwalk and Park Place?", "Monopoly"),
    ]
}
