//! Islamic knowledge quiz: the question bank and open quiz sessions.

use chrono::{DateTime, TimeDelta, Utc};
use ilm_core::{AccountKey, Difficulty};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::debug;

/// Letters answers are given by, in option order.
pub const ANSWER_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

/// Minutes a started quiz stays answerable.
pub const QUIZ_TIMEOUT_MINUTES: i64 = 10;

/// Topic of a quiz question.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum QuizCategory {
    /// The Quran
    Quran,
    /// Hadith
    Hadith,
    /// Prophets
    Prophets,
    /// Prayer
    Prayer,
    /// Islamic calendar
    Calendar,
}

/// A multiple choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    /// Stable id
    pub id: String,
    /// Question text
    pub question: String,
    /// Up to four options, answered by letter
    pub options: Vec<String>,
    /// Index of the correct option
    pub correct: usize,
    /// Shown after answering
    pub explanation: String,
    /// Difficulty, drives the payout
    pub difficulty: Difficulty,
    /// Topic
    pub category: QuizCategory,
}

impl QuizQuestion {
    /// Build a question.
    pub fn new(
        id: &str,
        question: &str,
        options: [&str; 4],
        correct: usize,
        explanation: &str,
        difficulty: Difficulty,
        category: QuizCategory,
    ) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
            explanation: explanation.to_string(),
            difficulty,
            category,
        }
    }

    /// Option text prefixed by its letter, e.g. `B) Surah Yasin`.
    pub fn labeled(&self, index: usize) -> Option<String> {
        let letter = ANSWER_LETTERS.get(index)?;
        let text = self.options.get(index)?;
        Some(format!("{}) {}", letter, text))
    }

    /// Whether an answer letter is the correct one.
    pub fn is_correct(&self, letter: &str) -> bool {
        ANSWER_LETTERS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(letter))
            .is_some_and(|index| index == self.correct)
    }
}

/// Questions the quiz draws from.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        use Difficulty::{Easy, Medium};
        use QuizCategory::*;

        Self::new(vec![
            QuizQuestion::new(
                "quiz_001",
                "Which surah is known as the 'Heart of the Quran'?",
                ["Surah Al-Fatihah", "Surah Al-Baqarah", "Surah Yasin", "Surah Al-Ikhlas"],
                2,
                "Surah Yasin is often called the 'Heart of the Quran' due to its profound meanings and central importance.",
                Medium,
                Quran,
            ),
            QuizQuestion::new(
                "quiz_002",
                "Who narrated the famous Hadith: 'Actions are judged by intentions'?",
                ["Abu Huraira", "Umar ibn Al-Khattab", "Aisha bint Abi Bakr", "Ali ibn Abi Talib"],
                1,
                "This important Hadith about intentions was narrated by Umar ibn Al-Khattab and is found in Sahih al-Bukhari.",
                Easy,
                Hadith,
            ),
            QuizQuestion::new(
                "quiz_003",
                "How many times do Muslims pray each day?",
                ["3 times", "5 times", "7 times", "10 times"],
                1,
                "Muslims perform 5 daily prayers: Fajr, Dhuhr, Asr, Maghrib, and Isha.",
                Easy,
                Prayer,
            ),
            QuizQuestion::new(
                "quiz_004",
                "Which prophet is known for building the Kaaba?",
                ["Prophet Adam", "Prophet Ibrahim", "Prophet Musa", "Prophet Muhammad"],
                1,
                "Prophet Ibrahim (Abraham) and his son Ismail built the Kaaba in Mecca as the first house of worship for Allah.",
                Medium,
                Prophets,
            ),
            QuizQuestion::new(
                "quiz_005",
                "What is the first month of the Islamic calendar?",
                ["Ramadan", "Muharram", "Shawwal", "Dhul-Hijjah"],
                1,
                "Muharram is the first month of the Islamic Hijri calendar and is one of the four sacred months.",
                Easy,
                Calendar,
            ),
        ])
    }
}

impl QuestionBank {
    /// A bank over the given questions.
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self { questions }
    }

    /// All questions.
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// A random question matching the filters, `None` when nothing matches.
    pub fn pick(
        &self,
        category: Option<QuizCategory>,
        difficulty: Option<Difficulty>,
    ) -> Option<&QuizQuestion> {
        let matching: Vec<&QuizQuestion> = self
            .questions
            .iter()
            .filter(|q| category.is_none_or(|c| q.category == c))
            .filter(|q| difficulty.is_none_or(|d| q.difficulty == d))
            .collect();
        matching.choose(&mut rand::thread_rng()).copied()
    }
}

#[derive(Debug, Clone)]
struct ActiveQuiz {
    question: QuizQuestion,
    expires_at: DateTime<Utc>,
}

/// Open quizzes, one per account.
#[derive(Debug, Default)]
pub struct QuizSessions {
    active: Mutex<HashMap<AccountKey, ActiveQuiz>>,
}

impl QuizSessions {
    /// Empty session table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a quiz for an account, replacing any quiz it had open.
    pub fn start(&self, key: AccountKey, question: QuizQuestion, now: DateTime<Utc>) {
        let expires_at = now + TimeDelta::minutes(QUIZ_TIMEOUT_MINUTES);
        let mut active = self.active.lock();
        active.retain(|_, quiz| quiz.expires_at > now);
        active.insert(
            key,
            ActiveQuiz {
                question,
                expires_at,
            },
        );
    }

    /// Close the account's quiz and hand back its question. Expired quizzes
    /// are dropped and yield `None`, so each quiz is answered at most once.
    pub fn take(&self, key: AccountKey, now: DateTime<Utc>) -> Option<QuizQuestion> {
        let quiz = self.active.lock().remove(&key)?;
        if quiz.expires_at <= now {
            debug!(%key, "Quiz expired before answer");
            return None;
        }
        Some(quiz.question)
    }

    /// Number of open quizzes.
    pub fn len(&self) -> usize {
        self.active.lock().len()
    }

    /// Whether no quiz is open.
    pub fn is_empty(&self) -> bool {
        self.active.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_pick_respects_filters() {
        let bank = QuestionBank::default();
        let question = bank.pick(Some(QuizCategory::Quran), None).unwrap();
        assert_eq!(question.id, "quiz_001");

        let easy = bank.pick(None, Some(Difficulty::Easy)).unwrap();
        assert_eq!(easy.difficulty, Difficulty::Easy);

        assert!(bank
            .pick(Some(QuizCategory::Calendar), Some(Difficulty::Hard))
            .is_none());
    }

    #[test]
    fn test_answer_letters() {
        let bank = QuestionBank::default();
        let yasin = &bank.questions()[0];
        assert!(yasin.is_correct("C"));
        assert!(yasin.is_correct("c"));
        assert!(!yasin.is_correct("A"));
        assert!(!yasin.is_correct("E"));
        assert_eq!(yasin.labeled(2).as_deref(), Some("C) Surah Yasin"));
    }

    #[test]
    fn test_session_answered_once_and_expires() {
        let sessions = QuizSessions::new();
        let key = AccountKey::new(1u64, 2u64);
        let question = QuestionBank::default().questions()[2].clone();

        sessions.start(key, question.clone(), now());
        assert_eq!(sessions.take(key, now()), Some(question.clone()));
        assert_eq!(sessions.take(key, now()), None);

        sessions.start(key, question, now());
        let late = now() + TimeDelta::minutes(QUIZ_TIMEOUT_MINUTES);
        assert_eq!(sessions.take(key, late), None);
        assert!(sessions.is_empty());
    }
}
