//! Tone drill state and grading.
//!
//! Everything here is a pure function of the data passed in. The caller owns
//! the collection of [`AnnotatedSyllable`]s, mutates `user_tone` in response to
//! learner input, and asks for a [`ScoreResult`] or per-item [`Verdict`]s when
//! it wants to show them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tone::{apply_tone, ToneDigit, ToneStyle};
use crate::transcription::parse_numbered;

/// A toneless syllable and the tone the transcription provider assigned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syllable {
    pub base: String,
    pub reference_tone: ToneDigit,
}

impl Syllable {
    pub fn new(base: impl Into<String>, reference_tone: ToneDigit) -> Self {
        Self {
            base: base.into(),
            reference_tone,
        }
    }

    /// Build from a numbered reading such as `"zhong1"` or `"lv3"`.
    ///
    /// Readings without a trailing tone digit get the neutral tone.
    pub fn from_numbered(raw: &str) -> Self {
        let (base, tone) = parse_numbered(raw);
        Self::new(base, tone)
    }

    /// The reference reading in the requested style.
    pub fn reading(&self, style: ToneStyle) -> String {
        match style {
            ToneStyle::Marks => apply_tone(&self.base, Some(self.reference_tone)),
            ToneStyle::Numbers if self.base.is_empty() => String::new(),
            ToneStyle::Numbers => format!("{}{}", self.base, self.reference_tone),
            ToneStyle::Plain => self.base.clone(),
        }
    }
}

/// A syllable in a drill, with the learner's answer if one was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedSyllable {
    #[serde(flatten)]
    pub syllable: Syllable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tone: Option<ToneDigit>,
}

impl AnnotatedSyllable {
    pub fn new(syllable: Syllable) -> Self {
        Self {
            syllable,
            user_tone: None,
        }
    }

    pub fn base(&self) -> &str {
        &self.syllable.base
    }

    /// Record the learner's answer.
    pub fn assign(&mut self, tone: ToneDigit) {
        self.user_tone = Some(tone);
    }

    pub fn clear(&mut self) {
        self.user_tone = None;
    }

    /// What the drill shows for this syllable: the base with the learner's
    /// tone applied, or the bare base when nothing has been assigned.
    pub fn display_text(&self) -> String {
        apply_tone(&self.syllable.base, self.user_tone)
    }

    pub fn verdict(&self) -> Verdict {
        verdict_of(self)
    }
}

impl From<Syllable> for AnnotatedSyllable {
    fn from(syllable: Syllable) -> Self {
        Self::new(syllable)
    }
}

/// Anything that can be graded: a reference tone and an optional answer.
pub trait Gradable {
    fn reference_tone(&self) -> Option<ToneDigit>;
    fn user_tone(&self) -> Option<ToneDigit>;
}

impl<G: Gradable + ?Sized> Gradable for &G {
    fn reference_tone(&self) -> Option<ToneDigit> {
        (**self).reference_tone()
    }

    fn user_tone(&self) -> Option<ToneDigit> {
        (**self).user_tone()
    }
}

impl Gradable for AnnotatedSyllable {
    fn reference_tone(&self) -> Option<ToneDigit> {
        Some(self.syllable.reference_tone)
    }

    fn user_tone(&self) -> Option<ToneDigit> {
        self.user_tone
    }
}

/// A bare `(reference, answer)` pair for callers that keep their own items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreItem {
    pub reference: Option<ToneDigit>,
    pub user: Option<ToneDigit>,
}

impl ScoreItem {
    pub fn new(reference: Option<ToneDigit>, user: Option<ToneDigit>) -> Self {
        Self { reference, user }
    }
}

impl Gradable for ScoreItem {
    fn reference_tone(&self) -> Option<ToneDigit> {
        self.reference
    }

    fn user_tone(&self) -> Option<ToneDigit> {
        self.user
    }
}

/// Per-item grading outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    /// Wrong or unanswered.
    Incorrect,
    /// No reference tone; not counted.
    Ungraded,
}

/// Aggregate drill score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct: u32,
    pub total: u32,
    pub percent: u32,
}

impl ScoreResult {
    fn from_counts(correct: u32, total: u32) -> Self {
        // Integer round-half-up of 100 * correct / total.
        let percent = if total == 0 {
            0
        } else {
            ((200 * u64::from(correct) + u64::from(total)) / (2 * u64::from(total))) as u32
        };
        Self {
            correct,
            total,
            percent,
        }
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.correct, self.total, self.percent)
    }
}

fn verdict_of<G: Gradable + ?Sized>(item: &G) -> Verdict {
    match (item.reference_tone(), item.user_tone()) {
        (None, _) => Verdict::Ungraded,
        (Some(reference), Some(user)) if reference == user => Verdict::Correct,
        (Some(_), _) => Verdict::Incorrect,
    }
}

/// Grade each item.
pub fn check<I>(items: I) -> Vec<Verdict>
where
    I: IntoIterator,
    I::Item: Gradable,
{
    items.into_iter().map(|item| verdict_of(&item)).collect()
}

/// Count correct answers over the items that have a reference tone.
pub fn score<I>(items: I) -> ScoreResult
where
    I: IntoIterator,
    I::Item: Gradable,
{
    let (correct, total) = items
        .into_iter()
        .map(|item| verdict_of(&item))
        .fold((0u32, 0u32), |(correct, total), verdict| match verdict {
            Verdict::Correct => (correct + 1, total + 1),
            Verdict::Incorrect => (correct, total + 1),
            Verdict::Ungraded => (correct, total),
        });
    let result = ScoreResult::from_counts(correct, total);
    log::debug!("scored drill: {result}");
    result
}

/// Clear every learner answer, returning the items to their base display.
pub fn reset_all(items: impl IntoIterator<Item = AnnotatedSyllable>) -> Vec<AnnotatedSyllable> {
    items
        .into_iter()
        .map(|mut item| {
            item.clear();
            item
        })
        .collect()
}
