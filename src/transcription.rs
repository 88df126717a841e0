//! The seam to the external transcription provider, and drill construction.
//!
//! A [`Transcriber`] turns a single Han character into a numbered pinyin
//! reading (`"zhong1"`). [`Drill::build`] walks source text line by line,
//! asks the transcriber about every Han character and passes everything else
//! through untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tone::{normalize_umlaut, ToneDigit, ToneStyle, UMLAUT_U};
use crate::trainer::{self, AnnotatedSyllable, ScoreResult, Syllable, Verdict};

/// Source of readings for single characters.
pub trait Transcriber {
    /// Numbered reading for `ch`, e.g. `"lv3"`. `None` or an empty string
    /// means the provider has nothing for this character.
    fn transcribe(&self, ch: char) -> Option<String>;
}

impl<F> Transcriber for F
where
    F: Fn(char) -> Option<String>,
{
    fn transcribe(&self, ch: char) -> Option<String> {
        self(ch)
    }
}

/// A fixed character-to-reading table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DictionaryTranscriber {
    entries: HashMap<char, String>,
}

impl DictionaryTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON object mapping characters to numbered readings.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let dict: Self = serde_json::from_str(json)?;
        log::info!("Loaded {} dictionary readings", dict.len());
        Ok(dict)
    }

    pub fn insert(&mut self, ch: char, reading: impl Into<String>) {
        self.entries.insert(ch, reading.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(char, S)> for DictionaryTranscriber {
    fn from_iter<I: IntoIterator<Item = (char, S)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(ch, reading)| (ch, reading.into()))
                .collect(),
        }
    }
}

impl Transcriber for DictionaryTranscriber {
    fn transcribe(&self, ch: char) -> Option<String> {
        self.entries.get(&ch).cloned()
    }
}

/// True for characters in the Han script blocks.
pub fn is_han(ch: char) -> bool {
    matches!(ch,
        '\u{2E80}'..='\u{2FDF}'
        | '\u{3005}' | '\u{3007}' | '\u{3021}'..='\u{3029}' | '\u{3038}'..='\u{303B}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{323AF}'
    )
}

fn is_pinyin_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == ':' || ch == UMLAUT_U || ch == 'Ü'
}

/// Split a numbered reading into its base and tone.
///
/// The trailing digit counts only when it is 1-5 and everything before it is
/// pinyin letters; otherwise the whole reading is returned with a neutral
/// tone. The base is lowercased with umlaut spellings normalized.
pub fn parse_numbered(raw: &str) -> (String, ToneDigit) {
    let trimmed = raw.trim();
    let tone = trimmed
        .char_indices()
        .next_back()
        .filter(|(idx, _)| *idx > 0)
        .and_then(|(idx, last)| {
            let head = &trimmed[..idx];
            let digit = last.to_digit(10)?;
            (matches!(digit, 1..=5) && head.chars().all(is_pinyin_letter))
                .then(|| (head, ToneDigit::from_number(digit as i64)))
        });

    match tone {
        Some((head, Some(tone))) => (normalize_umlaut(&head.to_lowercase()), tone),
        _ => (trimmed.to_string(), ToneDigit::Neutral),
    }
}

/// One piece of a drill line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// Characters shown as-is.
    Text(String),
    /// A Han character with its drill syllable.
    Syllable {
        hanzi: char,
        syllable: AnnotatedSyllable,
    },
}

/// One piece of a reading view: plain text, or a character with the
/// reading to show above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ruby {
    Text(String),
    Annotated { hanzi: char, reading: String },
}

/// A line of drill text. Blank source lines have no segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillLine {
    pub segments: Vec<Segment>,
}

impl DrillLine {
    pub fn is_blank(&self) -> bool {
        self.segments.is_empty()
    }

    fn build<T: Transcriber + ?Sized>(line: &str, transcriber: &T) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        for ch in line.chars() {
            if !is_han(ch) {
                text.push(ch);
                continue;
            }
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            let syllable = match transcriber.transcribe(ch) {
                Some(raw) if !raw.trim().is_empty() => Syllable::from_numbered(&raw),
                _ => {
                    log::debug!("no reading for {ch:?}, leaving it unmarked");
                    Syllable::new(String::new(), ToneDigit::Neutral)
                }
            };
            segments.push(Segment::Syllable {
                hanzi: ch,
                syllable: syllable.into(),
            });
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Self { segments }
    }

    /// The line as a reading view, each character paired with its reference
    /// reading in `style`. Learner answers are not shown.
    pub fn annotate(&self, style: ToneStyle) -> Vec<Ruby> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => Ruby::Text(text.clone()),
                Segment::Syllable { hanzi, syllable } => Ruby::Annotated {
                    hanzi: *hanzi,
                    reading: syllable.syllable.reading(style),
                },
            })
            .collect()
    }

    /// The line's characters with runs of whitespace collapsed, for speech.
    pub fn text(&self) -> String {
        let raw: String = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Syllable { hanzi, .. } => hanzi.to_string(),
            })
            .collect();
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// A whole drill: the learner assigns tones to every syllable, then checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drill {
    pub lines: Vec<DrillLine>,
}

impl Drill {
    pub fn build<T: Transcriber + ?Sized>(text: &str, transcriber: &T) -> Self {
        let text = text.replace("\r\n", "\n");
        let lines: Vec<DrillLine> = text
            .split('\n')
            .map(|line| {
                if line.trim().is_empty() {
                    DrillLine::default()
                } else {
                    DrillLine::build(line, transcriber)
                }
            })
            .collect();
        let drill = Self { lines };
        log::info!(
            "Built drill with {} lines and {} syllables",
            drill.lines.len(),
            drill.syllables().count()
        );
        drill
    }

    /// Syllables in reading order.
    pub fn syllables(&self) -> impl Iterator<Item = &AnnotatedSyllable> {
        self.lines
            .iter()
            .flat_map(|line| line.segments.iter())
            .filter_map(|segment| match segment {
                Segment::Syllable { syllable, .. } => Some(syllable),
                Segment::Text(_) => None,
            })
    }

    pub fn syllables_mut(&mut self) -> impl Iterator<Item = &mut AnnotatedSyllable> {
        self.lines
            .iter_mut()
            .flat_map(|line| line.segments.iter_mut())
            .filter_map(|segment| match segment {
                Segment::Syllable { syllable, .. } => Some(syllable),
                Segment::Text(_) => None,
            })
    }

    /// Set the learner's tone for the `index`th syllable. Returns `false`
    /// when there is no such syllable.
    pub fn assign(&mut self, index: usize, tone: ToneDigit) -> bool {
        match self.syllables_mut().nth(index) {
            Some(syllable) => {
                syllable.assign(tone);
                true
            }
            None => false,
        }
    }

    pub fn score(&self) -> ScoreResult {
        trainer::score(self.syllables())
    }

    pub fn check(&self) -> Vec<Verdict> {
        self.syllables().map(AnnotatedSyllable::verdict).collect()
    }

    pub fn reset(&mut self) {
        self.syllables_mut().for_each(AnnotatedSyllable::clear);
    }

    /// Speakable text of line `line`, if it exists and is not blank.
    pub fn line_text(&self, line: usize) -> Option<String> {
        self.lines
            .get(line)
            .map(DrillLine::text)
            .filter(|text| !text.is_empty())
    }
}
