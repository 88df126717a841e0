//! Tone digits and diacritic placement for pinyin syllables.
//!
//! [`apply_tone`] takes a toneless syllable such as `"zhong"` and a
//! [`ToneDigit`] and produces the marked form (`"zhōng"`). Exactly one vowel
//! receives the mark, chosen by the usual orthographic precedence:
//!
//! 1. `a` if present
//! 2. else `e`
//! 3. else `o` of `ou`
//! 4. else `u` of `iu`
//! 5. else `i` of `ui`
//! 6. else the last vowel of the syllable
//!
//! Neutral tone, missing tone and blank input all return the base unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical umlaut-u.
pub const UMLAUT_U: char = 'ü';

const VOWELS: [char; 6] = ['a', 'e', 'o', 'i', 'u', UMLAUT_U];

/// Per-vowel forms indexed by tone number; index 0 is the bare vowel.
const TONE_MARKS: [(char, [char; 5]); 6] = [
    ('a', ['a', 'ā', 'á', 'ǎ', 'à']),
    ('e', ['e', 'ē', 'é', 'ě', 'è']),
    ('i', ['i', 'ī', 'í', 'ǐ', 'ì']),
    ('o', ['o', 'ō', 'ó', 'ǒ', 'ò']),
    ('u', ['u', 'ū', 'ú', 'ǔ', 'ù']),
    (UMLAUT_U, [UMLAUT_U, 'ǖ', 'ǘ', 'ǚ', 'ǜ']),
];

/// A Mandarin tone. `Neutral` covers both 5 and 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ToneDigit {
    First,
    Second,
    Third,
    Fourth,
    Neutral,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid tone value {0:?}, expected 0-5")]
pub struct ToneParseError(pub String);

impl ToneDigit {
    pub const ALL: [ToneDigit; 5] = [
        ToneDigit::First,
        ToneDigit::Second,
        ToneDigit::Third,
        ToneDigit::Fourth,
        ToneDigit::Neutral,
    ];

    /// Map a numeric tone. 0 and 5 are neutral; anything else is rejected.
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(ToneDigit::First),
            2 => Some(ToneDigit::Second),
            3 => Some(ToneDigit::Third),
            4 => Some(ToneDigit::Fourth),
            0 | 5 => Some(ToneDigit::Neutral),
            _ => None,
        }
    }

    /// Parse leniently: malformed values become `Neutral`.
    pub fn coerce(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|err: ToneParseError| {
            log::debug!("{err}; treating as neutral tone");
            ToneDigit::Neutral
        })
    }

    /// Tone number in the 1-5 convention.
    pub fn number(self) -> u8 {
        match self {
            ToneDigit::First => 1,
            ToneDigit::Second => 2,
            ToneDigit::Third => 3,
            ToneDigit::Fourth => 4,
            ToneDigit::Neutral => 5,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == ToneDigit::Neutral
    }

    /// Index into the diacritic tables. Neutral maps to the bare vowel.
    fn mark_index(self) -> usize {
        match self {
            ToneDigit::Neutral => 0,
            other => other.number() as usize,
        }
    }
}

impl fmt::Display for ToneDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for ToneDigit {
    type Err = ToneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(ToneDigit::Neutral);
        }
        trimmed
            .parse::<i64>()
            .ok()
            .and_then(ToneDigit::from_number)
            .ok_or_else(|| ToneParseError(s.to_string()))
    }
}

impl TryFrom<u8> for ToneDigit {
    type Error = ToneParseError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        ToneDigit::from_number(n as i64).ok_or_else(|| ToneParseError(n.to_string()))
    }
}

impl From<ToneDigit> for u8 {
    fn from(tone: ToneDigit) -> u8 {
        tone.number()
    }
}

/// How a reading is displayed outside the drill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToneStyle {
    /// Diacritics, e.g. `zhōng`.
    #[default]
    Marks,
    /// Trailing tone number, e.g. `zhong1`.
    Numbers,
    /// No tone information, e.g. `zhong`.
    Plain,
}

/// Rewrite the accepted umlaut spellings (`u:`, `v`) as `ü`.
pub fn normalize_umlaut(syllable: &str) -> String {
    let mut out = String::with_capacity(syllable.len());
    let mut chars = syllable.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            'v' | 'V' => out.push(UMLAUT_U),
            'u' | 'U' if chars.peek() == Some(&':') => {
                chars.next();
                out.push(UMLAUT_U);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Split a marked vowel into its bare form and tone, if it carries one.
fn unmark_vowel(ch: char) -> Option<(char, ToneDigit)> {
    TONE_MARKS.iter().find_map(|(bare, forms)| {
        forms
            .iter()
            .skip(1)
            .position(|&form| form == ch)
            .and_then(|idx| ToneDigit::from_number(idx as i64 + 1))
            .map(|tone| (*bare, tone))
    })
}

fn marked_vowel(vowel: char, tone: ToneDigit) -> char {
    TONE_MARKS
        .iter()
        .find(|(bare, _)| *bare == vowel)
        .map(|(_, forms)| forms[tone.mark_index()])
        .unwrap_or(vowel)
}

/// Remove tone marks, returning the bare syllable and the first tone found.
pub fn strip_tone(syllable: &str) -> (String, Option<ToneDigit>) {
    let mut tone = None;
    let bare = syllable
        .chars()
        .map(|ch| match unmark_vowel(ch) {
            Some((bare, found)) => {
                tone = tone.or(Some(found));
                bare
            }
            None => ch,
        })
        .collect();
    (bare, tone)
}

/// Pick the vowel that carries the tone mark.
fn tone_vowel(syllable: &str) -> Option<char> {
    if syllable.contains('a') {
        Some('a')
    } else if syllable.contains('e') {
        Some('e')
    } else if syllable.contains("ou") {
        Some('o')
    } else if syllable.contains("iu") {
        Some('u')
    } else if syllable.contains("ui") {
        Some('i')
    } else {
        syllable.chars().rev().find(|ch| VOWELS.contains(ch))
    }
}

/// Apply `tone` to a toneless `base` syllable.
///
/// The base is lowercased, umlaut spellings are normalized and any existing
/// marks are stripped before the vowel search, so applying a tone to an
/// already-marked syllable replaces its mark instead of stacking a second one.
pub fn apply_tone(base: &str, tone: Option<ToneDigit>) -> String {
    let tone = match tone {
        Some(tone) if !tone.is_neutral() => tone,
        _ => return base.to_string(),
    };
    if base.trim().is_empty() {
        return base.to_string();
    }

    let (syllable, _) = strip_tone(&normalize_umlaut(&base.to_lowercase()));
    let Some(vowel) = tone_vowel(&syllable) else {
        return syllable;
    };

    let mut marked = String::with_capacity(syllable.len() + 2);
    let mut done = false;
    for ch in syllable.chars() {
        if !done && ch == vowel {
            marked.push(marked_vowel(ch, tone));
            done = true;
        } else {
            marked.push(ch);
        }
    }
    marked
}
