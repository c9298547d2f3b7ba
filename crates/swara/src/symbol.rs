use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Labels of the twelve chromatic scale degrees, starting at Sa.
pub const SCALE_DEGREES: [&str; 12] = [
    "Sa", "Ri(1)", "Ri(2)", "Ga(1)", "Ga(2)", "Ma(1)", "Ma(2)", "Pa", "Da(1)", "Da(2)", "Ni(1)",
    "Ni(2)",
];

pub const REST_LABEL: &str = "Rest";

/// One quantized slot: a scale degree in an octave, or silence.
///
/// Serializes as its label (`"Sa0"`, `"Ni(2)-1"`, `"Rest"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Note { degree: u8, octave: i32 },
    Rest,
}

impl Symbol {
    /// Note at `semitone` semitones above Sa0. Negative values land in
    /// negative octaves with a non-negative degree.
    pub fn from_semitone(semitone: i64) -> Self {
        Symbol::Note {
            degree: semitone.rem_euclid(12) as u8,
            octave: semitone.div_euclid(12) as i32,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, Symbol::Rest)
    }

    /// Semitones above Sa0, `None` for a rest.
    pub fn semitone(&self) -> Option<i64> {
        match self {
            Symbol::Note { degree, octave } => Some(*octave as i64 * 12 + *degree as i64),
            Symbol::Rest => None,
        }
    }

    pub fn degree_name(&self) -> Option<&'static str> {
        match self {
            Symbol::Note { degree, .. } => SCALE_DEGREES.get(*degree as usize).copied(),
            Symbol::Rest => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Note { degree, octave } => {
                let name = SCALE_DEGREES.get(*degree as usize).copied().unwrap_or("?");
                write!(f, "{}{}", name, octave)
            }
            Symbol::Rest => f.write_str(REST_LABEL),
        }
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == REST_LABEL {
            return Ok(Symbol::Rest);
        }

        SCALE_DEGREES
            .iter()
            .enumerate()
            .find_map(|(degree, name)| {
                let octave = s.strip_prefix(name)?.parse::<i32>().ok()?;
                Some(Symbol::Note {
                    degree: degree as u8,
                    octave,
                })
            })
            .ok_or_else(|| Error::InvalidSymbol(s.to_string()))
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
