//! Common types for the causal clock boundary layer.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};

/// Identifier of a simulated process (participant).
///
/// Process ids are 1-based (`P1`, `P2`, ...) so they read the same way in
/// scripts, logs and snapshots. Zero is not a valid id and cannot be
/// constructed or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ProcessId(u32);

impl ProcessId {
    /// Creates a process id from its 1-based number.
    pub fn new(number: u32) -> Result<Self, ParseError> {
        if number == 0 {
            return Err(ParseError::process(number));
        }
        Ok(Self(number))
    }

    /// Creates a process id from a 0-based clock index.
    pub fn from_index(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// Returns the 1-based process number.
    pub fn number(&self) -> u32 {
        self.0
    }

    /// Returns the 0-based index of this process inside a clock.
    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    /// Returns ids `P1..=Pn` in order.
    pub fn range(count: usize) -> impl Iterator<Item = ProcessId> {
        (0..count).map(ProcessId::from_index)
    }
}

impl TryFrom<u32> for ProcessId {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProcessId> for u32 {
    fn from(id: ProcessId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl std::str::FromStr for ProcessId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('P')
            .or_else(|| s.strip_prefix('p'))
            .unwrap_or(s);
        let number: u32 = digits.parse().map_err(|_| ParseError::process(s))?;
        Self::new(number)
    }
}

/// Reference to a message by its send order.
///
/// Send events are numbered `#1, #2, ...` in script order. Every copy of a
/// broadcast shares the reference of the send that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub u32);

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The clock discipline the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discipline {
    /// Vector clocks, broadcast, CBCAST delivery (Birman-Schiper-Stephenson)
    VectorBss,

    /// Vector clocks, receiver increments on delivery (Schiper-Eggli-Sandoz)
    VectorSes,

    /// Matrix clocks tracking pairwise knowledge
    Matrix,
}

impl Discipline {
    /// Returns every discipline.
    pub fn all() -> Vec<Discipline> {
        vec![Discipline::VectorBss, Discipline::VectorSes, Discipline::Matrix]
    }

    /// Returns the discipline tag.
    pub fn name(&self) -> &'static str {
        match self {
            Discipline::VectorBss => "vector-bss",
            Discipline::VectorSes => "vector-ses",
            Discipline::Matrix => "matrix",
        }
    }

    /// Returns a one-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Discipline::VectorBss => "Vector clocks, causal broadcast, no increment on receipt",
            Discipline::VectorSes => "Vector clocks, receiver increments on delivery",
            Discipline::Matrix => "N x N matrix clocks, row-wise merge on receipt",
        }
    }

    /// Returns true for the disciplines that carry a vector clock.
    pub fn is_vector(&self) -> bool {
        matches!(self, Discipline::VectorBss | Discipline::VectorSes)
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Discipline {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector-bss" | "vector_bss" | "bss" => Ok(Discipline::VectorBss),
            "vector-ses" | "vector_ses" | "ses" => Ok(Discipline::VectorSes),
            "matrix" | "matrix-clock" => Ok(Discipline::Matrix),
            _ => Err(ParseError::discipline(s)),
        }
    }
}

/// Lifecycle phase of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Fresh or just reset, no event applied yet
    Initial,

    /// At least one event applied, script not exhausted
    Running,

    /// Script cursor reached the end
    Completed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Initial => "initial",
            Phase::Running => "running",
            Phase::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_is_one_based() {
        let p1 = ProcessId::from_index(0);
        assert_eq!(p1.number(), 1);
        assert_eq!(p1.index(), 0);
        assert_eq!(p1.to_string(), "P1");
    }

    #[test]
    fn test_process_id_rejects_zero() {
        assert!(ProcessId::new(0).is_err());
        assert!("P0".parse::<ProcessId>().is_err());
        assert!(serde_json::from_str::<ProcessId>("0").is_err());
    }

    #[test]
    fn test_process_id_parse() {
        assert_eq!("P3".parse::<ProcessId>().unwrap().number(), 3);
        assert_eq!("2".parse::<ProcessId>().unwrap().number(), 2);
        assert!("W1x".parse::<ProcessId>().is_err());
    }

    #[test]
    fn test_discipline_round_trips_through_its_tag() {
        for discipline in Discipline::all() {
            assert_eq!(discipline.name().parse::<Discipline>().unwrap(), discipline);
            let json = serde_json::to_string(&discipline).unwrap();
            assert_eq!(json, format!("\"{}\"", discipline.name()));
        }
    }

    #[test]
    fn test_discipline_aliases() {
        assert_eq!("BSS".parse::<Discipline>().unwrap(), Discipline::VectorBss);
        assert_eq!("ses".parse::<Discipline>().unwrap(), Discipline::VectorSes);
        assert!("lamport".parse::<Discipline>().is_err());
    }
}
