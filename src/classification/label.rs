//! # Classification Labels
//!
//! The closed vocabulary every classifier answers with. Nothing outside these
//! five values ever leaves the classification stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of classifying one audio submission.
///
/// ## Ordering:
/// `Ord` follows declaration order, so catalog statistics and label listings
/// come out as dog, cat, bird, mosquito, human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Dog,
    Cat,
    Bird,
    Mosquito,
    Human,
}

impl Label {
    /// Every label, in declaration order.
    pub const ALL: [Label; 5] = [
        Label::Dog,
        Label::Cat,
        Label::Bird,
        Label::Mosquito,
        Label::Human,
    ];

    /// The labels the heuristic picks from once a human has been ruled out.
    pub const ANIMALS: [Label; 4] = [Label::Dog, Label::Cat, Label::Bird, Label::Mosquito];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Dog => "dog",
            Label::Cat => "cat",
            Label::Bird => "bird",
            Label::Mosquito => "mosquito",
            Label::Human => "human",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(Label::Dog),
            "cat" => Ok(Label::Cat),
            "bird" => Ok(Label::Bird),
            "mosquito" => Ok(Label::Mosquito),
            "human" => Ok(Label::Human),
            other => Err(format!("Unknown label: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!("dog".parse::<Label>(), Ok(Label::Dog));
        assert_eq!(" Mosquito ".parse::<Label>(), Ok(Label::Mosquito));
        assert!("hamster".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_round_trips_through_display() {
        for label in Label::ALL {
            assert_eq!(label.to_string().parse::<Label>(), Ok(label));
        }
    }

    #[test]
    fn test_label_serializes_lowercase() {
        let json = serde_json::to_string(&Label::Mosquito).unwrap();
        assert_eq!(json, "\"mosquito\"");
    }

    #[test]
    fn test_animals_exclude_human() {
        assert!(!Label::ANIMALS.contains(&Label::Human));
        assert_eq!(Label::ANIMALS.len() + 1, Label::ALL.len());
    }
}
