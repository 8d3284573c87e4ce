use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional tag attached to a response, echoed to the client as `mood`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excited,
    Hungry,
    Suspicious,
    Sassy,
    Sleepy,
    Dramatic,
    Chaotic,
    Busted,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Excited => "excited",
            Mood::Hungry => "hungry",
            Mood::Suspicious => "suspicious",
            Mood::Sassy => "sassy",
            Mood::Sleepy => "sleepy",
            Mood::Dramatic => "dramatic",
            Mood::Chaotic => "chaotic",
            Mood::Busted => "busted",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pre-authored translation bundle.
///
/// ## Fields:
/// - `display_name`: Headline shown to the user (e.g. "Sassy Cat 🐱")
/// - `dialog_text`: The "translated" line
/// - `image_ref` / `audio_ref`: URIs of media hosted elsewhere
/// - `mood`: Tag the client uses for styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseVariant {
    pub display_name: String,
    #[serde(rename = "dialog")]
    pub dialog_text: String,
    #[serde(rename = "image")]
    pub image_ref: String,
    #[serde(rename = "audio")]
    pub audio_ref: String,
    pub mood: Mood,
}

impl ResponseVariant {
    /// Names of required text fields that are blank.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("display_name", &self.display_name),
            ("dialog", &self.dialog_text),
            ("image", &self.image_ref),
            ("audio", &self.audio_ref),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
