use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A chat model identifier.
///
/// This can be a well-known model or a custom string for anything the
/// service accepts that we have not heard of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Well-known chat models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// gpt-3.5-turbo
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,

    /// gpt-4
    #[serde(rename = "gpt-4")]
    Gpt4,

    /// gpt-4-turbo
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,

    /// gpt-4o
    #[serde(rename = "gpt-4o")]
    Gpt4o,

    /// gpt-4o-mini
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl KnownModel {
    const ALL: [KnownModel; 5] = [
        KnownModel::Gpt35Turbo,
        KnownModel::Gpt4,
        KnownModel::Gpt4Turbo,
        KnownModel::Gpt4o,
        KnownModel::Gpt4oMini,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gpt35Turbo => "gpt-3.5-turbo",
            KnownModel::Gpt4 => "gpt-4",
            KnownModel::Gpt4Turbo => "gpt-4-turbo",
            KnownModel::Gpt4o => "gpt-4o",
            KnownModel::Gpt4oMini => "gpt-4o-mini",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gpt35Turbo)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .into_iter()
            .find(|known| known.as_str() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(s.to_string()),
        })
    }
}
