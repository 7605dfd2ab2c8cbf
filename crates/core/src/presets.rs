use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Named system messages offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemPreset {
    /// Generic assistant prompt
    Default,
    /// Asks reasoning models to skip their thinking phase (default)
    #[default]
    NoThink,
}

impl SystemPreset {
    pub const VALUES: &[SystemPreset] = &[SystemPreset::NoThink, SystemPreset::Default];

    pub fn all() -> &'static [SystemPreset] {
        Self::VALUES
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemPreset::Default => "default",
            SystemPreset::NoThink => "no-think",
        }
    }

    /// The system message text this preset stands for
    pub fn message(&self) -> &'static str {
        match self {
            SystemPreset::Default => "You are a helpful assistant.",
            SystemPreset::NoThink => "/no_think",
        }
    }

    /// Resolve a preset name to its message; unknown names give an empty message
    pub fn message_for(name: &str) -> &'static str {
        name.parse::<SystemPreset>().map(|p| p.message()).unwrap_or("")
    }
}

impl std::fmt::Display for SystemPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SystemPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(SystemPreset::Default),
            "no-think" | "/no_think" => Ok(SystemPreset::NoThink),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}
