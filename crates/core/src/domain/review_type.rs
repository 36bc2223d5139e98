use std::fmt;

use serde::{Deserialize, Serialize};

/// Which review list the home tab shows. Never stored; the home view's selector reports
/// the current value back on every interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewType {
    #[default]
    Author,
    Participant,
    /// No option selected yet. Lists fall back to `Author`.
    Undefined,
}

impl ReviewType {
    pub const SELECTABLE: [ReviewType; 2] = [ReviewType::Author, ReviewType::Participant];

    /// Value carried by the selector option.
    pub fn value(self) -> &'static str {
        match self {
            Self::Author => "Author",
            Self::Participant => "Participant",
            Self::Undefined => "Undefined",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Author => "I'm author",
            Self::Participant => "I'm participant",
            Self::Undefined => "Not selected",
        }
    }

    /// Mode used for a list query: `Undefined` behaves as `Author`.
    pub fn effective(self) -> Self {
        match self {
            Self::Undefined => Self::Author,
            selected => selected,
        }
    }

    /// Derives the mode from the selector's reported value. `None` means nothing was
    /// selected and defaults to `Author`; an unrecognized value is `None`.
    pub fn from_selection(selected: Option<&str>) -> Option<Self> {
        let Some(raw) = selected else {
            return Some(Self::Author);
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "author" => Some(Self::Author),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }

    /// Swarm query parameter that filters the list for this mode.
    pub fn query_parameter(self) -> &'static str {
        match self.effective() {
            Self::Participant => "participants",
            _ => "author",
        }
    }
}

impl fmt::Display for ReviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}
