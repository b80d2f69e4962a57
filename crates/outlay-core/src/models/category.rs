//! Expense categories offered by entry forms

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of categories presented to users.
///
/// Persistence keeps the category as free text, so records may carry values
/// outside this set (e.g. written by another client).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Entertainment,
    Shopping,
    Other,
}

impl Category {
    pub const ALL: [Self; 6] = [
        Self::Food,
        Self::Transport,
        Self::Utilities,
        Self::Entertainment,
        Self::Shopping,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Transport => "Transport",
            Self::Utilities => "Utilities",
            Self::Entertainment => "Entertainment",
            Self::Shopping => "Shopping",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let options = Self::ALL.map(Self::as_str).join(", ");
                format!("unknown category '{trimmed}' (expected one of: {options})")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("food".parse::<Category>().unwrap(), Category::Food);
        assert_eq!(" SHOPPING ".parse::<Category>().unwrap(), Category::Shopping);
    }

    #[test]
    fn rejects_unknown_category_with_options() {
        let error = "Travel".parse::<Category>().unwrap_err();
        assert!(error.contains("Travel"));
        assert!(error.contains("Utilities"));
    }
}
