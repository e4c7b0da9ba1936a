//! Status module - lifecycle stages for items

/// Status in the item lifecycle
///
/// Items move through a small state machine:
/// - NotDone: initial state, freely editable
/// - Done: completed; may be reverted to NotDone
/// - PastDue: terminal, reached only through the past-due sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Open item
    NotDone,

    /// Completed item
    Done,

    /// Overdue item expired by the sweep (terminal)
    PastDue,
}

impl Status {
    /// Every status, in lifecycle order
    pub const ALL: [Status; 3] = [Status::NotDone, Status::Done, Status::PastDue];

    /// Get the canonical wire/storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotDone => "NOT_DONE",
            Status::Done => "DONE",
            Status::PastDue => "PAST_DUE",
        }
    }

    /// Parse a canonical status name; case and whitespace must match exactly
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_DONE" => Some(Status::NotDone),
            "DONE" => Some(Status::Done),
            "PAST_DUE" => Some(Status::PastDue),
            _ => None,
        }
    }

    /// Whether no further mutation is allowed in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::PastDue)
    }

    /// Whether a client may request a move from `self` to `target`
    ///
    /// `PastDue` can neither be left nor requested; only the sweep sets it.
    pub fn can_request(&self, target: Status) -> bool {
        !self.is_terminal() && target != Status::PastDue
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid status value: {}", s))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_only_canonical_names_parse(index in 0usize..3) {
            let status = Status::ALL[index];
            prop_assert_eq!(Status::parse(status.as_str()), Some(status));
            prop_assert_eq!(Status::parse(&status.as_str().to_lowercase()), None);
        }

        #[test]
        fn test_unknown_names_rejected(name in "[A-Za-z_]{1,12}") {
            prop_assume!(!["DONE", "NOT_DONE", "PAST_DUE"].contains(&name.as_str()));
            prop_assert!(name.parse::<Status>().is_err());
        }
    }
}
