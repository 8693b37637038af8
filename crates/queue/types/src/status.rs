//! Token lifecycle status and the legal-transition table

use serde::{Deserialize, Serialize};

/// Lifecycle state of a token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStatus {
    /// Issued and waiting to be called
    #[default]
    Waiting,
    /// Called to a counter, visitor not yet arrived
    Called,
    /// Visitor is at the counter
    Serving,
    /// Service finished
    Completed,
    /// Visitor did not show up
    NoShow,
}

impl TokenStatus {
    /// Whether `self -> next` is in the transition table.
    ///
    /// Preconditions that need more context (counter occupancy, counter
    /// retention) are checked by the store.
    pub fn can_transition_to(self, next: TokenStatus) -> bool {
        use TokenStatus::*;
        matches!(
            (self, next),
            (Waiting, Called)
                | (Called, Serving)
                | (Called, Completed)
                | (Serving, Completed)
                | (Waiting, NoShow)
                | (Called, NoShow)
        )
    }

    /// Holds a counter (called or serving)
    pub fn is_at_counter(self) -> bool {
        matches!(self, TokenStatus::Called | TokenStatus::Serving)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TokenStatus::Completed | TokenStatus::NoShow)
    }

    /// Secondary key of the "currently serving" view: called before serving.
    pub fn rank(self) -> u8 {
        match self {
            TokenStatus::Waiting => 0,
            TokenStatus::Called => 0,
            TokenStatus::Serving => 1,
            TokenStatus::Completed => 2,
            TokenStatus::NoShow => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenStatus::Waiting => "waiting",
            TokenStatus::Called => "called",
            TokenStatus::Serving => "serving",
            TokenStatus::Completed => "completed",
            TokenStatus::NoShow => "no-show",
        }
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenStatus::*;

    const ALL: [TokenStatus; 5] = [Waiting, Called, Serving, Completed, NoShow];

    #[test]
    fn legal_transitions() {
        assert!(Waiting.can_transition_to(Called));
        assert!(Called.can_transition_to(Serving));
        assert!(Called.can_transition_to(Completed));
        assert!(Serving.can_transition_to(Completed));
        assert!(Waiting.can_transition_to(NoShow));
        assert!(Called.can_transition_to(NoShow));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!NoShow.can_transition_to(next));
        }
    }

    #[test]
    fn no_backward_or_skipping_moves() {
        assert!(!Called.can_transition_to(Waiting));
        assert!(!Serving.can_transition_to(Called));
        assert!(!Serving.can_transition_to(NoShow));
        assert!(!Waiting.can_transition_to(Serving));
        assert!(!Waiting.can_transition_to(Completed));
        for s in ALL {
            assert!(!s.can_transition_to(s), "{s} -> {s} must be rejected");
        }
    }

    #[test]
    fn exactly_six_legal_moves() {
        let legal = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .count();
        assert_eq!(legal, 6);
    }

    #[test]
    fn counter_holding_states() {
        assert!(Called.is_at_counter());
        assert!(Serving.is_at_counter());
        assert!(!Waiting.is_at_counter());
        assert!(!Completed.is_at_counter());
    }

    #[test]
    fn no_show_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&NoShow).unwrap(), "\"no-show\"");
        assert_eq!(NoShow.to_string(), "no-show");
    }
}
