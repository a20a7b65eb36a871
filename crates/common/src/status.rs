//! Travel order status machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

/// The status of a travel order in its approval lifecycle.
///
/// State transitions:
/// ```text
/// Requested ──┬──► Approved
///             └──► Canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelOrderStatus {
    /// Submitted by the owner, awaiting a decision.
    #[default]
    Requested,

    /// Approved by an administrator (terminal state).
    Approved,

    /// Canceled by an administrator (terminal state).
    Canceled,
}

/// Error returned when parsing an unknown status value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown travel order status: {0}")]
pub struct ParseStatusError(pub String);

impl TravelOrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TravelOrderStatus; 3] = [
        TravelOrderStatus::Requested,
        TravelOrderStatus::Approved,
        TravelOrderStatus::Canceled,
    ];

    /// Returns true if moving from `self` to `to` is a legal transition.
    ///
    /// Self pairs answer `false`; callers treat them as a no-op before asking.
    pub fn can_transition_to(self, to: TravelOrderStatus) -> bool {
        use TravelOrderStatus::*;

        match (self, to) {
            (Requested, Approved) | (Requested, Canceled) => true,
            (Requested, Requested) => false,
            (Approved, _) | (Canceled, _) => false,
        }
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(self) -> bool {
        matches!(self, TravelOrderStatus::Approved | TravelOrderStatus::Canceled)
    }

    /// Returns the wire value stored in the database and sent over HTTP.
    pub fn as_str(self) -> &'static str {
        match self {
            TravelOrderStatus::Requested => "requested",
            TravelOrderStatus::Approved => "approved",
            TravelOrderStatus::Canceled => "canceled",
        }
    }

    /// Returns the human-readable label for the given locale.
    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, TravelOrderStatus::Requested) => "Requested",
            (Locale::En, TravelOrderStatus::Approved) => "Approved",
            (Locale::En, TravelOrderStatus::Canceled) => "Canceled",
            (Locale::PtBr, TravelOrderStatus::Requested) => "Solicitado",
            (Locale::PtBr, TravelOrderStatus::Approved) => "Aprovado",
            (Locale::PtBr, TravelOrderStatus::Canceled) => "Cancelado",
        }
    }
}

impl FromStr for TravelOrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TravelOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl std::fmt::Display for TravelOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TravelOrderStatus::*;

    #[test]
    fn test_default_status_is_requested() {
        assert_eq!(TravelOrderStatus::default(), Requested);
    }

    #[test]
    fn test_transition_table_is_exhaustive() {
        let legal = [(Requested, Approved), (Requested, Canceled)];

        for from in TravelOrderStatus::ALL {
            for to in TravelOrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!Requested.is_terminal());
        assert!(Approved.is_terminal());
        assert!(Canceled.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_outgoing_transitions() {
        for from in TravelOrderStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(TravelOrderStatus::ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
    }

    #[test]
    fn test_parse_wire_values() {
        assert_eq!("requested".parse::<TravelOrderStatus>(), Ok(Requested));
        assert_eq!("approved".parse::<TravelOrderStatus>(), Ok(Approved));
        assert_eq!("canceled".parse::<TravelOrderStatus>(), Ok(Canceled));
        assert_eq!(
            "cancelled".parse::<TravelOrderStatus>(),
            Err(ParseStatusError("cancelled".to_string()))
        );
        assert!("Approved".parse::<TravelOrderStatus>().is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Approved.label(Locale::En), "Approved");
        assert_eq!(Requested.label(Locale::PtBr), "Solicitado");
        assert_eq!(Canceled.label(Locale::PtBr), "Cancelado");
    }

    #[test]
    fn test_serialization_uses_wire_value() {
        assert_eq!(serde_json::to_string(&Canceled).unwrap(), "\"canceled\"");
        let parsed: TravelOrderStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, Approved);
    }
}
