//! Linear-order constraint between a component and the target it is being
//! matched against (spec §4.1 `Order`).

use serde::{Deserialize, Serialize};
use syncoll_core::{SyncollError, SyncollResult, Token};

/// Constrains the relative sentence position (`int_id`) of two tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// The parent (`from`) must precede the child (`to`): `parent.int_id <
    /// child.int_id`.
    FromTo,
    /// The parent (`from`) must follow the child (`to`): `parent.int_id >
    /// child.int_id`.
    ToFrom,
    /// No constraint.
    Any,
}

impl Order {
    /// Parses the two-character order code used in structure files: `10`
    /// (before), `01` (after), `00` (either).
    pub fn parse(code: &str) -> SyncollResult<Self> {
        match code {
            "10" => Ok(Order::FromTo),
            "01" => Ok(Order::ToFrom),
            "00" => Ok(Order::Any),
            other => Err(SyncollError::structure_load(
                "order",
                format!("unrecognized order code '{other}'"),
            )),
        }
    }

    /// True when `from_tok` may stand in the `from` role relative to
    /// `to_tok` under this constraint.
    pub fn matches(&self, from_tok: &Token, to_tok: &Token) -> bool {
        match self {
            Order::FromTo => from_tok.int_id < to_tok.int_id,
            Order::ToFrom => from_tok.int_id > to_tok.int_id,
            Order::Any => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncoll_core::Tag;

    fn tok(int_id: i64) -> Token {
        Token::new("x", "x", "s1", int_id.to_string(), int_id, false, Tag::Compact("Npmsn".into()))
    }

    #[test]
    fn parses_known_codes() {
        assert_eq!(Order::parse("10").unwrap(), Order::FromTo);
        assert_eq!(Order::parse("01").unwrap(), Order::ToFrom);
        assert_eq!(Order::parse("00").unwrap(), Order::Any);
        assert!(Order::parse("xx").is_err());
    }

    #[test]
    fn from_to_requires_strictly_earlier_position() {
        assert!(Order::FromTo.matches(&tok(1), &tok(2)));
        assert!(!Order::FromTo.matches(&tok(2), &tok(1)));
        assert!(!Order::FromTo.matches(&tok(2), &tok(2)));
    }

    #[test]
    fn any_always_matches() {
        assert!(Order::Any.matches(&tok(5), &tok(1)));
    }
}
