use alloy::primitives::U256;
use alloy::primitives::utils::format_units;
use anyhow::Result;
use std::str::FromStr;

/// Transfer direction relative to the watched wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Incoming => "IN",
            Direction::Outgoing => "OUT",
        }
    }
}

/// Which directions a deployment alerts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionFilter {
    #[default]
    Both,
    Incoming,
    Outgoing,
}

impl DirectionFilter {
    pub fn allows(&self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Both => true,
            DirectionFilter::Incoming => direction == Direction::Incoming,
            DirectionFilter::Outgoing => direction == Direction::Outgoing,
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(DirectionFilter::Both),
            "incoming" => Ok(DirectionFilter::Incoming),
            "outgoing" => Ok(DirectionFilter::Outgoing),
            other => Err(anyhow::anyhow!(
                "Unrecognized direction filter '{}' (expected both, incoming or outgoing)",
                other
            )),
        }
    }
}

/// One token transfer as reported by the explorer for a (wallet, token)
/// query. Raw values stay as uint256 until the amount is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEvent {
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub raw_value: U256,
    pub token_decimals: u8,
}

impl TransferEvent {
    /// Decimal amount: raw_value scaled down by the token's own exponent.
    /// The exponent comes per-event from the explorer, so two tokens in the
    /// same cycle can scale differently.
    pub fn amount(&self) -> Result<f64> {
        let units = format_units(self.raw_value, self.token_decimals).map_err(|e| {
            anyhow::anyhow!(
                "Cannot scale value {} by 10^{}: {}",
                self.raw_value,
                self.token_decimals,
                e
            )
        })?;

        units
            .parse::<f64>()
            .map_err(|e| anyhow::anyhow!("Unparseable decimal amount '{}': {}", units, e))
    }

    pub fn direction(&self, wallet_address: &str) -> Direction {
        if self.to_address.eq_ignore_ascii_case(wallet_address) {
            Direction::Incoming
        } else {
            Direction::Outgoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(raw_value: &str, token_decimals: u8) -> TransferEvent {
        TransferEvent {
            tx_hash: "0xh1".to_string(),
            from_address: "0xffffffffffffffffffffffffffffffffffffffff".to_string(),
            to_address: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string(),
            raw_value: U256::from_str_radix(raw_value, 10).unwrap(),
            token_decimals,
        }
    }

    #[test]
    fn amount_scales_by_token_decimals() {
        assert_eq!(event("50000000000000000", 18).amount().unwrap(), 0.05);
        assert_eq!(event("1500000", 6).amount().unwrap(), 1.5);
    }

    #[test]
    fn amount_with_zero_decimals_is_the_raw_value() {
        assert_eq!(event("7", 0).amount().unwrap(), 7.0);
    }

    #[test]
    fn amount_handles_values_beyond_u128() {
        // 10^38 raw at 18 decimals
        let e = event("100000000000000000000000000000000000000", 18);
        assert_eq!(e.amount().unwrap(), 1e20);
    }

    #[test]
    fn amount_rejects_absurd_decimal_exponents() {
        assert!(event("1", 200).amount().is_err());
    }

    #[test]
    fn direction_matches_recipient_case_insensitively() {
        let e = event("1", 0);
        assert_eq!(
            e.direction("0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"),
            Direction::Incoming
        );
        assert_eq!(
            e.direction("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"),
            Direction::Outgoing
        );
    }

    #[test]
    fn filter_parses_and_applies() {
        assert_eq!("both".parse::<DirectionFilter>().unwrap(), DirectionFilter::Both);
        assert_eq!(
            "Incoming".parse::<DirectionFilter>().unwrap(),
            DirectionFilter::Incoming
        );
        assert_eq!(
            " OUTGOING ".parse::<DirectionFilter>().unwrap(),
            DirectionFilter::Outgoing
        );
        assert!("sideways".parse::<DirectionFilter>().is_err());

        assert!(DirectionFilter::Both.allows(Direction::Incoming));
        assert!(DirectionFilter::Both.allows(Direction::Outgoing));
        assert!(DirectionFilter::Incoming.allows(Direction::Incoming));
        assert!(!DirectionFilter::Incoming.allows(Direction::Outgoing));
        assert!(!DirectionFilter::Outgoing.allows(Direction::Incoming));
    }
}
