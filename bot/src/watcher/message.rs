use crate::constants::TX_LINK_BASE;
use crate::models::subscriptions::{TokenWatch, Wallet};
use crate::models::transfers::Direction;

/// Builds the alert text for one qualifying transfer:
///
/// 🔔 IN 0.05 USDT
/// Wallet: savings (0xdac1…1ec7)
/// https://bscscan.com/tx/0x9f2e…
pub fn format_alert(
    wallet: &Wallet,
    watch: &TokenWatch,
    direction: Direction,
    amount: f64,
    tx_hash: &str,
) -> String {
    format!(
        "🔔 {} {} {}\nWallet: {} ({})\n{}{}",
        direction.label(),
        amount,
        watch.token_label,
        wallet.name,
        short_address(&wallet.address),
        TX_LINK_BASE,
        tx_hash,
    )
}

/// Shortens a 0x address to its first and last hex digits for display.
fn short_address(address: &str) -> String {
    if address.is_ascii() && address.len() > 12 {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_a_full_alert() {
        let wallet = Wallet {
            id: 1,
            chat_id: 42,
            name: "savings".to_string(),
            address: "0xdac17f958d2ee523a2206206994597c13d831ec7".to_string(),
            created_at: Utc::now(),
        };
        let watch = TokenWatch {
            id: 1,
            chat_id: 42,
            wallet_name: "savings".to_string(),
            token_contract: "0x1111111111111111111111111111111111111111".to_string(),
            token_label: "USDT".to_string(),
            min_amount: 0.01,
            max_amount: 1.0,
            created_at: Utc::now(),
        };

        let text = format_alert(&wallet, &watch, Direction::Incoming, 0.05, "0x9f2e");
        assert_eq!(
            text,
            "🔔 IN 0.05 USDT\nWallet: savings (0xdac1…1ec7)\nhttps://bscscan.com/tx/0x9f2e"
        );
    }

    #[test]
    fn short_address_keeps_ends() {
        assert_eq!(
            short_address("0xdac17f958d2ee523a2206206994597c13d831ec7"),
            "0xdac1…1ec7"
        );
        assert_eq!(short_address("0x1234"), "0x1234");
    }
}
