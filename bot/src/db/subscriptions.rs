use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::constants::{DEFAULT_MAX_AMOUNT, DEFAULT_MIN_AMOUNT, MAX_WALLETS_PER_USER};
use crate::models::subscriptions::{TokenWatch, Wallet, WatchPair, normalize_address};

/// Registers a named wallet for a user, enforcing the per-user cap.
pub async fn add_wallet(
    pool: &SqlitePool,
    chat_id: i64,
    name: &str,
    address: &str,
) -> Result<Wallet> {
    let address = normalize_address(address)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow::anyhow!("Wallet name cannot be empty"));
    }

    // Cap check and insert share one transaction so concurrent adds for
    // the same user cannot both pass the check
    let mut tx = pool.begin().await?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM wallets WHERE chat_id = ?")
        .bind(chat_id)
        .fetch_one(&mut *tx)
        .await?;
    if count >= MAX_WALLETS_PER_USER {
        return Err(anyhow::anyhow!(
            "Wallet limit reached ({} per user)",
            MAX_WALLETS_PER_USER
        ));
    }

    let wallet = sqlx::query_as::<_, Wallet>(
        "INSERT INTO wallets (chat_id, name, address, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(chat_id)
    .bind(name)
    .bind(&address)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(wallet)
}

/// Removes a wallet, every watch bound to it, and the notified ledger rows
/// for its address. Returns false when the wallet did not exist.
pub async fn remove_wallet(pool: &SqlitePool, chat_id: i64, name: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let wallet =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE chat_id = ? AND name = ?")
            .bind(chat_id)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;
    let wallet = match wallet {
        Some(wallet) => wallet,
        None => return Ok(false),
    };

    sqlx::query("DELETE FROM wallets WHERE id = ?")
        .bind(wallet.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM watches WHERE chat_id = ? AND wallet_name = ?")
        .bind(chat_id)
        .bind(name)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM notified WHERE chat_id = ? AND wallet_address = ?")
        .bind(chat_id)
        .bind(&wallet.address)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn list_wallets(pool: &SqlitePool, chat_id: i64) -> Result<Vec<Wallet>> {
    let wallets =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE chat_id = ? ORDER BY id")
            .bind(chat_id)
            .fetch_all(pool)
            .await?;

    Ok(wallets)
}

pub async fn get_wallet(pool: &SqlitePool, chat_id: i64, name: &str) -> Result<Option<Wallet>> {
    let wallet =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE chat_id = ? AND name = ?")
            .bind(chat_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;

    Ok(wallet)
}

/// Adds a token watch on one of the user's wallets. Missing range bounds
/// fall back to the wide-open default range.
pub async fn add_watch(
    pool: &SqlitePool,
    chat_id: i64,
    wallet_name: &str,
    token_contract: &str,
    token_label: &str,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
) -> Result<TokenWatch> {
    let token_contract = normalize_address(token_contract)?;
    let token_label = token_label.trim();
    if token_label.is_empty() {
        return Err(anyhow::anyhow!("Token label cannot be empty"));
    }

    let min_amount = min_amount.unwrap_or(DEFAULT_MIN_AMOUNT);
    let max_amount = max_amount.unwrap_or(DEFAULT_MAX_AMOUNT);
    validate_range(min_amount, max_amount)?;

    if get_wallet(pool, chat_id, wallet_name).await?.is_none() {
        return Err(anyhow::anyhow!(
            "User {} has no wallet named '{}'",
            chat_id,
            wallet_name
        ));
    }

    let watch = sqlx::query_as::<_, TokenWatch>(
        "INSERT INTO watches (chat_id, wallet_name, token_contract, token_label, min_amount, max_amount, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(chat_id)
    .bind(wallet_name)
    .bind(&token_contract)
    .bind(token_label)
    .bind(min_amount)
    .bind(max_amount)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(watch)
}

/// Updates the alert range of an existing watch, addressed by wallet name
/// and token label.
pub async fn set_watch_range(
    pool: &SqlitePool,
    chat_id: i64,
    wallet_name: &str,
    token_label: &str,
    min_amount: f64,
    max_amount: f64,
) -> Result<()> {
    validate_range(min_amount, max_amount)?;

    let updated = sqlx::query(
        "UPDATE watches SET min_amount = ?, max_amount = ?
         WHERE chat_id = ? AND wallet_name = ? AND token_label = ?",
    )
    .bind(min_amount)
    .bind(max_amount)
    .bind(chat_id)
    .bind(wallet_name)
    .bind(token_label)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(anyhow::anyhow!(
            "No watch for '{}' on wallet '{}'",
            token_label,
            wallet_name
        ));
    }

    Ok(())
}

/// Removes a watch and the notified ledger rows for its (wallet, token)
/// pair. Returns false when nothing matched.
pub async fn remove_watch(
    pool: &SqlitePool,
    chat_id: i64,
    wallet_name: &str,
    token_label: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let watches = sqlx::query_as::<_, TokenWatch>(
        "SELECT * FROM watches WHERE chat_id = ? AND wallet_name = ? AND token_label = ?",
    )
    .bind(chat_id)
    .bind(wallet_name)
    .bind(token_label)
    .fetch_all(&mut *tx)
    .await?;
    if watches.is_empty() {
        return Ok(false);
    }

    sqlx::query("DELETE FROM watches WHERE chat_id = ? AND wallet_name = ? AND token_label = ?")
        .bind(chat_id)
        .bind(wallet_name)
        .bind(token_label)
        .execute(&mut *tx)
        .await?;

    let wallet =
        sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE chat_id = ? AND name = ?")
            .bind(chat_id)
            .bind(wallet_name)
            .fetch_optional(&mut *tx)
            .await?;
    if let Some(wallet) = wallet {
        for watch in &watches {
            sqlx::query(
                "DELETE FROM notified WHERE chat_id = ? AND wallet_address = ? AND token_contract = ?",
            )
            .bind(chat_id)
            .bind(&wallet.address)
            .bind(&watch.token_contract)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(true)
}

pub async fn list_watches(pool: &SqlitePool, chat_id: i64) -> Result<Vec<TokenWatch>> {
    let watches =
        sqlx::query_as::<_, TokenWatch>("SELECT * FROM watches WHERE chat_id = ? ORDER BY id")
            .bind(chat_id)
            .fetch_all(pool)
            .await?;

    Ok(watches)
}

pub async fn list_chat_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT DISTINCT chat_id FROM wallets ORDER BY chat_id")
        .fetch_all(pool)
        .await?;

    Ok(ids)
}

/// Full read-only snapshot for one watch cycle: every watch joined to its
/// wallet, in stable store order. Watches whose wallet is gone are dropped.
pub async fn snapshot(pool: &SqlitePool) -> Result<Vec<WatchPair>> {
    let wallets = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets ORDER BY chat_id, id")
        .fetch_all(pool)
        .await?;
    let watches = sqlx::query_as::<_, TokenWatch>("SELECT * FROM watches ORDER BY chat_id, id")
        .fetch_all(pool)
        .await?;

    let by_name: HashMap<(i64, String), Wallet> = wallets
        .into_iter()
        .map(|w| ((w.chat_id, w.name.clone()), w))
        .collect();

    let mut pairs = Vec::with_capacity(watches.len());
    for watch in watches {
        match by_name.get(&(watch.chat_id, watch.wallet_name.clone())) {
            Some(wallet) => pairs.push(WatchPair {
                wallet: wallet.clone(),
                watch,
            }),
            None => debug!(
                "Dropping watch {} ({} on '{}'): wallet no longer exists",
                watch.id, watch.token_label, watch.wallet_name
            ),
        }
    }

    Ok(pairs)
}

fn validate_range(min_amount: f64, max_amount: f64) -> Result<()> {
    if min_amount.is_nan() || max_amount.is_nan() {
        return Err(anyhow::anyhow!("Amounts must be numbers"));
    }
    if min_amount < 0.0 || max_amount < 0.0 {
        return Err(anyhow::anyhow!("Amounts must be non-negative"));
    }
    if min_amount > max_amount {
        return Err(anyhow::anyhow!(
            "min_amount {} exceeds max_amount {}",
            min_amount,
            max_amount
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::db::notified::{load_notified_sets, record_notified};
    use crate::models::subscriptions::WatchKey;
    use sqlx::sqlite::SqlitePoolOptions;

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const TOKEN: &str = "0x1111111111111111111111111111111111111111";

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn add_wallet_normalizes_and_lists() {
        let pool = test_pool().await;
        let wallet = add_wallet(&pool, 1, "savings", "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
            .await
            .unwrap();
        assert_eq!(wallet.address, ADDR_A);

        let wallets = list_wallets(&pool, 1).await.unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].name, "savings");
    }

    #[tokio::test]
    async fn wallet_cap_is_enforced_per_user() {
        let pool = test_pool().await;
        for i in 0..MAX_WALLETS_PER_USER {
            let address = format!("0x{:040x}", i + 1);
            add_wallet(&pool, 1, &format!("w{}", i), &address).await.unwrap();
        }

        let overflow = format!("0x{:040x}", 99);
        assert!(add_wallet(&pool, 1, "extra", &overflow).await.is_err());
        // The rejected add rolled back without a partial row
        assert_eq!(
            list_wallets(&pool, 1).await.unwrap().len(),
            MAX_WALLETS_PER_USER as usize
        );
        // Another user still has room
        assert!(add_wallet(&pool, 2, "w0", &overflow).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_wallet_names_or_addresses_are_rejected() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        assert!(add_wallet(&pool, 1, "savings", ADDR_B).await.is_err());
        assert!(add_wallet(&pool, 1, "other", ADDR_A).await.is_err());
        // Same name and address under another user are fine
        assert!(add_wallet(&pool, 2, "savings", ADDR_A).await.is_ok());
    }

    #[tokio::test]
    async fn watch_requires_existing_wallet() {
        let pool = test_pool().await;
        assert!(
            add_watch(&pool, 1, "ghost", TOKEN, "TKN", None, None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn watch_defaults_and_range_validation() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();

        let watch = add_watch(&pool, 1, "savings", TOKEN, "TKN", None, None)
            .await
            .unwrap();
        assert_eq!(watch.min_amount, DEFAULT_MIN_AMOUNT);
        assert_eq!(watch.max_amount, DEFAULT_MAX_AMOUNT);
        assert_eq!(watch.token_contract, TOKEN);

        let other = "0x2222222222222222222222222222222222222222";
        assert!(
            add_watch(&pool, 1, "savings", other, "BAD", Some(5.0), Some(1.0))
                .await
                .is_err()
        );
        assert!(
            add_watch(&pool, 1, "savings", other, "BAD", Some(-1.0), None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn set_range_and_remove_watch() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        add_watch(&pool, 1, "savings", TOKEN, "TKN", None, None)
            .await
            .unwrap();

        set_watch_range(&pool, 1, "savings", "TKN", 0.5, 2.0)
            .await
            .unwrap();
        let watches = list_watches(&pool, 1).await.unwrap();
        assert_eq!(watches[0].min_amount, 0.5);
        assert_eq!(watches[0].max_amount, 2.0);

        assert!(
            set_watch_range(&pool, 1, "savings", "NOPE", 0.0, 1.0)
                .await
                .is_err()
        );

        assert!(remove_watch(&pool, 1, "savings", "TKN").await.unwrap());
        assert!(!remove_watch(&pool, 1, "savings", "TKN").await.unwrap());
    }

    #[tokio::test]
    async fn remove_wallet_cascades_watches() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        add_watch(&pool, 1, "savings", TOKEN, "TKN", None, None)
            .await
            .unwrap();

        assert!(remove_wallet(&pool, 1, "savings").await.unwrap());
        assert!(!remove_wallet(&pool, 1, "savings").await.unwrap());
        assert!(list_watches(&pool, 1).await.unwrap().is_empty());
        assert!(snapshot(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_wallet_clears_its_ledger_rows() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        add_watch(&pool, 1, "savings", TOKEN, "TKN", None, None)
            .await
            .unwrap();

        let mut updates = HashMap::new();
        updates.insert(WatchKey::new(1, ADDR_A, TOKEN), vec!["0xh1".to_string()]);
        record_notified(&pool, &updates, 100).await.unwrap();

        assert!(remove_wallet(&pool, 1, "savings").await.unwrap());
        assert!(load_notified_sets(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_watch_clears_only_its_ledger_rows() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        add_watch(&pool, 1, "savings", TOKEN, "TKN", None, None)
            .await
            .unwrap();
        let other_token = "0x2222222222222222222222222222222222222222";
        add_watch(&pool, 1, "savings", other_token, "OTH", None, None)
            .await
            .unwrap();

        let mut updates = HashMap::new();
        updates.insert(WatchKey::new(1, ADDR_A, TOKEN), vec!["0xh1".to_string()]);
        updates.insert(
            WatchKey::new(1, ADDR_A, other_token),
            vec!["0xh2".to_string()],
        );
        record_notified(&pool, &updates, 100).await.unwrap();

        assert!(remove_watch(&pool, 1, "savings", "TKN").await.unwrap());

        let sets = load_notified_sets(&pool).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(
            sets[&WatchKey::new(1, ADDR_A, other_token)],
            vec!["0xh2".to_string()]
        );
    }

    #[tokio::test]
    async fn snapshot_joins_wallets_and_drops_orphans() {
        let pool = test_pool().await;
        add_wallet(&pool, 1, "savings", ADDR_A).await.unwrap();
        add_watch(&pool, 1, "savings", TOKEN, "TKN", Some(0.01), Some(1.0))
            .await
            .unwrap();

        // A watch whose wallet is gone (inserted behind the API's back)
        sqlx::query(
            "INSERT INTO watches (chat_id, wallet_name, token_contract, token_label, min_amount, max_amount, created_at)
             VALUES (1, 'ghost', ?, 'GHOST', 0, 1, ?)",
        )
        .bind(TOKEN)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();

        let pairs = snapshot(&pool).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].wallet.address, ADDR_A);
        assert_eq!(pairs[0].watch.token_label, "TKN");
    }
}
