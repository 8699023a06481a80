use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::models::subscriptions::WatchKey;

/// Loads every persisted notified-set, oldest hash first per key.
pub async fn load_notified_sets(pool: &SqlitePool) -> Result<HashMap<WatchKey, Vec<String>>> {
    let rows = sqlx::query_as::<_, (i64, String, String, String)>(
        "SELECT chat_id, wallet_address, token_contract, tx_hash FROM notified ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let mut sets: HashMap<WatchKey, Vec<String>> = HashMap::new();
    for (chat_id, wallet_address, token_contract, tx_hash) in rows {
        sets.entry(WatchKey::new(chat_id, &wallet_address, &token_contract))
            .or_default()
            .push(tx_hash);
    }

    Ok(sets)
}

/// Bulk write-back at the end of a cycle: inserts the newly alerted hashes
/// and trims each touched key down to `cap` rows, dropping the oldest.
pub async fn record_notified(
    pool: &SqlitePool,
    updates: &HashMap<WatchKey, Vec<String>>,
    cap: usize,
) -> Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for (key, hashes) in updates {
        for hash in hashes {
            inserted += sqlx::query(
                "INSERT OR IGNORE INTO notified (chat_id, wallet_address, token_contract, tx_hash, notified_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(key.chat_id)
            .bind(&key.wallet_address)
            .bind(&key.token_contract)
            .bind(hash)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query(
            "DELETE FROM notified
             WHERE chat_id = ? AND wallet_address = ? AND token_contract = ?
               AND id NOT IN (
                   SELECT id FROM notified
                   WHERE chat_id = ? AND wallet_address = ? AND token_contract = ?
                   ORDER BY id DESC LIMIT ?
               )",
        )
        .bind(key.chat_id)
        .bind(&key.wallet_address)
        .bind(&key.token_contract)
        .bind(key.chat_id)
        .bind(&key.wallet_address)
        .bind(&key.token_contract)
        .bind(cap as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}
