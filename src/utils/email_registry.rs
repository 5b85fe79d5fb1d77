//! In-memory fast path for "is this email already registered?".
//!
//! The cuckoo filter answers "certainly new" without a query; the TTL cache answers
//! "certainly taken" for recently seen accounts. Anything else falls through to the
//! store, and the unique key on `users.email` stays the final word.
use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

static TAKEN_EMAILS: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(200_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// False means the email was never registered. True may be a false positive.
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    match EMAIL_FILTER.read() {
        Ok(filter) => filter.contains(&email),
        // a poisoned filter can't vouch for anything
        Err(_) => true,
    }
}

pub async fn is_taken(email: &str) -> bool {
    TAKEN_EMAILS.contains_key(&normalize(email))
}

/// Records a freshly registered email in both structures.
pub async fn record(email: &str) {
    let email = normalize(email);
    insert_batch(std::slice::from_ref(&email));
    TAKEN_EMAILS.insert(email, ()).await;
}

fn insert_batch(emails: &[String]) {
    let mut filter = match EMAIL_FILTER.write() {
        Ok(filter) => filter,
        Err(poisoned) => poisoned.into_inner(),
    };

    for email in emails {
        filter.add(email);
    }
}

/// Streams every registered email into the filter and the recently created ones
/// (last `recent_days`) into the cache.
pub async fn warmup(pool: &MySqlPool, recent_days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("email row fetch failed: {}", e))?;
        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }
    drop(stream);

    let recent = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT email
        FROM users
        WHERE created_at >= NOW() - INTERVAL ? DAY
        ORDER BY created_at DESC
        "#,
    )
    .bind(recent_days)
    .fetch_all(pool)
    .await?;

    let cached = recent.len();
    futures::future::join_all(
        recent
            .into_iter()
            .map(|(email,)| TAKEN_EMAILS.insert(normalize(&email), ())),
    )
    .await;

    log::info!(
        "Email registry warmup complete: {} registered, {} cached (last {} days)",
        total,
        cached,
        recent_days
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn recorded_email_is_known_case_insensitively() {
        record("Known.Person@Example.com").await;

        assert!(might_exist("known.person@example.com"));
        assert!(is_taken(" KNOWN.PERSON@example.com ").await);
    }

    #[actix_web::test]
    async fn unseen_email_is_not_taken() {
        assert!(!is_taken("never-registered-4711@example.com").await);
    }
}
