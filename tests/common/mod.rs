//! Shared fixtures for the integration tests.

use std::collections::HashMap;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use pledgepay::config::Config;
use pledgepay::signature;

/// Fresh in-memory database with migrations applied.  A single connection
/// keeps every query on the same in-memory instance.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

/// Config with injected secrets; nothing is read from the environment.
pub fn test_config() -> Config {
    Config {
        pspid: "testshop".to_string(),
        sha1_in: "insecret".to_string(),
        sha1_out: "outsecret".to_string(),
        live: false,
        database_url: "sqlite::memory:".to_string(),
        api_port: 0,
    }
}

/// Insert a pledge with an explicit id.
pub async fn insert_pledge(
    pool: &SqlitePool,
    id: i64,
    project_slug: &str,
    amount: &str,
    currency: &str,
    status: &str,
) {
    sqlx::query(
        "INSERT INTO pledges (id, project_slug, amount, currency, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(project_slug)
    .bind(amount)
    .bind(currency)
    .bind(status)
    .execute(pool)
    .await
    .expect("insert pledge");
}

/// Read back a pledge's stored status string.
pub async fn pledge_status(pool: &SqlitePool, id: i64) -> String {
    let (status,): (String,) = sqlx::query_as("SELECT status FROM pledges WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("pledge exists");
    status
}

/// Count payment rows for an order id.
pub async fn payment_count(pool: &SqlitePool, order_id: &str) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(pool)
            .await
            .expect("count payments");
    count
}

/// A complete, correctly signed IPN parameter set.
///
/// The signature is computed over the processor's inbound field order
/// (orderID, currency, amount, PM, ACCEPTANCE, STATUS, CARDNO, PAYID,
/// NCERROR, BRAND) with the SHA1_OUT secret.
pub fn ipn_params(
    config: &Config,
    order_id: &str,
    amount: &str,
    currency: &str,
    status: &str,
    payid: &str,
) -> HashMap<String, String> {
    let pm = "CreditCard";
    let acceptance = "test123";
    let cardno = "XXXXXXXXXXXX1111";
    let ncerror = "0";
    let brand = "VISA";

    let shasign = signature::sign(
        &[
            order_id, currency, amount, pm, acceptance, status, cardno, payid, ncerror, brand,
        ],
        &config.sha1_out,
    );

    let mut params = HashMap::new();
    params.insert("orderID".to_string(), order_id.to_string());
    params.insert("amount".to_string(), amount.to_string());
    params.insert("currency".to_string(), currency.to_string());
    params.insert("PM".to_string(), pm.to_string());
    params.insert("ACCEPTANCE".to_string(), acceptance.to_string());
    params.insert("STATUS".to_string(), status.to_string());
    params.insert("CARDNO".to_string(), cardno.to_string());
    params.insert("PAYID".to_string(), payid.to_string());
    params.insert("NCERROR".to_string(), ncerror.to_string());
    params.insert("BRAND".to_string(), brand.to_string());
    params.insert("SHASIGN".to_string(), shasign);
    params
}

/// Corrupt a hex signature by flipping its last character.
pub fn tamper(signature: &str) -> String {
    let mut chars: Vec<char> = signature.chars().collect();
    let last = chars.last_mut().expect("non-empty signature");
    *last = if *last == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}
