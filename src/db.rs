//! Database layer — migrations and the queries the payment core needs.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::ipn::IpnFields;
use crate::models::{Payment, Pledge, PledgeStatus};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Look up a pledge by primary key.
pub async fn get_pledge(pool: &SqlitePool, pledge_id: i64) -> Result<Option<Pledge>> {
    let pledge = sqlx::query_as::<_, Pledge>(
        r#"
        SELECT id, project_slug, backer_id, amount, currency, status, created_at
        FROM   pledges
        WHERE  id = ?1
        "#,
    )
    .bind(pledge_id)
    .fetch_optional(pool)
    .await?;
    Ok(pledge)
}

/// Insert or overwrite the payment record for `(order_id, pledge_id)`.
///
/// The uniqueness constraint on `(order_id, pledge_id)` turns concurrent
/// first notifications for the same order into an upsert race the database
/// resolves itself; the latest notification always wins and all processor
/// fields are overwritten in full.
pub async fn upsert_payment(
    conn: &mut SqliteConnection,
    order_id: &str,
    pledge_id: i64,
    fields: &IpnFields,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (order_id, pledge_id, amount, currency, status, payid, pm,
             acceptance, cardno, brand)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT (order_id, pledge_id) DO UPDATE SET
            amount     = excluded.amount,
            currency   = excluded.currency,
            status     = excluded.status,
            payid      = excluded.payid,
            pm         = excluded.pm,
            acceptance = excluded.acceptance,
            cardno     = excluded.cardno,
            brand      = excluded.brand,
            updated_at = strftime('%s', 'now')
        "#,
    )
    .bind(order_id)
    .bind(pledge_id)
    .bind(&fields.amount)
    .bind(&fields.currency)
    .bind(&fields.status)
    .bind(&fields.payid)
    .bind(&fields.pm)
    .bind(&fields.acceptance)
    .bind(&fields.cardno)
    .bind(&fields.brand)
    .execute(conn)
    .await?;
    Ok(())
}

/// Advance a pledge's status, monotonically.
///
/// The status ranking is enforced in the UPDATE itself, so the write only
/// applies when it moves the pledge forward no matter how stale the
/// caller's snapshot is — two interleaved callbacks cannot regress a paid
/// pledge.  A stored status outside the known vocabulary ranks above
/// `paid` and is never overwritten.
///
/// Returns whether the status actually changed.
pub async fn advance_pledge_status(
    conn: &mut SqliteConnection,
    pledge_id: i64,
    status: PledgeStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE pledges
        SET    status = ?1
        WHERE  id = ?2
          AND CASE status
                WHEN 'unauthorized' THEN 0
                WHEN 'authorized'   THEN 1
                WHEN 'paid'         THEN 2
                ELSE 3
              END
            < CASE ?1
                WHEN 'unauthorized' THEN 0
                WHEN 'authorized'   THEN 1
                WHEN 'paid'         THEN 2
                ELSE 3
              END
        "#,
    )
    .bind(status.as_str())
    .bind(pledge_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Fetch all payment records for a pledge, newest first.
pub async fn get_payments_for_pledge(pool: &SqlitePool, pledge_id: i64) -> Result<Vec<Payment>> {
    let rows = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, order_id, pledge_id, amount, currency, status, payid, pm,
               acceptance, cardno, brand, created_at, updated_at
        FROM   payments
        WHERE  pledge_id = ?1
        ORDER  BY updated_at DESC, id DESC
        "#,
    )
    .bind(pledge_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
