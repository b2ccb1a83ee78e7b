//! Instant payment notification (IPN) verification and state transition.
//!
//! Postfinance posts an unauthenticated, replayable callback after every
//! transaction state change.  Possession of the `SHA1_OUT` secret is the
//! only authentication on this path — there is no session, source-IP
//! allowlist or CSRF token.  Processing is a strict pipeline: each step
//! either continues or halts with a typed [`Rejection`] that maps to a 403,
//! while storage failures surface separately as [`IpnError::Infrastructure`].

use std::collections::HashMap;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::db;
use crate::models::PledgeStatus;
use crate::order;
use crate::signature;

/// Why a callback was refused.  Every variant is answered with a 403 and a
/// short reason string; nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingField(&'static str),
    SignatureMismatch,
    MalformedOrderId(String),
    UnknownPledge(String),
}

impl Rejection {
    /// The reason string returned to the processor in the 403 body.
    pub fn reason(&self) -> String {
        match self {
            Self::MissingField(_) => "Missing data".to_string(),
            Self::SignatureMismatch => "Hash did not validate".to_string(),
            Self::MalformedOrderId(_) => "Malformed order ID".to_string(),
            Self::UnknownPledge(id) => format!("Pledge {id} does not exist"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IpnError {
    /// Validation failed; the callback is refused with a 403.
    #[error("IPN rejected: {}", .0.reason())]
    Rejected(Rejection),

    /// Storage failed mid-processing; propagated as a server error so the
    /// processor's own retry handles recovery.
    #[error(transparent)]
    Infrastructure(#[from] crate::errors::PaymentError),
}

impl From<sqlx::Error> for IpnError {
    fn from(e: sqlx::Error) -> Self {
        Self::Infrastructure(e.into())
    }
}

/// The complete inbound parameter set, present and extracted.
#[derive(Debug, Clone)]
pub struct IpnFields {
    pub order_id: String,
    pub amount: String,
    pub currency: String,
    pub pm: String,
    pub acceptance: String,
    pub status: String,
    pub cardno: String,
    pub payid: String,
    pub ncerror: String,
    pub brand: String,
    pub shasign: String,
}

impl IpnFields {
    /// Extract the required parameters from the posted form.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, Rejection> {
        fn required<'a>(
            params: &'a HashMap<String, String>,
            key: &'static str,
        ) -> Result<&'a str, Rejection> {
            params
                .get(key)
                .map(String::as_str)
                .ok_or(Rejection::MissingField(key))
        }

        Ok(IpnFields {
            order_id: required(params, "orderID")?.to_string(),
            amount: required(params, "amount")?.to_string(),
            currency: required(params, "currency")?.to_string(),
            pm: required(params, "PM")?.to_string(),
            acceptance: required(params, "ACCEPTANCE")?.to_string(),
            status: required(params, "STATUS")?.to_string(),
            cardno: required(params, "CARDNO")?.to_string(),
            payid: required(params, "PAYID")?.to_string(),
            ncerror: required(params, "NCERROR")?.to_string(),
            brand: required(params, "BRAND")?.to_string(),
            shasign: required(params, "SHASIGN")?.to_string(),
        })
    }

    /// The inbound signature field order.  This is *not* the outbound
    /// order: Postfinance signs callbacks over
    /// `orderID, currency, amount, PM, ACCEPTANCE, STATUS, CARDNO, PAYID,
    /// NCERROR, BRAND` followed by the `SHA1_OUT` secret.
    pub fn signature_fields(&self) -> [&str; 10] {
        [
            &self.order_id,
            &self.currency,
            &self.amount,
            &self.pm,
            &self.acceptance,
            &self.status,
            &self.cardno,
            &self.payid,
            &self.ncerror,
            &self.brand,
        ]
    }
}

/// Map a processor status code to the pledge status it implies, if any.
///
/// `"5"` means the payment was authorized, `"9"` that funds were captured.
/// Every other code is stored on the payment record but leaves the pledge
/// untouched.
fn pledge_status_for(status_code: &str) -> Option<PledgeStatus> {
    match status_code {
        "5" => Some(PledgeStatus::Authorized),
        "9" => Some(PledgeStatus::Paid),
        _ => None,
    }
}

/// Verify and apply one IPN callback.
///
/// On success the payment record and any pledge status change have been
/// committed together and the caller should answer `200 OK`.
pub async fn process(
    pool: &SqlitePool,
    config: &Config,
    params: &HashMap<String, String>,
) -> Result<(), IpnError> {
    // Keep the raw parameter set around for forensic logging; every
    // rejection is logged with the full payload.
    let params_repr = serde_json::to_string(params).unwrap_or_else(|_| format!("{params:?}"));
    info!("IPN: processing request data: {params_repr}");

    let fields = IpnFields::from_params(params).map_err(|r| {
        error!("IPN: missing data in {params_repr}");
        IpnError::Rejected(r)
    })?;

    let computed = signature::sign(&fields.signature_fields(), &config.sha1_out);
    if !signature::matches(&computed, &fields.shasign) {
        error!("IPN: invalid hash in {params_repr}");
        return Err(IpnError::Rejected(Rejection::SignatureMismatch));
    }

    let Some((_project_slug, pledge_id)) = order::split_order_id(&fields.order_id) else {
        error!("IPN: error getting pledge id from {}", fields.order_id);
        return Err(IpnError::Rejected(Rejection::MalformedOrderId(
            fields.order_id.clone(),
        )));
    };

    let Some(pledge) = db::get_pledge(pool, pledge_id).await? else {
        error!("IPN: pledge {pledge_id} does not exist");
        return Err(IpnError::Rejected(Rejection::UnknownPledge(
            pledge_id.to_string(),
        )));
    };

    // The payment upsert and the pledge transition commit together; a
    // failure in either leaves no half-applied state behind.
    let mut tx = pool.begin().await?;

    db::upsert_payment(&mut *tx, &fields.order_id, pledge.id, &fields).await?;

    info!("IPN: status = {}", fields.status);
    if let Some(new_status) = pledge_status_for(&fields.status) {
        // The monotonicity guard lives in the UPDATE itself: replayed or
        // interleaved callbacks never move a pledge backwards (a late "5"
        // after "9" leaves it PAID) even when this handler's pledge
        // snapshot is stale.
        if !db::advance_pledge_status(&mut *tx, pledge.id, new_status).await? {
            info!(
                "IPN: pledge {} already at or past {}",
                pledge.id,
                new_status.as_str()
            );
        }
    }

    tx.commit().await?;
    info!("IPN: successfully processed IPN request for {}", fields.order_id);
    Ok(())
}
