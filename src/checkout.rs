//! Outbound checkout request construction.
//!
//! Builds the parameter set for the Postfinance hosted payment page.  The
//! browser submits these as a hidden, auto-posting form; the `SHASign`
//! parameter makes the set tamper-evident so the processor can trust the
//! amount and order id it receives from the client.

use crate::config::Config;
use crate::errors::Result;
use crate::models::Pledge;
use crate::order;
use crate::signature;
use crate::urls::UrlReverser;

/// Hosted payment page endpoints.
pub const LIVE_ENDPOINT: &str = "https://e-payment.postfinance.ch/ncol/prod/orderstandard.asp";
pub const TEST_ENDPOINT: &str = "https://e-payment.postfinance.ch/ncol/test/orderstandard.asp";

/// Everything the checkout page needs to render the auto-submitting form.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    /// The processor endpoint the form posts to.
    pub action_url: &'static str,
    /// Ordered form parameters, signature included.
    pub params: Vec<(&'static str, String)>,
    pub accept_url: String,
    /// Unused by the processor integration; emitted empty.
    pub decline_url: String,
    /// Unused by the processor integration; emitted empty.
    pub exception_url: String,
    pub cancel_url: String,
    pub locale: String,
}

/// Assemble the signed parameter set for a pledge.
///
/// Pure with respect to storage: reads the pledge, writes nothing.  The
/// outbound signature field order is `orderID, amount, currency, PSPID`
/// followed by the `SHA1_IN` secret.
pub fn build(
    pledge: &Pledge,
    config: &Config,
    urls: &UrlReverser,
    locale: &str,
) -> Result<CheckoutForm> {
    let order_id = order::order_id(&pledge.project_slug, pledge.id);
    let amount = pledge.amount_minor_units()?.to_string();

    let shasign = signature::sign(
        &[&order_id, &amount, &pledge.currency, &config.pspid],
        &config.sha1_in,
    );

    let params = vec![
        ("orderID", order_id),
        ("amount", amount),
        ("currency", pledge.currency.clone()),
        ("PSPID", config.pspid.clone()),
        ("mode", if config.live { "prod" } else { "test" }.to_string()),
        ("SHASign", shasign),
    ];

    Ok(CheckoutForm {
        action_url: if config.live { LIVE_ENDPOINT } else { TEST_ENDPOINT },
        params,
        accept_url: urls.pledge_thankyou(),
        decline_url: String::new(),
        exception_url: String::new(),
        cancel_url: urls.pledge_cancel(),
        locale: locale.to_string(),
    })
}
