//! Order identifiers: the string that ties a Postfinance order back to a
//! pledge.
//!
//! An order id is derived at checkout time as `{project_slug}-{pledge_id}`
//! and decomposed again when the IPN callback arrives.  The scheme is only
//! reversible while the project slug itself contains no `-`; a slug with a
//! dash produces an order id that fails decomposition and the callback is
//! rejected.  This is a known defect of the id scheme, kept as-is.

const SEPARATOR: char = '-';

/// Compose the order id for a pledge.
pub fn order_id(project_slug: &str, pledge_id: i64) -> String {
    format!("{project_slug}{SEPARATOR}{pledge_id}")
}

/// Split an order id back into `(project_slug, pledge_id)`.
///
/// Returns `None` unless the id splits on the separator into exactly two
/// parts with a numeric pledge id.
pub fn split_order_id(order_id: &str) -> Option<(&str, i64)> {
    let mut parts = order_id.split(SEPARATOR);
    let slug = parts.next()?;
    let pledge_id = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let pledge_id: i64 = pledge_id.parse().ok()?;
    Some((slug, pledge_id))
}
