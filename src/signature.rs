//! Shared-secret SHA-1 signatures over ordered field sequences.
//!
//! Postfinance authenticates both directions with a hex digest over a fixed
//! concatenation of fields plus a pre-shared secret.  The two directions use
//! *different* field orders and *different* secrets:
//!
//! * outbound checkout: `orderID + amount + currency + PSPID` + `SHA1_IN`
//! * inbound IPN:       `orderID + currency + amount + PM + ACCEPTANCE +
//!   STATUS + CARDNO + PAYID + NCERROR + BRAND` + `SHA1_OUT`
//!
//! Callers own their statically ordered field list (see
//! [`crate::checkout`] and [`crate::ipn`]); this module only provides the
//! generic digest and the case-insensitive comparison.

use sha1::{Digest, Sha1};

/// Digest the concatenation of `fields` followed by `secret`, encoded as
/// lowercase hexadecimal.
pub fn sign(fields: &[&str], secret: &str) -> String {
    let mut hasher = Sha1::new();
    for field in fields {
        hasher.update(field.as_bytes());
    }
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a computed signature against a received one, ignoring case.
/// The processor sends uppercase hex; we compute lowercase.
pub fn matches(computed: &str, received: &str) -> bool {
    computed.eq_ignore_ascii_case(received)
}
