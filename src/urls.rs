//! Absolute URL construction for the application pages the processor
//! redirects back to.
//!
//! The page routes themselves belong to the surrounding application; this
//! collaborator only knows their paths and prefixes them with the
//! scheme+host of the current request, the way the checkout form needs
//! them.

#[derive(Debug, Clone)]
pub struct UrlReverser {
    base: String,
}

impl UrlReverser {
    /// `host` is the Host header of the current request, e.g.
    /// `"www.example.com"`.
    pub fn from_host(host: &str) -> Self {
        Self {
            base: format!("http://{host}"),
        }
    }

    /// Pledge thank-you page, used as the processor's accept URL.
    pub fn pledge_thankyou(&self) -> String {
        format!("{}/pledges/thankyou", self.base)
    }

    /// Pledge cancel page, used as the processor's cancel URL.
    pub fn pledge_cancel(&self) -> String {
        format!("{}/pledges/cancel", self.base)
    }
}
