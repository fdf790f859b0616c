//! Warnings for products that are not generally available yet.

use crate::warn::Warn;

/// A product whose API may still change within minor releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentalProduct {
    /// Product name.
    pub product: &'static str,
    /// Maturity, e.g. `in beta`.
    pub maturity: &'static str,
    /// Changelog entry announcing the product.
    pub url: &'static str,
}

/// The DNS API.
pub const DNS_API: ExperimentalProduct = ExperimentalProduct {
    product: "DNS API",
    maturity: "in beta",
    url: "https://docs.hetzner.cloud/changelog#2025-10-07-dns-beta",
};

impl ExperimentalProduct {
    /// The warning shown before using the product.
    #[must_use]
    pub fn message(&self) -> String {
        experimental_warning(self.product, self.maturity, self.url)
    }

    /// Emit the warning.
    pub fn warn(&self, warn: &mut impl Warn) {
        warn.warn(self.message());
    }
}

/// Format the warning for an experimental product.
#[must_use]
pub fn experimental_warning(product: &str, maturity: &str, url: &str) -> String {
    format!(
        "Experimental: {product} is {maturity}, breaking changes may occur within minor releases. \
         See {url} for more details."
    )
}
