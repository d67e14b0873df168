//! Customer-facing prices and currency rendering.
//!
//! Owners list a price per hour; customers pay that price plus the platform
//! service fee, always rounded up to the next whole unit. All arithmetic is
//! integer so `ceil(owner × 1.05)` never suffers float drift.

use crate::config::PricingConfig;

/// `ceil(owner_price × (100 + fee_percent) / 100)`. Negative inputs clamp to zero.
#[must_use]
pub fn customer_price(owner_price: i64, fee_percent: u32) -> i64 {
    let owner_price = owner_price.max(0);
    let numerator = owner_price * (100 + i64::from(fee_percent));
    (numerator + 99) / 100
}

/// Customer price for a multi-hour booking.
#[must_use]
pub fn booking_total(owner_price_per_hour: i64, hours: i64, fee_percent: u32) -> i64 {
    customer_price(owner_price_per_hour, fee_percent) * hours.max(0)
}

/// Platform fee included in a customer price.
#[must_use]
pub fn service_fee(owner_price: i64, fee_percent: u32) -> i64 {
    customer_price(owner_price, fee_percent) - owner_price.max(0)
}

/// Group digits in threes: `1234567` -> `1,234,567`.
#[must_use]
pub fn group_thousands(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Render an amount with the configured currency symbol, e.g. `₹1,050`.
#[must_use]
pub fn format_price(amount: i64, currency_symbol: &str) -> String {
    if amount < 0 {
        return format!("-{currency_symbol}{}", group_thousands(-amount));
    }
    format!("{currency_symbol}{}", group_thousands(amount))
}

/// Price fields attached to venue and booking read models.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PriceDisplay {
    pub owner_price: i64,
    pub customer_price: i64,
    pub service_fee: i64,
    pub formatted: String,
}

impl PriceDisplay {
    #[must_use]
    pub fn for_owner_price(owner_price: i64, config: &PricingConfig) -> Self {
        let customer = customer_price(owner_price, config.service_fee_percent);
        Self {
            owner_price,
            customer_price: customer,
            service_fee: service_fee(owner_price, config.service_fee_percent),
            formatted: format_price(customer, &config.currency_symbol),
        }
    }
}
