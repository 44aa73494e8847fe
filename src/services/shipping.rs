use rust_decimal::Decimal;

use crate::config::ShippingConfig;

/// Postal zone for flat-rate shipping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShippingZone {
    /// City postal codes, 1000-1499
    Metro,
    /// Surrounding belt, 1500-1999
    GreaterMetro,
    /// Everything else, including codes outside the tabulated ranges
    Interior,
}

impl ShippingZone {
    /// Short description shown next to a quote.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Metro => "City delivery",
            Self::GreaterMetro => "Greater metro delivery",
            Self::Interior => "Nationwide delivery",
        }
    }
}

/// Flat postal-code-to-rate table.
///
/// Quoting is total and deterministic: blank or non-numeric codes price to
/// zero and the caller adds no shipping line. Codes outside every tabulated
/// range fall back to the interior rate.
#[derive(Clone, Debug)]
pub struct ShippingTable {
    metro: Decimal,
    greater_metro: Decimal,
    interior: Decimal,
}

impl ShippingTable {
    pub fn new(config: &ShippingConfig) -> Self {
        Self {
            metro: Decimal::from(config.metro),
            greater_metro: Decimal::from(config.greater_metro),
            interior: Decimal::from(config.interior),
        }
    }

    /// Classifies a postal code. `None` means the code is blank or not a
    /// number, and no shipping applies at all.
    pub fn classify(postal_code: &str) -> Option<ShippingZone> {
        let trimmed = postal_code.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Absurdly long digit strings overflow the parse; they fall through
        // to the default zone like any other out-of-range code.
        let code: u32 = trimmed.parse().unwrap_or(u32::MAX);
        Some(match code {
            1000..=1499 => ShippingZone::Metro,
            1500..=1999 => ShippingZone::GreaterMetro,
            _ => ShippingZone::Interior,
        })
    }

    /// Configured rate for a zone.
    pub fn rate(&self, zone: ShippingZone) -> Decimal {
        match zone {
            ShippingZone::Metro => self.metro,
            ShippingZone::GreaterMetro => self.greater_metro,
            ShippingZone::Interior => self.interior,
        }
    }

    /// Shipping cost for a raw postal code. Zero means no shipping line.
    pub fn quote(&self, postal_code: &str) -> Decimal {
        Self::classify(postal_code)
            .map(|zone| self.rate(zone))
            .unwrap_or(Decimal::ZERO)
    }
}
