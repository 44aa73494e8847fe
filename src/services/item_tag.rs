use std::fmt;

/// Line-item tag carried opaquely through the payment provider.
///
/// The provider echoes line items back verbatim in the payment detail, so the
/// tag is the only channel telling reconciliation which stock pool a line
/// belongs to. Wire form is `IND|id`, `PACK|id`, or the `SHIP|0` sentinel for
/// the shipping line. The raw string exists only at this boundary; everything
/// internal passes the enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemTag {
    Individual(i32),
    Pack(i32),
    Shipping,
}

impl ItemTag {
    const KIND_INDIVIDUAL: &'static str = "IND";
    const KIND_PACK: &'static str = "PACK";
    const KIND_SHIPPING: &'static str = "SHIP";

    /// Parses a tag echoed back by the provider. Returns `None` for anything
    /// that is not a well-formed tag.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, id) = raw.split_once('|')?;
        match kind {
            Self::KIND_SHIPPING => Some(Self::Shipping),
            Self::KIND_INDIVIDUAL => id.parse().ok().map(Self::Individual),
            Self::KIND_PACK => id.parse().ok().map(Self::Pack),
            _ => None,
        }
    }

    /// Wire form of the tag.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ItemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual(id) => write!(f, "{}|{}", Self::KIND_INDIVIDUAL, id),
            Self::Pack(id) => write!(f, "{}|{}", Self::KIND_PACK, id),
            Self::Shipping => write!(f, "{}|0", Self::KIND_SHIPPING),
        }
    }
}
