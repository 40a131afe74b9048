use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::lenient;

/// A billable row on an invoice.
///
/// `amount` is always `quantity * rate`, clamped to the `Decimal` range. Fields are private so the amount
/// can only change through [`LineItem::apply`] / [`recompute_line_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LineItemFields")]
pub struct LineItem {
    description: String,
    #[serde(serialize_with = "lenient::serialize")]
    quantity: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    rate: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    amount: Decimal,
}

/// Stored shape of a line item; any `amount` on disk is ignored.
#[derive(Deserialize)]
struct LineItemFields {
    #[serde(default)]
    description: String,
    #[serde(default = "default_quantity", with = "lenient")]
    quantity: Decimal,
    #[serde(default, with = "lenient")]
    rate: Decimal,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl From<LineItemFields> for LineItem {
    fn from(fields: LineItemFields) -> Self {
        LineItem::new(fields.description, fields.quantity, fields.rate)
    }
}

impl Default for LineItem {
    fn default() -> Self {
        LineItem::new(String::new(), Decimal::ONE, Decimal::ZERO)
    }
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, rate: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            rate,
            amount: quantity.saturating_mul(rate),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Apply a partial update in place and recompute the amount.
    pub fn apply(&mut self, patch: LineItemPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(rate) = patch.rate {
            self.rate = rate;
        }
        self.amount = self.quantity.saturating_mul(self.rate);
    }

    /// Whether this row satisfies the "description and price" requirement.
    pub fn is_billable(&self) -> bool {
        !self.description.trim().is_empty() && self.rate > Decimal::ZERO
    }
}

/// Partial update of a line item. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItemPatch {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub rate: Option<Decimal>,
}

impl LineItemPatch {
    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn quantity(quantity: Decimal) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn rate(rate: Decimal) -> Self {
        Self {
            rate: Some(rate),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.quantity.is_none() && self.rate.is_none()
    }
}

/// Return a copy of `item` with `patch` applied and `amount` recomputed from
/// the post-patch quantity and rate.
///
/// Negative values pass through; they are a validation concern, not an
/// arithmetic one.
pub fn recompute_line_item(item: &LineItem, patch: LineItemPatch) -> LineItem {
    let mut next = item.clone();
    next.apply(patch);
    next
}
