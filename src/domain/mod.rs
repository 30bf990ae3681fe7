//! Module for the types defining the purchase order domain.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};


/// One line of a purchase order file. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchaseOrder {
    pub buyer_id: String,
    pub order_date: String,
    pub product_code: String,
    pub quantity: i32,
}

/// A row of the buyers flat file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Buyer {
    pub buyer_id: String,
}

/// A row of the products flat file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    pub product_code: String,
}

/// The reference tables purchase orders are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Buyer,
    Product,
}

impl ReferenceKind {
    pub fn table(self) -> &'static str {
        match self {
            ReferenceKind::Buyer => "Buyer",
            ReferenceKind::Product => "Product",
        }
    }

    pub fn key_column(self) -> &'static str {
        match self {
            ReferenceKind::Buyer => "BuyerId",
            ReferenceKind::Product => "ProductCode",
        }
    }
}

/// Snapshot of the identifiers known to the store, taken once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet(HashSet<String>);

impl ReferenceSet {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Both reference sets of a run
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    pub buyers: ReferenceSet,
    pub products: ReferenceSet,
}

/// Per-field outcome of validating one purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub buyer_id_valid: bool,
    pub product_code_valid: bool,
    pub quantity_valid: bool,
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        self.buyer_id_valid && self.product_code_valid && self.quantity_valid
    }

    pub(crate) fn failed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.buyer_id_valid {
            fields.push("BuyerId");
        }
        if !self.product_code_valid {
            fields.push("ProductCode");
        }
        if !self.quantity_valid {
            fields.push("Quantity");
        }
        fields
    }
}

/// Three-way partition of an input file. Every input row ends up in exactly one of the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingResult {
    pub valid: Vec<PurchaseOrder>,
    /// Failed validation, or repeated the product code of an already accepted order
    pub invalid: Vec<PurchaseOrder>,
    /// Raw lines which could not be decoded into a purchase order
    pub unprocessable: Vec<String>,
}

impl ProcessingResult {
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len() + self.unprocessable.len()
    }
}
