//! Field-level validation of purchase orders against the reference sets of a run.

use crate::domain::{PurchaseOrder, ReferenceSets, Verdict};


/// Produces a per-field verdict for a single purchase order. Implementations must not perform I/O.
pub trait RecordValidator {
    fn validate(&self, order: &PurchaseOrder) -> Verdict;
}

/// Validates against a reference snapshot that was loaded once, before the run started.
#[derive(Debug, Clone)]
pub struct Validator {
    references: ReferenceSets,
}

impl Validator {
    pub fn new(references: ReferenceSets) -> Self {
        Self { references }
    }
}

impl RecordValidator for Validator {
    fn validate(&self, order: &PurchaseOrder) -> Verdict {
        Verdict {
            buyer_id_valid: self.references.buyers.contains(&order.buyer_id),
            product_code_valid: self.references.products.contains(&order.product_code),
            quantity_valid: order.quantity >= 0,
        }
    }
}

impl<V: RecordValidator + ?Sized> RecordValidator for &V {
    fn validate(&self, order: &PurchaseOrder) -> Verdict {
        (**self).validate(order)
    }
}
