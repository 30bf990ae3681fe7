//! Module for the core logic turning a purchase order file into valid, invalid and unprocessable rows.

use std::{collections::HashSet, io::Read, path::Path};

use tracing::{debug, info};

use crate::{
    domain::{ProcessingResult, PurchaseOrder},
    error::Error,
    input::{FileReadResult, read_file, read_records},
    validation::RecordValidator,
};


/// Single sequential pass over the parsed records of one file.
///
/// The first valid occurrence of a product code is accepted; every later occurrence is rejected
/// as a duplicate without being validated again, whatever its other fields look like.
pub struct OrderProcessor<V> {
    validator: V,
}

impl<V: RecordValidator> OrderProcessor<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<ProcessingResult, Error> {
        let parsed = read_file::<PurchaseOrder>(path)?;
        Ok(self.process_records(parsed))
    }

    pub fn process(&self, reader: impl Read) -> Result<ProcessingResult, Error> {
        let parsed = read_records::<PurchaseOrder>(reader)?;
        Ok(self.process_records(parsed))
    }

    /// Partitions already parsed records. Unprocessable lines are passed through unchanged.
    pub fn process_records(&self, parsed: FileReadResult<PurchaseOrder>) -> ProcessingResult {
        let FileReadResult {
            records,
            unprocessable,
        } = parsed;

        let mut accepted_product_codes: HashSet<String> = HashSet::new();
        let mut result = ProcessingResult {
            unprocessable,
            ..ProcessingResult::default()
        };

        for order in records {
            if accepted_product_codes.contains(&order.product_code) {
                debug!(
                    product_code = %order.product_code,
                    buyer_id = %order.buyer_id,
                    "duplicate product code rejected"
                );
                result.invalid.push(order);
                continue;
            }

            let verdict = self.validator.validate(&order);
            if verdict.is_valid() {
                accepted_product_codes.insert(order.product_code.clone());
                result.valid.push(order);
            } else {
                debug!(
                    product_code = %order.product_code,
                    buyer_id = %order.buyer_id,
                    failed = ?verdict.failed_fields(),
                    "order failed validation"
                );
                result.invalid.push(order);
            }
        }

        info!(
            valid = result.valid.len(),
            invalid = result.invalid.len(),
            unprocessable = result.unprocessable.len(),
            "purchase orders processed"
        );
        result
    }
}
