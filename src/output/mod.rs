use std::io::Write;

use serde::Serialize;

use crate::{
    domain::{ProcessingResult, PurchaseOrder},
    error::Error,
};


#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Invalid,
    Unprocessable,
}

/// One line of the run report. Decoded rows carry their fields, unprocessable rows their raw text.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub status: RowStatus,
    pub buyer_id: Option<String>,
    pub product_code: Option<String>,
    pub order_date: Option<String>,
    pub quantity: Option<i32>,
    pub raw: Option<String>,
}

impl ReportRow {
    fn from_order(status: RowStatus, order: &PurchaseOrder) -> Self {
        Self {
            status,
            buyer_id: Some(order.buyer_id.clone()),
            product_code: Some(order.product_code.clone()),
            order_date: Some(order.order_date.clone()),
            quantity: Some(order.quantity),
            raw: None,
        }
    }

    fn from_raw(line: &str) -> Self {
        Self {
            status: RowStatus::Unprocessable,
            buyer_id: None,
            product_code: None,
            order_date: None,
            quantity: None,
            raw: Some(line.to_string()),
        }
    }
}

/// Rows of the report: valid first, then invalid, then unprocessable, each in input order.
pub fn to_report_rows(result: &ProcessingResult) -> impl Iterator<Item = ReportRow> + '_ {
    let valid = result
        .valid
        .iter()
        .map(|o| ReportRow::from_order(RowStatus::Valid, o));
    let invalid = result
        .invalid
        .iter()
        .map(|o| ReportRow::from_order(RowStatus::Invalid, o));
    let unprocessable = result.unprocessable.iter().map(|l| ReportRow::from_raw(l));

    valid.chain(invalid).chain(unprocessable)
}

/// Serializes the report as CSV with a header line.
pub fn write_report(result: &ProcessingResult, writer: impl Write) -> Result<(), Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in to_report_rows(result) {
        wtr.serialize(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
