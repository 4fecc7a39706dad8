use std::path::Path;

use crate::error::Result;
use crate::ledger::LOG_ERROR_COLUMN;
use crate::model::ProductRow;

/// Writes the export snapshot, one row per item, headers first.
pub fn write_products(path: &Path, rows: &[ProductRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Column set the add batch expects in its upload file.
pub const UPLOAD_COLUMNS: [&str; 12] = [
    "itemName",
    "skuID",
    "itemCode",
    "description",
    "priceInMin",
    "weight",
    "unit",
    "stock",
    "imageURL",
    "itemClassID",
    "sellingTimeID",
    "categoryID",
];

/// Writes a one-row template upload file so the operator can see the
/// expected columns. Produced when the add batch finds no input.
pub fn write_sample_upload(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(UPLOAD_COLUMNS)?;
    writer.write_record([
        "Example New Product",
        "SKU123",
        "SKU123",
        "Product description",
        "12000",
        "250",
        "g",
        "10",
        "",
        "FILL_ITEM_CLASS_ID",
        "FILL_SELLING_TIME_ID",
        "FILL_CATEGORY_ID",
    ])?;
    writer.flush()?;
    Ok(())
}

/// Writes failed rows back out: the original header row plus a trailing
/// `logError` column, each record followed by its diagnostic.
pub fn write_failures(
    path: &Path,
    headers: &csv::StringRecord,
    failures: &[(csv::StringRecord, String)],
) -> Result<()> {
    // Flexible: the reader accepts ragged rows, so the retry file must too.
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;

    let mut header_row = headers.clone();
    header_row.push_field(LOG_ERROR_COLUMN);
    writer.write_record(&header_row)?;

    for (record, error) in failures {
        let mut row = record.clone();
        // Pad short records so the diagnostic always lands in its column.
        while row.len() < headers.len() {
            row.push_field("");
        }
        row.push_field(error);
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}
