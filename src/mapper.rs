//! Pure row-to-request translation.
//!
//! Everything here is side-effect free: rows come in as the free-text
//! strings the operator edited, payloads go out with the defaulting and
//! unit rules the merchant portal expects. Malformed numbers are not
//! rejected here; they travel as absent values so the remote validation
//! produces the authoritative error.

use crate::catalog::{ItemPayload, ItemUpsertRequest};
use crate::model::{PosRow, ProductRow, STATUS_OUT_OF_STOCK, Weight};

/// Weight units the portal accepts verbatim. Anything else is coerced to
/// the catch-all "per pack".
pub const KNOWN_UNITS: [&str; 5] = ["ml", "l", "g", "k", "per pack"];

/// Fallback unit for unrecognised input.
pub const FALLBACK_UNIT: &str = "per pack";

/// Which availability status the update batch sends after a successful
/// upsert. The portal's own revisions disagreed on this; the stock-driven
/// override is the default because it prevents overselling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AvailabilityPolicy {
    /// Parsed stock below 1 forces the out-of-stock status; otherwise the
    /// row's declared status is used.
    #[default]
    StockDrivenOverride,
    /// The row's declared status is always used verbatim.
    DeclaredStatus,
}

/// Follow-up call owed after a successful create/reprice upsert. Exactly
/// one of the two is issued per item, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Enable inventory management with this quantity.
    Stock(i64),
    /// Mark the item out of stock.
    ForceUnavailable,
}

/// Lenient integer parser shared by every free-text numeric field: row
/// stock/price/weight columns and the POS export's "Normal Price" and
/// "Quantity". Currency symbols, letters, spaces, and comma thousands
/// separators are stripped; a decimal fraction is rounded half away from
/// zero. Input with no digits yields `None`.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.round() as i64)
}

/// Parses an availability status column. Values outside the i32 range are
/// treated as unparseable rather than wrapped.
pub fn parse_status(raw: &str) -> Option<i32> {
    parse_amount(raw).and_then(|v| i32::try_from(v).ok())
}

/// Validates a weight unit against the portal's fixed set, coercing
/// anything unrecognised to "per pack".
pub fn normalize_unit(raw: &str) -> String {
    let trimmed = raw.trim();
    if KNOWN_UNITS.contains(&trimmed) {
        trimmed.to_string()
    } else {
        FALLBACK_UNIT.to_string()
    }
}

/// Computes a marked-up price: `base + round(base * percent / 100)` with
/// round-half-up, in integer arithmetic so money never passes through a
/// float.
pub fn reprice(base_minor: i64, percent: i64) -> i64 {
    base_minor + (base_minor * percent + 50).div_euclid(100)
}

/// Resolves the availability status an update row should end up with.
/// Returns `None` when the row declares no parseable status and no
/// override applies; the engine records that row as a failure.
pub fn derive_availability(
    policy: AvailabilityPolicy,
    stock: Option<i64>,
    declared: Option<i32>,
) -> Option<i32> {
    match policy {
        AvailabilityPolicy::StockDrivenOverride if stock.is_some_and(|s| s < 1) => {
            Some(STATUS_OUT_OF_STOCK)
        }
        _ => declared,
    }
}

/// Chooses the single follow-up call owed after a successful upsert on the
/// add and reprice paths.
pub fn follow_up_for_quantity(quantity: Option<i64>) -> FollowUp {
    match quantity {
        Some(q) if q > 0 => FollowUp::Stock(q),
        _ => FollowUp::ForceUnavailable,
    }
}

/// Builds the update payload for one export row. The price is used as-is
/// (the export already stores minor units) and the unit passes through
/// unvalidated, mirroring the portal's own update form.
pub fn build_update_request(row: &ProductRow) -> ItemUpsertRequest {
    ItemUpsertRequest {
        item: ItemPayload {
            item_id: Some(row.item_id.clone()),
            item_name: row.item_name.clone(),
            available_status: parse_status(&row.available_status),
            description: row.description.clone(),
            price_in_min: parse_amount(&row.price_in_min),
            weight: Weight {
                unit: row.unit.clone(),
                count: parse_amount(&row.stock),
                value: parse_amount(&row.weight),
            },
            item_code: row.item_code.clone(),
            sku_id: row.sku_id.clone(),
            item_class_id: row.item_class_id.clone(),
            selling_time_id: row.selling_time_id.clone(),
            category_id: row.category_id.clone(),
            image_urls: image_urls(&row.image_url),
        },
        category_id: row.category_id.clone(),
    }
}

/// Builds the create payload for one upload row. The row's price is in
/// major currency units and is multiplied by 100 on the way out; this
/// factor is the upload file's convention, not a conversion bug. The unit
/// is validated, and `weight.count` is only carried when the row declares
/// positive stock.
pub fn build_add_request(row: &ProductRow) -> ItemUpsertRequest {
    let stock = parse_amount(&row.stock);
    ItemUpsertRequest {
        item: ItemPayload {
            item_id: None,
            item_name: row.item_name.clone(),
            available_status: None,
            description: row.description.clone(),
            price_in_min: parse_amount(&row.price_in_min).map(|p| p * 100),
            weight: Weight {
                unit: normalize_unit(&row.unit),
                count: stock.filter(|s| *s > 0),
                value: parse_amount(&row.weight),
            },
            item_code: row.item_code.clone(),
            sku_id: row.sku_id.clone(),
            item_class_id: row.item_class_id.clone(),
            selling_time_id: row.selling_time_id.clone(),
            category_id: row.category_id.clone(),
            image_urls: image_urls(&row.image_url),
        },
        category_id: row.category_id.clone(),
    }
}

/// Builds the reprice payload for one POS row matched (by SKU) to its
/// export row. Identity fields come from the export, the price comes from
/// the POS normal price marked up by `percent`, and `weight.count` is
/// fixed at 1 because the quantity is carried by the stock follow-up call
/// instead. Returns the payload together with the resolved quantity.
pub fn build_reprice_request(
    pos: &PosRow,
    product: &ProductRow,
    percent: i64,
) -> (ItemUpsertRequest, Option<i64>) {
    let quantity = parse_amount(&pos.quantity);
    let request = ItemUpsertRequest {
        item: ItemPayload {
            item_id: Some(product.item_id.clone()),
            item_name: product.item_name.clone(),
            available_status: None,
            description: product.description.clone(),
            price_in_min: parse_amount(&pos.normal_price).map(|p| reprice(p, percent)),
            weight: Weight {
                unit: normalize_unit(&pos.uom),
                count: Some(1),
                value: parse_amount(&product.weight),
            },
            item_code: product.item_code.clone(),
            sku_id: product.sku_id.clone(),
            item_class_id: product.item_class_id.clone(),
            selling_time_id: product.selling_time_id.clone(),
            category_id: product.category_id.clone(),
            image_urls: image_urls(&product.image_url),
        },
        category_id: product.category_id.clone(),
    };
    (request, quantity)
}

/// Resolves the delete identifier from the first non-empty of the accepted
/// column spellings. Rows without one are skipped by the engine, not
/// recorded as failures.
pub fn resolve_delete_id(headers: &csv::StringRecord, record: &csv::StringRecord) -> Option<String> {
    for name in ["itemID", "itemId", "id"] {
        if let Some(position) = headers.iter().position(|h| h == name) {
            if let Some(value) = record.get(position) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn image_urls(url: &str) -> Vec<String> {
    if url.trim().is_empty() {
        Vec::new()
    } else {
        vec![url.to_string()]
    }
}
