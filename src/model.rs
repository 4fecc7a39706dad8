use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Availability status the marketplace assigns to an item whose stock ran
/// out. The engine forces this code whenever a row's resolved quantity is
/// zero; every other status code passes through unchanged.
pub const STATUS_OUT_OF_STOCK: i32 = 3;

/// Authenticated identity persisted between runs. Created once by the login
/// call, immutable afterwards, read by every catalog request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// JWT presented in the `authorization` header.
    pub auth_token: String,
    /// Food-merchant entity identifier (`merchantid` header).
    pub merchant_entity_id: String,
    /// Linked merchant-group entity identifier (`merchantgroupid` header).
    pub merchant_group_entity_id: String,
    /// When the session was obtained. Informational only; a stale token
    /// surfaces as an authorization failure on first use.
    pub login_time: DateTime<Utc>,
}

/// Packaging descriptor attached to a catalog item. `count` doubles as the
/// sellable quantity in the merchant portal's data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub value: Option<i64>,
}

/// One item as returned by the remote menu endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "itemID", default)]
    pub item_id: String,
    #[serde(rename = "itemName", default)]
    pub item_name: String,
    #[serde(rename = "skuID", default)]
    pub sku_id: String,
    #[serde(rename = "itemCode", default)]
    pub item_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "priceInMin", default)]
    pub price_in_min: Option<i64>,
    #[serde(default)]
    pub weight: Option<Weight>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "itemClassID", default)]
    pub item_class_id: String,
    #[serde(rename = "sellingTimeID", default)]
    pub selling_time_id: String,
    #[serde(rename = "availableStatus", default)]
    pub available_status: Option<i32>,
}

/// One category of the remote menu, owning its items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuCategory {
    #[serde(rename = "categoryID", default)]
    pub category_id: String,
    #[serde(rename = "categoryName", default)]
    pub category_name: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// Flattened projection of a catalog item as it appears in the export file
/// and the update input. Every field stays a string: the rows are
/// operator-edited free text, and the mapper parses them lazily so that a
/// malformed number is rejected by the marketplace rather than by us.
///
/// Field order here defines the export column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    #[serde(default)]
    pub category: String,
    #[serde(rename = "itemID", default)]
    pub item_id: String,
    #[serde(rename = "itemName", default)]
    pub item_name: String,
    #[serde(rename = "skuID", default)]
    pub sku_id: String,
    #[serde(rename = "itemCode", default)]
    pub item_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "priceInMin", default)]
    pub price_in_min: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub unit: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    #[serde(rename = "itemClassID", default)]
    pub item_class_id: String,
    #[serde(rename = "sellingTimeID", default)]
    pub selling_time_id: String,
    #[serde(rename = "categoryID", default)]
    pub category_id: String,
    #[serde(rename = "availableStatus", default)]
    pub available_status: String,
}

/// One line of a point-of-sale export. Numeric fields are free text and may
/// carry currency symbols or thousands separators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PosRow {
    #[serde(rename = "Item Code", default)]
    pub item_code: String,
    #[serde(rename = "Item Name", default)]
    pub item_name: String,
    #[serde(rename = "Normal Price", default)]
    pub normal_price: String,
    #[serde(rename = "Quantity", default)]
    pub quantity: String,
    #[serde(rename = "UoM", default)]
    pub uom: String,
}

impl ProductRow {
    /// Builds the export projection of one remote item under its owning
    /// category, matching the portal's flattening conventions: `stock` comes
    /// from `weight.count` (0 when absent), `weight` from `weight.value`,
    /// and a missing image becomes an empty string.
    pub fn from_menu_item(category: &MenuCategory, item: &MenuItem) -> Self {
        let weight = item.weight.clone().unwrap_or_default();
        Self {
            category: category.category_name.clone(),
            item_id: item.item_id.clone(),
            item_name: item.item_name.clone(),
            sku_id: item.sku_id.clone(),
            item_code: item.item_code.clone(),
            description: item.description.clone(),
            price_in_min: item.price_in_min.map(|p| p.to_string()).unwrap_or_default(),
            stock: weight.count.unwrap_or(0).to_string(),
            weight: weight.value.map(|v| v.to_string()).unwrap_or_default(),
            unit: weight.unit,
            image_url: item.image_url.clone().unwrap_or_default(),
            item_class_id: item.item_class_id.clone(),
            selling_time_id: item.selling_time_id.clone(),
            category_id: category.category_id.clone(),
            available_status: item
                .available_status
                .map(|s| s.to_string())
                .unwrap_or_default(),
        }
    }
}
