use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::model::{MenuCategory, Session, Weight};

/// Base URL of the merchant catalog API.
pub const API_BASE: &str = "https://api.grab.com/food/merchant";

/// Item body shared by the create and update paths. The marketplace
/// distinguishes the two by the presence of `itemID`, not by a distinct
/// verb. `priceInMin` stays optional so that a malformed row value travels
/// to the remote as `null` and is rejected by its validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemPayload {
    #[serde(rename = "itemID", skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(rename = "itemName")]
    pub item_name: String,
    #[serde(rename = "availableStatus", skip_serializing_if = "Option::is_none")]
    pub available_status: Option<i32>,
    pub description: String,
    #[serde(rename = "priceInMin")]
    pub price_in_min: Option<i64>,
    pub weight: Weight,
    #[serde(rename = "itemCode")]
    pub item_code: String,
    #[serde(rename = "skuID")]
    pub sku_id: String,
    #[serde(rename = "itemClassID")]
    pub item_class_id: String,
    #[serde(rename = "sellingTimeID")]
    pub selling_time_id: String,
    #[serde(rename = "categoryID")]
    pub category_id: String,
    #[serde(rename = "imageURLs")]
    pub image_urls: Vec<String>,
}

/// Envelope accepted by the upsert endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemUpsertRequest {
    pub item: ItemPayload,
    #[serde(rename = "categoryID")]
    pub category_id: String,
}

/// Body of the stock follow-up call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRequest {
    #[serde(rename = "enableIms")]
    pub enable_inventory_management: bool,
    #[serde(rename = "currentStock")]
    pub current_stock: i64,
}

#[derive(Debug, Serialize)]
struct AvailabilityRequest {
    #[serde(rename = "itemIDs")]
    item_ids: Vec<String>,
    #[serde(rename = "availableStatus")]
    available_status: i32,
}

#[derive(Debug, Serialize)]
struct DeleteRequest {
    #[serde(rename = "itemID")]
    item_id: String,
    #[serde(rename = "menuGroupID")]
    menu_group_id: String,
}

/// What the upsert endpoint reports back. The identifier is optional: some
/// responses omit it, and the engine treats that as a failure to attach
/// stock rather than guessing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertOutcome {
    #[serde(rename = "itemID", default)]
    pub item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MenuResponse {
    #[serde(default)]
    categories: Vec<MenuCategory>,
}

/// The four remote capabilities the reconciliation engine needs. Calls are
/// synchronous from the caller's perspective, carry no internal retry, and
/// surface any non-2xx response as [`SyncError::Remote`].
pub trait CatalogApi {
    /// Fetches the full menu as an ordered sequence of categories with
    /// their items.
    fn fetch_menu(&self) -> Result<Vec<MenuCategory>>;

    /// Creates or updates one item depending on whether the payload carries
    /// an `itemID`.
    fn upsert_item(&self, request: &ItemUpsertRequest) -> Result<UpsertOutcome>;

    /// Enables inventory management and sets the current stock for an item.
    fn set_stock(&self, item_id: &str, request: &StockRequest) -> Result<()>;

    /// Sets the availability status for a batch of items. The engine always
    /// passes exactly one identifier.
    fn set_availability(&self, item_ids: &[String], status: i32) -> Result<()>;

    /// Removes one item from the menu.
    fn delete_item(&self, item_id: &str) -> Result<()>;
}

/// Catalog client backed by the live merchant API.
pub struct HttpCatalogClient {
    http: Client,
    session: Session,
    api_base: String,
}

impl HttpCatalogClient {
    /// Builds a client around an authenticated session.
    pub fn new(session: Session) -> Result<Self> {
        Self::with_base(session, API_BASE)
    }

    /// Builds a client against an alternative base URL.
    pub fn with_base(session: Session, api_base: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            session,
            api_base: api_base.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// Portal headers required on every mutating call.
    fn mutation_headers(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        request
            .header("authorization", &self.session.auth_token)
            .header("merchantid", &self.session.merchant_entity_id)
            .header("merchantgroupid", &self.session.merchant_group_entity_id)
            .header("content-type", "application/json")
            .header("origin", "https://merchant.grab.com")
            .header("referer", "https://merchant.grab.com/")
            .header("requestsource", "troyPortal")
    }
}

impl CatalogApi for HttpCatalogClient {
    fn fetch_menu(&self) -> Result<Vec<MenuCategory>> {
        let response = self
            .http
            .get(self.url("/v2/menu"))
            .header("authorization", &self.session.auth_token)
            .send()?;
        let body = check_response(response)?;
        let menu: MenuResponse = serde_json::from_str(&body)?;
        debug!(category_count = menu.categories.len(), "menu fetched");
        Ok(menu.categories)
    }

    fn upsert_item(&self, request: &ItemUpsertRequest) -> Result<UpsertOutcome> {
        let response = self
            .mutation_headers(self.http.post(self.url("/v2/upsert-item")))
            .json(request)
            .send()?;
        let body = check_response(response)?;
        // Lenient parse: a response without an itemID is still a success at
        // the HTTP level and is resolved by the engine.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    fn set_stock(&self, item_id: &str, request: &StockRequest) -> Result<()> {
        let response = self
            .mutation_headers(self.http.put(self.url(&format!("/v1/items/{item_id}/stock"))))
            .json(request)
            .send()?;
        check_response(response).map(drop)
    }

    fn set_availability(&self, item_ids: &[String], status: i32) -> Result<()> {
        let body = AvailabilityRequest {
            item_ids: item_ids.to_vec(),
            available_status: status,
        };
        let response = self
            .mutation_headers(self.http.put(self.url("/v1/items/available-status")))
            .json(&body)
            .send()?;
        check_response(response).map(drop)
    }

    fn delete_item(&self, item_id: &str) -> Result<()> {
        let body = DeleteRequest {
            item_id: item_id.to_string(),
            menu_group_id: String::new(),
        };
        let response = self
            .mutation_headers(self.http.delete(self.url(&format!("/v2/items/{item_id}"))))
            .json(&body)
            .send()?;
        check_response(response).map(drop)
    }
}

/// Turns a non-2xx response into [`SyncError::Remote`], keeping the best
/// diagnostic text the body offers.
fn check_response(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text()?;
    if status.is_success() {
        return Ok(body);
    }
    Err(SyncError::Remote {
        message: extract_remote_message(status.as_u16(), &body),
    })
}

/// Digs the human-readable message out of the error body. The portal is not
/// consistent about where it puts it, so several shapes are probed before
/// falling back to the raw body.
fn extract_remote_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for path in [["error", "message"], ["error", "msg"]] {
            let message = json
                .get(path[0])
                .and_then(|e| e.get(path[1]))
                .and_then(|m| m.as_str());
            if let Some(message) = message {
                return message.to_string();
            }
        }
        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_prefers_nested_error_message() {
        let body = r#"{"error":{"message":"item not found"}}"#;
        assert_eq!(extract_remote_message(404, body), "item not found");
    }

    #[test]
    fn remote_message_falls_back_to_status() {
        assert_eq!(extract_remote_message(502, "  "), "HTTP 502");
    }

    #[test]
    fn upsert_payload_omits_absent_item_id() {
        let request = ItemUpsertRequest {
            item: ItemPayload {
                item_name: "Es Teh".into(),
                ..ItemPayload::default()
            },
            category_id: "cat-1".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["item"].get("itemID").is_none());
        assert_eq!(json["categoryID"], "cat-1");
    }
}
