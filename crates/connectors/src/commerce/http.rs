use crate::{
    commerce::{CommerceApi, EntityKind, EntityRef},
    error::ConnectorError,
};
use async_trait::async_trait;
use model::payload::TargetPayload;
use reqwest::{Client, Response, StatusCode, header};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Per-kind endpoint wiring: admin path, list/object envelope keys and the
/// field the entity's display name lives under.
struct KindRoute {
    path: &'static str,
    list_key: &'static str,
    object_key: &'static str,
    name_field: &'static str,
}

fn route(kind: EntityKind) -> KindRoute {
    match kind {
        EntityKind::Category => KindRoute {
            path: "/admin/product-categories",
            list_key: "product_categories",
            object_key: "product_category",
            name_field: "name",
        },
        EntityKind::Collection => KindRoute {
            path: "/admin/collections",
            list_key: "collections",
            object_key: "collection",
            name_field: "title",
        },
        EntityKind::ProductType => KindRoute {
            path: "/admin/product-types",
            list_key: "product_types",
            object_key: "product_type",
            name_field: "value",
        },
        EntityKind::Tag => KindRoute {
            path: "/admin/product-tags",
            list_key: "product_tags",
            object_key: "product_tag",
            name_field: "value",
        },
    }
}

pub struct HttpCommerceClient {
    client: Client,
    base_url: String,
}

impl HttpCommerceClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ConnectorError> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            ConnectorError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("invalid API token: {e}"),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(HttpCommerceClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Maps non-success responses into the error taxonomy. SKU/handle
    /// collisions become `DuplicateConflict` so callers can surface them
    /// as a specific, actionable kind.
    async fn check(resource: &str, response: Response) -> Result<Value, ConnectorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let lowered = body.to_lowercase();
        // Only trust the body's wording on statuses that can mean a
        // collision; a 5xx error page mentioning "duplicate" must stay
        // retryable.
        let looks_duplicate = status == StatusCode::CONFLICT
            || (status == StatusCode::UNPROCESSABLE_ENTITY
                && (lowered.contains("already exists") || lowered.contains("duplicate")));
        if looks_duplicate {
            return Err(ConnectorError::DuplicateConflict {
                resource: resource.to_string(),
                detail: body,
            });
        }
        Err(ConnectorError::ApiRejected {
            status: status.as_u16(),
            body,
        })
    }

    fn entity_from(value: &Value, name_field: &str) -> Result<EntityRef, ConnectorError> {
        let id = value["id"].as_str().ok_or_else(|| {
            ConnectorError::UnexpectedResponse("entity without an id".to_string())
        })?;
        Ok(EntityRef {
            id: id.to_string(),
            name: value[name_field].as_str().unwrap_or_default().to_string(),
        })
    }

    async fn first_or_create(
        &self,
        resource: &str,
        list_path: &str,
        list_key: &str,
        object_key: &str,
        create_body: Value,
    ) -> Result<EntityRef, ConnectorError> {
        let response = self
            .client
            .get(self.url(list_path))
            .query(&[("limit", "1")])
            .send()
            .await?;
        let listing = Self::check(resource, response).await?;
        if let Some(first) = listing[list_key].as_array().and_then(|a| a.first()) {
            return Self::entity_from(first, "name");
        }

        debug!(resource, "No existing entity at target, creating default");
        let response = self
            .client
            .post(self.url(list_path))
            .json(&create_body)
            .send()
            .await?;
        let created = Self::check(resource, response).await?;
        Self::entity_from(&created[object_key], "name")
    }

    fn product_body(payload: &TargetPayload) -> Value {
        let variants: Vec<Value> = payload
            .variants
            .iter()
            .map(|v| {
                json!({
                    "title": v.title,
                    "sku": v.sku,
                    "options": v.options,
                    "prices": [{
                        "amount": v.price_minor,
                        "currency_code": payload.currency_code,
                    }],
                    "inventory_quantity": v.inventory_quantity,
                    "weight": v.weight_g,
                    "length": v.length_mm,
                    "width": v.width_mm,
                    "height": v.height_mm,
                })
            })
            .collect();

        json!({
            "title": payload.title,
            "handle": payload.handle,
            "description": payload.description,
            "thumbnail": payload.thumbnail,
            "images": payload.images.iter().map(|u| json!({"url": u})).collect::<Vec<_>>(),
            "weight": payload.dimensions.weight_kg,
            "length": payload.dimensions.length_cm,
            "width": payload.dimensions.width_cm,
            "height": payload.dimensions.height_cm,
            "options": payload.options,
            "variants": variants,
            "categories": payload.category_ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
            "collection_id": payload.collection_id,
            "type_id": payload.type_id,
            "tags": payload.tag_ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
            "sales_channels": [{"id": payload.sales_channel_id}],
            "metadata": payload.metadata,
        })
    }
}

#[async_trait]
impl CommerceApi for HttpCommerceClient {
    async fn default_sales_channel(&self) -> Result<EntityRef, ConnectorError> {
        self.first_or_create(
            "sales channel",
            "/admin/sales-channels",
            "sales_channels",
            "sales_channel",
            json!({"name": "Default Sales Channel"}),
        )
        .await
    }

    async fn default_stock_location(&self) -> Result<EntityRef, ConnectorError> {
        self.first_or_create(
            "stock location",
            "/admin/stock-locations",
            "stock_locations",
            "stock_location",
            json!({"name": "Default Location"}),
        )
        .await
    }

    async fn find_entity(
        &self,
        kind: EntityKind,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<EntityRef>, ConnectorError> {
        let route = route(kind);
        let response = self
            .client
            .get(self.url(route.path))
            .query(&[("q", name)])
            .send()
            .await?;
        let listing = Self::check(kind.as_str(), response).await?;

        let Some(items) = listing[route.list_key].as_array() else {
            return Ok(None);
        };
        for item in items {
            let item_name = item[route.name_field].as_str().unwrap_or_default();
            if !item_name.eq_ignore_ascii_case(name) {
                continue;
            }
            if kind == EntityKind::Category {
                let item_parent = item["parent_category_id"].as_str();
                if item_parent != parent_id {
                    continue;
                }
            }
            return Self::entity_from(item, route.name_field).map(Some);
        }
        Ok(None)
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<EntityRef, ConnectorError> {
        let route = route(kind);
        let mut body = json!({ route.name_field: name });
        if kind == EntityKind::Category && let Some(parent) = parent_id {
            body["parent_category_id"] = json!(parent);
        }

        let response = self
            .client
            .post(self.url(route.path))
            .json(&body)
            .send()
            .await?;
        let created = Self::check(kind.as_str(), response).await?;
        Self::entity_from(&created[route.object_key], route.name_field)
    }

    async fn find_product_by_handle(
        &self,
        handle: &str,
    ) -> Result<Option<String>, ConnectorError> {
        let response = self
            .client
            .get(self.url("/admin/products"))
            .query(&[("handle", handle)])
            .send()
            .await?;
        let listing = Self::check("product", response).await?;
        Ok(listing["products"]
            .as_array()
            .and_then(|a| a.first())
            .and_then(|p| p["id"].as_str())
            .map(String::from))
    }

    async fn create_product(&self, payload: &TargetPayload) -> Result<String, ConnectorError> {
        let response = self
            .client
            .post(self.url("/admin/products"))
            .json(&Self::product_body(payload))
            .send()
            .await?;
        let created = Self::check("product", response).await?;
        created["product"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                ConnectorError::UnexpectedResponse("created product without an id".to_string())
            })
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), ConnectorError> {
        let response = self
            .client
            .delete(self.url(&format!("/admin/products/{product_id}")))
            .send()
            .await?;
        Self::check("product", response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpCommerceClient {
        HttpCommerceClient::new(&server.uri(), "test-token", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn find_entity_matches_case_insensitively() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/product-types"))
            .and(query_param("q", "kettles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_types": [{"id": "ptyp_1", "value": "Kettles"}]
            })))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_entity(EntityKind::ProductType, "kettles", None)
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "ptyp_1");
    }

    #[tokio::test]
    async fn category_match_respects_parent_scope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/product-categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "product_categories": [
                    {"id": "cat_a", "name": "Accessories", "parent_category_id": "cat_kitchen"},
                    {"id": "cat_b", "name": "Accessories", "parent_category_id": "cat_garden"}
                ]
            })))
            .mount(&server)
            .await;

        let found = client(&server)
            .find_entity(EntityKind::Category, "accessories", Some("cat_garden"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "cat_b");

        let none = client(&server)
            .find_entity(EntityKind::Category, "accessories", Some("cat_office"))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn duplicate_sku_is_surfaced_as_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/products"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_string("Product with sku KET-100 already exists"),
            )
            .mount(&server)
            .await;

        let payload_json = serde_json::json!({
            "handle": "kettle", "title": "Kettle", "description": null,
            "thumbnail": "https://img/x.jpg", "images": ["https://img/x.jpg"],
            "dimensions": {"weight_kg": null, "length_cm": null, "width_cm": null, "height_cm": null},
            "options": [{"title": "Title", "values": ["Default"]}],
            "variants": [{"title": "Default", "sku": "KET-100",
                "options": {"Title": "Default"}, "price_minor": 1000,
                "inventory_quantity": 0, "weight_g": null, "length_mm": null,
                "width_mm": null, "height_mm": null}],
            "currency_code": "EUR", "discount_percent": 0,
            "category_ids": [], "collection_id": null, "type_id": null,
            "tag_ids": [], "sales_channel_id": "sc_1", "metadata": {}
        });
        let payload: TargetPayload = serde_json::from_value(payload_json).unwrap();

        let err = client(&server).create_product(&payload).await.unwrap_err();
        assert!(matches!(err, ConnectorError::DuplicateConflict { .. }));
    }

    #[tokio::test]
    async fn server_error_mentioning_duplicate_stays_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/product-tags"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string("gateway error: duplicate request id, please retry"),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .find_entity(EntityKind::Tag, "steel", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ApiRejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn default_channel_created_when_listing_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/sales-channels"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"sales_channels": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admin/sales-channels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sales_channel": {"id": "sc_new", "name": "Default Sales Channel"}
            })))
            .mount(&server)
            .await;

        let channel = client(&server).default_sales_channel().await.unwrap();
        assert_eq!(channel.id, "sc_new");
    }
}
