use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque customer details captured at purchase time and stored on the
/// order as a JSONB blob. Field names follow the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: Decimal,
    pub customer_info: Json<CustomerInfo>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A purchased line. There is no separate ticket entity: the order item id
/// doubles as the ticket id.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_info_uses_camel_case_wire_names() {
        let info = CustomerInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            address: None,
            city: None,
            zip_code: Some("10115".to_string()),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["zipCode"], "10115");
        assert!(json.get("zip_code").is_none());
    }

    #[test]
    fn customer_info_optional_fields_default_to_none() {
        let info: CustomerInfo =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert!(info.phone.is_none());
        assert!(info.address.is_none());
    }
}
