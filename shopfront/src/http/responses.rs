use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Order, Product, User};
use crate::session::Role;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub order: Order,
}

/// Admin projection of a user: no id, no password hash.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub fullname: String,
    pub email: String,
    pub number: String,
    pub gender: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            fullname: user.fullname,
            email: user.email,
            number: user.number,
            gender: user.gender,
        }
    }
}

/// Admin projection of an order: business fields only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub name: String,
    pub place: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub payment_mode: String,
    pub order_date: DateTime<Utc>,
    pub total_price: f64,
    pub products: Vec<Product>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            name: order.name,
            place: order.place,
            email: order.email,
            address: order.address,
            pincode: order.pincode,
            payment_mode: order.payment_mode,
            order_date: order.order_date,
            total_price: order.total_price,
            products: order.products,
        }
    }
}
