//! Stored records: users, orders and their embedded line items.
//!
//! Field names on the wire follow the storefront's existing JavaScript client
//! (`paymentMode`, `totalPrice`, `imgSrc`, `orderDate`), hence the renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub number: String,
    pub gender: String,
    pub created_at: DateTime<Utc>,
}

/// A validated registration, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub number: String,
    pub gender: String,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            fullname: self.fullname,
            email: self.email,
            password_hash: self.password_hash,
            number: self.number,
            gender: self.gender,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(rename = "imgSrc", default)]
    pub img_src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub name: String,
    pub place: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub payment_mode: String,
    pub products: Vec<Product>,
    pub total_price: f64,
    pub order_date: DateTime<Utc>,
}

/// A validated checkout, before the store assigns identity and timestamp.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub name: String,
    pub place: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub payment_mode: String,
    pub products: Vec<Product>,
    pub total_price: f64,
}

impl NewOrder {
    pub fn into_order(self) -> Order {
        Order {
            id: Uuid::new_v4(),
            name: self.name,
            place: self.place,
            email: self.email,
            address: self.address,
            pincode: self.pincode,
            payment_mode: self.payment_mode,
            products: self.products,
            total_price: self.total_price,
            order_date: Utc::now(),
        }
    }
}
