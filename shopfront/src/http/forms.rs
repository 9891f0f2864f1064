//! Request bodies and their validation.
//!
//! Every field is optional at the serde level so a missing field becomes a
//! 400 with a readable message instead of a deserialization failure. Blank
//! strings count as missing, and text fields are kept trimmed; passwords are
//! kept exactly as typed. Numeric checkout fields also accept numeric strings.

use axum::extract::FromRequest;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use crate::model::{NewOrder, Product};

use super::error::ApiError;

const MISSING_REGISTRATION: &str = "Please fill in all fields";
const MISSING_LOGIN: &str = "Please enter both email and password";
const MISSING_CHECKOUT: &str = "Missing required fields";

/// `axum::Json` with rejections mapped onto [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirmpassword: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub number: Option<String>,
    pub gender: Option<String>,
}

/// A registration that passed presence checks; the password is still plain.
#[derive(Debug)]
pub struct Registration {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub number: String,
    pub gender: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<Registration, ApiError> {
        let missing = || ApiError::BadRequest(String::from(MISSING_REGISTRATION));
        let fullname = present(self.fullname).ok_or_else(missing)?;
        let email = present(self.email).ok_or_else(missing)?;
        let password = present_secret(self.password).ok_or_else(missing)?;
        let number = present(self.number).ok_or_else(missing)?;
        let gender = present(self.gender).ok_or_else(missing)?;

        if self
            .confirmpassword
            .is_some_and(|confirm| confirm != password)
        {
            return Err(ApiError::BadRequest(String::from("Passwords do not match")));
        }

        Ok(Registration {
            fullname,
            email,
            password,
            number,
            gender,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    pub fn validate(self) -> Result<(String, String), ApiError> {
        match (present(self.email), present_secret(self.password)) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(ApiError::BadRequest(String::from(MISSING_LOGIN))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckoutForm {
    pub name: Option<String>,
    pub place: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "text_or_number")]
    pub pincode: Option<String>,
    pub payment_mode: Option<String>,
    pub products: Option<Vec<ProductForm>>,
    pub total_price: Option<Numeric>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub price: Option<Numeric>,
    pub quantity: Option<Numeric>,
    #[serde(rename = "imgSrc")]
    pub img_src: Option<String>,
}

impl CheckoutForm {
    /// Text fields must be non-blank, `products` non-empty with well-formed
    /// line items, and `totalPrice` a non-negative number (zero allowed).
    pub fn validate(self) -> Result<NewOrder, ApiError> {
        let missing = || ApiError::BadRequest(String::from(MISSING_CHECKOUT));
        let name = present(self.name).ok_or_else(missing)?;
        let place = present(self.place).ok_or_else(missing)?;
        let email = present(self.email).ok_or_else(missing)?;
        let address = present(self.address).ok_or_else(missing)?;
        let pincode = present(self.pincode).ok_or_else(missing)?;
        let payment_mode = present(self.payment_mode).ok_or_else(missing)?;
        let products = self.products.ok_or_else(missing)?;
        let total_price = self.total_price.ok_or_else(missing)?;

        if products.is_empty() {
            return Err(ApiError::BadRequest(String::from(
                "Order must contain at least one product",
            )));
        }
        let total_price = total_price
            .as_f64()
            .filter(|total| total.is_finite() && *total >= 0.0)
            .ok_or_else(|| {
                ApiError::BadRequest(String::from("Total price must be a non-negative number"))
            })?;

        let products = products
            .into_iter()
            .enumerate()
            .map(|(index, product)| product.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewOrder {
            name,
            place,
            email,
            address,
            pincode,
            payment_mode,
            products,
            total_price,
        })
    }
}

impl ProductForm {
    fn validate(self, index: usize) -> Result<Product, ApiError> {
        let invalid = || ApiError::BadRequest(format!("Invalid product at position {}", index + 1));
        let name = present(self.name).ok_or_else(invalid)?;
        let price = self
            .price
            .and_then(|price| price.as_f64())
            .filter(|price| price.is_finite() && *price >= 0.0)
            .ok_or_else(invalid)?;
        let quantity = self
            .quantity
            .and_then(|qty| qty.as_count())
            .filter(|qty| *qty >= 1)
            .ok_or_else(invalid)?;

        Ok(Product {
            name,
            price,
            quantity,
            img_src: self.img_src.unwrap_or_default(),
        })
    }
}

/// Trimmed text, or `None` when absent or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn present_secret(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A numeric field as sent by the client: a JSON number, a numeric string,
/// or something else entirely, which validation then rejects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(serde_json::Number),
    Text(String),
    Other(IgnoredAny),
}

impl Numeric {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }

    /// Whole, non-negative values only; `2.0` counts, `2.5` does not.
    fn as_count(&self) -> Option<u32> {
        if let Self::Number(n) = self {
            if let Some(count) = n.as_u64() {
                return u32::try_from(count).ok();
            }
        }
        self.as_f64()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    }
}

/// Phone numbers and postal codes arrive as strings or bare JSON numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Text>::deserialize(deserializer)?.map(|text| match text {
        Text::String(s) => s,
        Text::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::{CheckoutForm, RegisterForm};

    fn checkout(value: serde_json::Value) -> CheckoutForm {
        serde_json::from_value(value).unwrap()
    }

    fn valid_checkout() -> serde_json::Value {
        json!({
            "name": "A", "place": "B", "email": "a@b.com", "address": "X",
            "pincode": "1", "paymentMode": "COD",
            "products": [{ "name": "p", "price": 10, "quantity": 1, "imgSrc": "x" }],
            "totalPrice": 10
        })
    }

    #[test]
    fn register_accepts_numeric_phone_and_no_confirmation() {
        let form: RegisterForm = serde_json::from_value(json!({
            "fullname": "Asha", "email": "a@b.com", "password": "pw",
            "number": 5550100, "gender": "female"
        }))
        .unwrap();

        let registration = form.validate().unwrap();
        assert_eq!(registration.number, "5550100");
    }

    #[test]
    fn register_treats_blank_as_missing() {
        let form: RegisterForm = serde_json::from_value(json!({
            "fullname": "  ", "email": "a@b.com", "password": "pw",
            "number": "1", "gender": "f"
        }))
        .unwrap();

        assert!(form.validate().is_err());
    }

    #[test]
    fn checkout_accepts_zero_total() {
        let mut body = valid_checkout();
        body["totalPrice"] = json!(0);
        let order = checkout(body).validate().unwrap();
        assert_eq!(order.total_price, 0.0);
        assert_eq!(order.products[0].img_src, "x");
    }

    #[test]
    fn checkout_rejects_negative_total_and_empty_products() {
        let mut negative = valid_checkout();
        negative["totalPrice"] = json!(-1);
        assert!(checkout(negative).validate().is_err());

        let mut empty = valid_checkout();
        empty["products"] = json!([]);
        assert!(checkout(empty).validate().is_err());
    }

    #[test]
    fn register_trims_identity_fields_but_not_password() {
        let form: RegisterForm = serde_json::from_value(json!({
            "fullname": " Asha ", "email": " a@b.com ", "password": " pw ",
            "number": " 1 ", "gender": "f"
        }))
        .unwrap();

        let registration = form.validate().unwrap();
        assert_eq!(registration.fullname, "Asha");
        assert_eq!(registration.email, "a@b.com");
        assert_eq!(registration.number, "1");
        assert_eq!(registration.password, " pw ");
    }

    #[test]
    fn checkout_accepts_numeric_strings_and_whole_floats() {
        let mut body = valid_checkout();
        body["totalPrice"] = json!("10");
        body["products"][0]["price"] = json!("10.5");
        body["products"][0]["quantity"] = json!(2.0);
        let order = checkout(body).validate().unwrap();
        assert_eq!(order.total_price, 10.0);
        assert_eq!(order.products[0].price, 10.5);
        assert_eq!(order.products[0].quantity, 2);
    }

    #[test]
    fn checkout_maps_malformed_numbers_to_checkout_messages() {
        let mut total = valid_checkout();
        total["totalPrice"] = json!("ten");
        assert_eq!(
            checkout(total).validate().unwrap_err().to_string(),
            "Total price must be a non-negative number"
        );

        for quantity in [json!(2.5), json!("two"), json!(true), json!(-1)] {
            let mut body = valid_checkout();
            body["products"][0]["quantity"] = quantity;
            assert_eq!(
                checkout(body).validate().unwrap_err().to_string(),
                "Invalid product at position 1"
            );
        }
    }

    #[test]
    fn checkout_rejects_zero_quantity_line_item() {
        let mut body = valid_checkout();
        body["products"][0]["quantity"] = json!(0);
        let err = checkout(body).validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid product at position 1");
    }
}
