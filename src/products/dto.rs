use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::coerce;
use crate::error::AppError;
use crate::products::repo_types::Product;

/// Body of POST /products and PUT /products/:id. `quantity` sets the count on hand.
#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(deserialize_with = "coerce::decimal")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "coerce::int")]
    pub quantity: i32,
}

impl ProductInput {
    pub fn into_product(self, id: Uuid) -> Result<Product, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("product name must not be empty".into()));
        }
        if self.price.is_sign_negative() {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        if self.quantity < 0 {
            return Err(AppError::Validation("quantity must not be negative".into()));
        }
        Ok(Product {
            id,
            name: name.to_string(),
            price: self.price.round_dp(2),
            quantity: self.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn product_input_accepts_strings_and_rounds_price() {
        let input: ProductInput =
            serde_json::from_str(r#"{"name": " Tea ", "price": "1.257", "quantity": "4"}"#).unwrap();
        let product = input.into_product(Uuid::new_v4()).unwrap();
        assert_eq!(product.name, "Tea");
        assert_eq!(product.price, dec!(1.26));
        assert_eq!(product.quantity, 4);
    }

    #[test]
    fn product_input_rejects_bad_values() {
        for body in [
            r#"{"name": "", "price": 1}"#,
            r#"{"name": "Tea", "price": -1}"#,
            r#"{"name": "Tea", "price": 1, "quantity": -3}"#,
        ] {
            let input: ProductInput = serde_json::from_str(body).unwrap();
            assert!(matches!(input.into_product(Uuid::new_v4()), Err(AppError::Validation(_))));
        }
    }
}
