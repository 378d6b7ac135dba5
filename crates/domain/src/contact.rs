//! Customer contact details and addresses shared across contexts.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email pattern"));

// Romanian mobile numbers: +407xxxxxxxx or 07xxxxxxxx.
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+40|0)7\d{8}$").expect("valid phone pattern"));

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid postal code pattern"));

pub const DEFAULT_COUNTRY: &str = "Romania";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Invalid {field}: {value}")]
    InvalidFormat { field: &'static str, value: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidCommand
    }
}

fn required(field: &'static str, value: impl Into<String>) -> Result<String, ValidationError> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(value)
}

fn matching(
    field: &'static str,
    pattern: &Regex,
    value: impl Into<String>,
) -> Result<String, ValidationError> {
    let value = required(field, value)?;
    if !pattern.is_match(&value) {
        return Err(ValidationError::InvalidFormat { field, value });
    }
    Ok(value)
}

/// Who placed an order and how to reach them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    name: String,
    email: String,
    phone: String,
}

impl CustomerInfo {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", name)?,
            email: matching("email", &EMAIL, email)?,
            phone: matching("phone", &PHONE, phone)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }
}

/// Billing/shipping address attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    street: String,
    city: String,
    county: String,
    postal_code: String,
    country: String,
}

impl ShippingAddress {
    /// Builds an address in the default country.
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        county: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            street: required("street", street)?,
            city: required("city", city)?,
            county: required("county", county)?,
            postal_code: matching("postal code", &POSTAL_CODE, postal_code)?,
            country: DEFAULT_COUNTRY.to_string(),
        })
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Result<Self, ValidationError> {
        self.country = required("country", country)?;
        Ok(self)
    }

    /// Re-checks every field. Always true for addresses built through
    /// [`new`](Self::new), but state restored from storage is not
    /// re-validated on load.
    pub fn is_valid(&self) -> bool {
        [&self.street, &self.city, &self.county, &self.country]
            .iter()
            .all(|f| !f.trim().is_empty())
            && POSTAL_CODE.is_match(&self.postal_code)
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn county(&self) -> &str {
        &self.county
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

/// Where a shipment is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    recipient_name: String,
    street: String,
    city: String,
    postal_code: String,
    country: String,
    phone: Option<String>,
    additional_info: Option<String>,
}

impl DeliveryAddress {
    pub fn new(
        recipient_name: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            recipient_name: required("recipient name", recipient_name)?,
            street: required("street", street)?,
            city: required("city", city)?,
            postal_code: required("postal code", postal_code)?,
            country: required("country", country)?,
            phone: None,
            additional_info: None,
        })
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        self.additional_info = Some(info.into());
        self
    }

    pub fn recipient_name(&self) -> &str {
        &self.recipient_name
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn additional_info(&self) -> Option<&str> {
        self.additional_info.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_info_validates_email_and_phone() {
        let info = CustomerInfo::new("Ana Pop", "ana@example.ro", "0722123456").unwrap();
        assert_eq!(info.email(), "ana@example.ro");

        assert!(CustomerInfo::new("Ana Pop", "+40722123456", "+40722123456").is_err());
        assert!(CustomerInfo::new("Ana Pop", "ana@example.ro", "+40722123456").is_ok());
        assert_eq!(
            CustomerInfo::new("Ana Pop", "ana@example.ro", "0622123456"),
            Err(ValidationError::InvalidFormat {
                field: "phone",
                value: "0622123456".to_string()
            })
        );
        assert_eq!(
            CustomerInfo::new("  ", "ana@example.ro", "0722123456"),
            Err(ValidationError::Required("name"))
        );
    }

    #[test]
    fn shipping_address_requires_six_digit_postal_code() {
        let address = ShippingAddress::new("Str. Lunga 1", "Brasov", "Brasov", "500035").unwrap();
        assert_eq!(address.country(), DEFAULT_COUNTRY);
        assert!(address.is_valid());

        assert!(matches!(
            ShippingAddress::new("Str. Lunga 1", "Brasov", "Brasov", "5000"),
            Err(ValidationError::InvalidFormat { field: "postal code", .. })
        ));
    }

    #[test]
    fn delivery_address_optional_fields() {
        let address = DeliveryAddress::new("Ion", "Calea Victoriei 10", "Bucuresti", "010061", "Romania")
            .unwrap()
            .with_phone("0722000000");
        assert_eq!(address.phone(), Some("0722000000"));
        assert_eq!(address.additional_info(), None);

        assert_eq!(
            DeliveryAddress::new("", "Calea Victoriei 10", "Bucuresti", "010061", "Romania"),
            Err(ValidationError::Required("recipient name"))
        );
    }
}
