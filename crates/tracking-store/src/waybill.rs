use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{DeliveryType, TrackingCode, UserId, WaybillId, WaybillStatus};

/// The cached projection of a waybill.
///
/// `status` always mirrors the status of the newest tracking event; the
/// event history remains the source of truth. `tracking_code` is immutable
/// for the lifetime of the waybill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waybill {
    pub id: WaybillId,
    pub tracking_code: TrackingCode,

    /// The user who created the waybill.
    pub sender: UserId,

    /// The driver currently assigned, if any.
    pub driver: Option<UserId>,

    pub receiver_name: String,
    pub receiver_phone: String,
    pub receiver_address: String,

    pub package_details: String,
    pub package_weight: Option<String>,
    pub delivery_type: DeliveryType,

    pub status: WaybillStatus,

    /// Object key of the uploaded proof-of-delivery photo, if any.
    pub proof_of_delivery_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set exactly once, when the waybill first reaches `Delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Waybill {
    /// Creates a new waybill builder.
    pub fn builder() -> WaybillBuilder {
        WaybillBuilder::default()
    }
}

/// Builder for constructing waybills.
#[derive(Debug, Default)]
pub struct WaybillBuilder {
    id: Option<WaybillId>,
    tracking_code: Option<TrackingCode>,
    sender: Option<UserId>,
    driver: Option<UserId>,
    receiver_name: Option<String>,
    receiver_phone: Option<String>,
    receiver_address: Option<String>,
    package_details: Option<String>,
    package_weight: Option<String>,
    delivery_type: DeliveryType,
    status: WaybillStatus,
    created_at: Option<DateTime<Utc>>,
}

impl WaybillBuilder {
    /// Sets the waybill ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: WaybillId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the tracking code.
    pub fn tracking_code(mut self, code: TrackingCode) -> Self {
        self.tracking_code = Some(code);
        self
    }

    /// Sets the sender.
    pub fn sender(mut self, sender: UserId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the assigned driver.
    pub fn driver(mut self, driver: UserId) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Sets the receiver's name.
    pub fn receiver_name(mut self, name: impl Into<String>) -> Self {
        self.receiver_name = Some(name.into());
        self
    }

    /// Sets the receiver's phone number.
    pub fn receiver_phone(mut self, phone: impl Into<String>) -> Self {
        self.receiver_phone = Some(phone.into());
        self
    }

    /// Sets the receiver's address.
    pub fn receiver_address(mut self, address: impl Into<String>) -> Self {
        self.receiver_address = Some(address.into());
        self
    }

    /// Sets the package description.
    pub fn package_details(mut self, details: impl Into<String>) -> Self {
        self.package_details = Some(details.into());
        self
    }

    /// Sets the declared package weight.
    pub fn package_weight(mut self, weight: impl Into<String>) -> Self {
        self.package_weight = Some(weight.into());
        self
    }

    /// Sets the delivery type. Defaults to standard.
    pub fn delivery_type(mut self, delivery_type: DeliveryType) -> Self {
        self.delivery_type = delivery_type;
        self
    }

    /// Sets the initial status. Defaults to pending.
    pub fn status(mut self, status: WaybillStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the creation time. If not set, the current time will be used.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Builds the waybill.
    ///
    /// # Panics
    ///
    /// Panics if required fields (tracking_code, sender, receiver_name,
    /// receiver_phone, receiver_address, package_details) are not set.
    pub fn build(self) -> Waybill {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Waybill {
            id: self.id.unwrap_or_default(),
            tracking_code: self.tracking_code.expect("tracking_code is required"),
            sender: self.sender.expect("sender is required"),
            driver: self.driver,
            receiver_name: self.receiver_name.expect("receiver_name is required"),
            receiver_phone: self.receiver_phone.expect("receiver_phone is required"),
            receiver_address: self.receiver_address.expect("receiver_address is required"),
            package_details: self.package_details.expect("package_details is required"),
            package_weight: self.package_weight,
            delivery_type: self.delivery_type,
            status: self.status,
            proof_of_delivery_url: None,
            created_at,
            updated_at: created_at,
            delivered_at: None,
        }
    }

    /// Tries to build the waybill, returning None if required fields are missing.
    pub fn try_build(self) -> Option<Waybill> {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Some(Waybill {
            id: self.id.unwrap_or_default(),
            tracking_code: self.tracking_code?,
            sender: self.sender?,
            driver: self.driver,
            receiver_name: self.receiver_name?,
            receiver_phone: self.receiver_phone?,
            receiver_address: self.receiver_address?,
            package_details: self.package_details?,
            package_weight: self.package_weight,
            delivery_type: self.delivery_type,
            status: self.status,
            proof_of_delivery_url: None,
            created_at,
            updated_at: created_at,
            delivered_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let waybill = Waybill::builder()
            .tracking_code(TrackingCode::generate())
            .sender(UserId::new())
            .receiver_name("Jane Wanjiku")
            .receiver_phone("+254700000000")
            .receiver_address("12 Riverside Drive, Nairobi")
            .package_details("Documents")
            .build();

        assert_eq!(waybill.status, WaybillStatus::Pending);
        assert_eq!(waybill.delivery_type, DeliveryType::Standard);
        assert!(waybill.driver.is_none());
        assert!(waybill.delivered_at.is_none());
        assert_eq!(waybill.created_at, waybill.updated_at);
    }

    #[test]
    fn try_build_returns_none_on_missing_fields() {
        let result = Waybill::builder()
            .sender(UserId::new())
            .receiver_name("Jane")
            .try_build();
        assert!(result.is_none());
    }
}
