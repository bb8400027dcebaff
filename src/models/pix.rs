use serde::{Deserialize, Serialize};

use super::users::Identity;
use crate::pix::DecodedPayload;

#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutRequest {
    pub raffle_id: String,
    pub qty: u32,
    pub identity: Identity,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PixCharge {
    pub raffle_id: String,
    pub raffle_name: String,
    pub qty: u32,
    pub amount_in_cents: u64,
    pub qr_copy_paste: String,
    pub qr_image_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerifyRequest {
    pub qr_copy_paste: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct VerifiedPayload {
    pub key: String,
    pub amount: Option<String>,
    pub merchant_name: String,
    pub merchant_city: String,
    pub reference_label: Option<String>,
}

impl From<DecodedPayload> for VerifiedPayload {
    fn from(decoded: DecodedPayload) -> Self {
        VerifiedPayload {
            key: decoded.key,
            amount: decoded.amount.map(|a| a.to_string()),
            merchant_name: decoded.merchant_name,
            merchant_city: decoded.merchant_city,
            reference_label: decoded.reference_label,
        }
    }
}
