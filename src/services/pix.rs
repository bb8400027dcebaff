use super::raffles::{request_raffle, RaffleRequest};
use super::RequestHandler;
use super::Service;
use super::ServiceError;

use crate::models::pix::{CheckoutRequest, PixCharge, VerifiedPayload};
use crate::pix::{decode_payload, Amount, BrCode};
use crate::settings;

use async_trait::async_trait;
use reqwest::Url;
use tokio::sync::{mpsc, oneshot};

pub enum PixServiceRequest {
    Charge {
        request: CheckoutRequest,
        response: oneshot::Sender<Result<PixCharge, ServiceError>>,
    },
    Verify {
        qr_copy_paste: String,
        response: oneshot::Sender<Result<VerifiedPayload, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PixRequestHandler {
    key: String,
    merchant_name: String,
    merchant_city: String,
    qr_image_url: String,
    qr_size: u32,
    raffle_channel: mpsc::Sender<RaffleRequest>,
}

impl PixRequestHandler {
    pub fn new(
        pix: &settings::Pix,
        qr: &settings::Qr,
        raffle_channel: mpsc::Sender<RaffleRequest>,
    ) -> Self {
        PixRequestHandler {
            key: pix.key.clone(),
            merchant_name: pix.merchant_name.clone(),
            merchant_city: pix.merchant_city.clone(),
            qr_image_url: qr.image_url.clone(),
            qr_size: qr.size,
            raffle_channel,
        }
    }

    /// Prices the selection and renders the payload. Nothing is stored until
    /// the buyer confirms the payment.
    async fn create_charge(&self, request: CheckoutRequest) -> Result<PixCharge, ServiceError> {
        request
            .identity
            .validate()
            .map_err(ServiceError::Validation)?;

        let raffle = request_raffle("PixService", &self.raffle_channel, &request.raffle_id).await?;
        if !raffle.is_active() {
            return Err(ServiceError::Validation(format!(
                "Raffle {} is closed.",
                raffle.id
            )));
        }
        if request.qty < raffle.min_qty {
            return Err(ServiceError::Validation(format!(
                "The minimum quantity for this raffle is {} numbers.",
                raffle.min_qty
            )));
        }

        let amount_in_cents = raffle
            .price_in_cents
            .checked_mul(request.qty as u64)
            .ok_or_else(|| ServiceError::Validation("Quantity is too large.".to_string()))?;
        let amount = Amount::from_cents(amount_in_cents)?;

        let qr_copy_paste = BrCode::new(&self.key, amount)
            .merchant(&self.merchant_name, &self.merchant_city)
            .encode()?;
        let qr_image_url = self.qr_image_url(&qr_copy_paste)?;

        log::info!(
            "Generated PIX charge of R$ {} for raffle {} ({} numbers).",
            amount,
            raffle.id,
            request.qty
        );

        Ok(PixCharge {
            raffle_id: raffle.id,
            raffle_name: raffle.name,
            qty: request.qty,
            amount_in_cents,
            qr_copy_paste,
            qr_image_url,
        })
    }

    fn qr_image_url(&self, payload: &str) -> Result<String, ServiceError> {
        let size = format!("{}x{}", self.qr_size, self.qr_size);
        let url = Url::parse_with_params(
            &self.qr_image_url,
            &[("size", size.as_str()), ("data", payload)],
        )
        .map_err(|e| ServiceError::Internal(format!("Invalid QR image URL: {}", e)))?;

        Ok(url.to_string())
    }

    fn verify_payload(&self, qr_copy_paste: &str) -> Result<VerifiedPayload, ServiceError> {
        let decoded = decode_payload(qr_copy_paste.trim())?;

        Ok(decoded.into())
    }
}

#[async_trait]
impl RequestHandler<PixServiceRequest> for PixRequestHandler {
    async fn handle_request(&self, request: PixServiceRequest) {
        match request {
            PixServiceRequest::Charge { request, response } => {
                let charge = self.create_charge(request).await;
                if let Err(e) = &charge {
                    log::warn!("Could not create PIX charge: {}", e);
                }
                let _ = response.send(charge);
            }
            PixServiceRequest::Verify {
                qr_copy_paste,
                response,
            } => {
                let verified = self.verify_payload(&qr_copy_paste);
                let _ = response.send(verified);
            }
        }
    }
}

pub struct PixService;

impl PixService {
    pub fn new() -> Self {
        PixService {}
    }
}

#[async_trait]
impl Service<PixServiceRequest, PixRequestHandler> for PixService {}
