use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::raffles::{request_raffle, RaffleRequest};
use super::{RequestHandler, Service, ServiceError};
use crate::models::purchases::{Purchase, PurchaseIntent, SoldNumber, Stats};
use crate::repositories::purchases::PurchaseRepository;
use crate::storage::Storage;

pub enum PurchaseRequest {
    CompletePurchase {
        intent: PurchaseIntent,
        response: oneshot::Sender<Result<Purchase, ServiceError>>,
    },
    ListPurchases {
        response: oneshot::Sender<Result<Vec<Purchase>, ServiceError>>,
    },
    UserPurchases {
        phone: String,
        response: oneshot::Sender<Result<Vec<Purchase>, ServiceError>>,
    },
    NumbersSold {
        response: oneshot::Sender<Result<Vec<SoldNumber>, ServiceError>>,
    },
    Stats {
        response: oneshot::Sender<Result<Stats, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PurchaseRequestHandler {
    repository: PurchaseRepository,
    raffle_channel: mpsc::Sender<RaffleRequest>,
}

impl PurchaseRequestHandler {
    pub fn new(storage: Storage, raffle_channel: mpsc::Sender<RaffleRequest>) -> Self {
        let repository = PurchaseRepository::new(storage);

        PurchaseRequestHandler {
            repository,
            raffle_channel,
        }
    }

    async fn complete_purchase(&self, intent: PurchaseIntent) -> Result<Purchase, ServiceError> {
        if intent.raffle_id.trim().is_empty()
            || intent.qty == 0
            || intent.user_name.trim().is_empty()
            || intent.user_phone.trim().is_empty()
        {
            return Err(ServiceError::Validation(
                "Insufficient data to complete the purchase.".to_string(),
            ));
        }

        let raffle =
            request_raffle("PurchaseService", &self.raffle_channel, &intent.raffle_id).await?;
        if !raffle.is_active() {
            return Err(ServiceError::Validation(format!(
                "Raffle {} is closed.",
                raffle.id
            )));
        }
        if intent.qty < raffle.min_qty {
            return Err(ServiceError::Validation(format!(
                "The minimum quantity for this raffle is {} numbers.",
                raffle.min_qty
            )));
        }

        let purchase = self
            .repository
            .insert_purchase(&intent, &raffle)
            .await
            .map_err(|e| ServiceError::Repository("Purchases".to_string(), e.to_string()))?;

        log::info!(
            "Confirmed purchase {} of {} numbers for raffle {}.",
            purchase.id,
            purchase.qty,
            purchase.raffle_id
        );

        Ok(purchase)
    }

    async fn list_purchases(&self) -> Result<Vec<Purchase>, ServiceError> {
        self.repository
            .list_purchases()
            .await
            .map_err(|e| ServiceError::Repository("Purchases".to_string(), e.to_string()))
    }

    async fn user_purchases(&self, phone: &str) -> Result<Vec<Purchase>, ServiceError> {
        self.repository
            .get_purchases_by_phone(phone.trim())
            .await
            .map_err(|e| ServiceError::Repository("Purchases".to_string(), e.to_string()))
    }

    async fn numbers_sold(&self) -> Result<Vec<SoldNumber>, ServiceError> {
        self.repository
            .numbers_sold()
            .await
            .map_err(|e| ServiceError::Repository("Purchases".to_string(), e.to_string()))
    }

    async fn stats(&self) -> Result<Stats, ServiceError> {
        self.repository
            .stats()
            .await
            .map_err(|e| ServiceError::Repository("Purchases".to_string(), e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<PurchaseRequest> for PurchaseRequestHandler {
    async fn handle_request(&self, request: PurchaseRequest) {
        match request {
            PurchaseRequest::CompletePurchase { intent, response } => {
                let purchase = self.complete_purchase(intent).await;
                if let Err(e) = &purchase {
                    log::error!("Could not complete purchase: {}", e);
                }
                let _ = response.send(purchase);
            }
            PurchaseRequest::ListPurchases { response } => {
                let purchases = self.list_purchases().await;
                let _ = response.send(purchases);
            }
            PurchaseRequest::UserPurchases { phone, response } => {
                let purchases = self.user_purchases(&phone).await;
                let _ = response.send(purchases);
            }
            PurchaseRequest::NumbersSold { response } => {
                let numbers = self.numbers_sold().await;
                let _ = response.send(numbers);
            }
            PurchaseRequest::Stats { response } => {
                let stats = self.stats().await;
                let _ = response.send(stats);
            }
        }
    }
}

pub struct PurchaseService;

impl PurchaseService {
    pub fn new() -> Self {
        PurchaseService {}
    }
}

#[async_trait]
impl Service<PurchaseRequest, PurchaseRequestHandler> for PurchaseService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::raffles::tests::spawn_raffle_service;

    fn intent(qty: u32) -> PurchaseIntent {
        PurchaseIntent {
            raffle_id: "test-raffle".to_string(),
            qty,
            user_name: "Maria Souza".to_string(),
            user_phone: "61999990000".to_string(),
            user_cpf: Some("529.982.247-25".to_string()),
        }
    }

    #[tokio::test]
    async fn completes_purchase_and_lists_it_for_the_buyer() {
        let storage = Storage::memory();
        let handler =
            PurchaseRequestHandler::new(storage.clone(), spawn_raffle_service(storage));

        let purchase = handler.complete_purchase(intent(5)).await.unwrap();
        assert_eq!(purchase.numbers.len(), 5);
        assert_eq!(purchase.amount_in_cents, 250);

        let mine = handler.user_purchases(" 61999990000 ").await.unwrap();
        assert_eq!(mine, vec![purchase]);

        let stats = handler.stats().await.unwrap();
        assert_eq!(stats.total_numbers, 5);
        assert_eq!(stats.total_revenue_in_cents, 250);
    }

    #[tokio::test]
    async fn rejects_incomplete_intents() {
        let storage = Storage::memory();
        let handler =
            PurchaseRequestHandler::new(storage.clone(), spawn_raffle_service(storage));

        let mut no_phone = intent(5);
        no_phone.user_phone = " ".to_string();
        assert!(matches!(
            handler.complete_purchase(no_phone).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(
            handler.complete_purchase(intent(0)).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            handler.complete_purchase(intent(3)).await,
            Err(ServiceError::Validation(_))
        ));

        let mut unknown = intent(5);
        unknown.raffle_id = "nope".to_string();
        assert!(matches!(
            handler.complete_purchase(unknown).await,
            Err(ServiceError::NotFound(_))
        ));

        assert!(handler.list_purchases().await.unwrap().is_empty());
        assert!(handler.numbers_sold().await.unwrap().is_empty());
    }
}
