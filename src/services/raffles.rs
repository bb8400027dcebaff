use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::{ask, RequestHandler, Service, ServiceError};
use crate::models::raffles::{NewWinner, Raffle, Winner};
use crate::pix::Amount;
use crate::repositories::purchases::TICKET_SPACE;
use crate::repositories::raffles::RaffleRepository;
use crate::storage::Storage;

pub enum RaffleRequest {
    ListRaffles {
        active_only: bool,
        response: oneshot::Sender<Result<Vec<Raffle>, ServiceError>>,
    },
    GetRaffle {
        id: String,
        response: oneshot::Sender<Result<Option<Raffle>, ServiceError>>,
    },
    SaveRaffle {
        raffle: Raffle,
        response: oneshot::Sender<Result<Raffle, ServiceError>>,
    },
    DeleteRaffle {
        id: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    ListWinners {
        response: oneshot::Sender<Result<Vec<Winner>, ServiceError>>,
    },
    SaveWinner {
        winner: NewWinner,
        response: oneshot::Sender<Result<Winner, ServiceError>>,
    },
}

/// Looks a raffle up through the raffle service.
pub async fn request_raffle(
    caller: &str,
    channel: &mpsc::Sender<RaffleRequest>,
    id: &str,
) -> Result<Raffle, ServiceError> {
    let id = id.to_string();
    ask(caller, channel, |response| RaffleRequest::GetRaffle {
        id: id.clone(),
        response,
    })
    .await?
    .ok_or_else(|| ServiceError::NotFound(format!("raffle {}", id)))
}

#[derive(Clone)]
pub struct RaffleRequestHandler {
    repository: RaffleRepository,
}

impl RaffleRequestHandler {
    pub fn new(storage: Storage) -> Self {
        let repository = RaffleRepository::new(storage);

        RaffleRequestHandler { repository }
    }

    async fn list_raffles(&self, active_only: bool) -> Result<Vec<Raffle>, ServiceError> {
        let raffles = self
            .repository
            .list_raffles()
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))?;

        Ok(raffles
            .into_iter()
            .filter(|raffle| !active_only || raffle.is_active())
            .collect())
    }

    async fn get_raffle(&self, id: &str) -> Result<Option<Raffle>, ServiceError> {
        self.repository
            .get_raffle(id)
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))
    }

    async fn save_raffle(&self, raffle: Raffle) -> Result<Raffle, ServiceError> {
        if raffle.id.trim().is_empty() || raffle.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Raffle id and name are required.".to_string(),
            ));
        }
        if raffle.image_url.trim().is_empty() {
            return Err(ServiceError::Validation("Image is required.".to_string()));
        }
        if raffle.price_in_cents == 0 || raffle.min_qty == 0 {
            return Err(ServiceError::Validation(
                "Price and minimum quantity must be positive.".to_string(),
            ));
        }
        // buying every ticket must still produce an encodable amount
        raffle
            .price_in_cents
            .checked_mul(TICKET_SPACE as u64)
            .ok_or_else(|| ServiceError::Validation("Price is too high.".to_string()))
            .and_then(|total| {
                Amount::from_cents(total)
                    .map_err(|_| ServiceError::Validation("Price is too high.".to_string()))
            })?;

        let raffle = self
            .repository
            .save_raffle(raffle)
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))?;
        log::info!("Saved raffle {}.", raffle.id);

        Ok(raffle)
    }

    async fn delete_raffle(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self
            .repository
            .delete_raffle(id)
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))?;

        if !deleted {
            return Err(ServiceError::NotFound(format!("raffle {}", id)));
        }
        log::info!("Deleted raffle {}.", id);

        Ok(())
    }

    async fn list_winners(&self) -> Result<Vec<Winner>, ServiceError> {
        self.repository
            .list_winners()
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))
    }

    async fn save_winner(&self, winner: NewWinner) -> Result<Winner, ServiceError> {
        if winner.user_name.trim().is_empty() || winner.number.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Winner name and number are required.".to_string(),
            ));
        }

        let winner = Winner {
            raffle_id: winner.raffle_id,
            raffle_name: winner.raffle_name,
            user_name: winner.user_name,
            number: winner.number,
            date: winner.date.unwrap_or_else(chrono::Utc::now),
        };

        self.repository
            .insert_winner(winner)
            .await
            .map_err(|e| ServiceError::Repository("Raffles".to_string(), e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<RaffleRequest> for RaffleRequestHandler {
    async fn handle_request(&self, request: RaffleRequest) {
        match request {
            RaffleRequest::ListRaffles {
                active_only,
                response,
            } => {
                let raffles = self.list_raffles(active_only).await;
                let _ = response.send(raffles);
            }
            RaffleRequest::GetRaffle { id, response } => {
                let raffle = self.get_raffle(&id).await;
                let _ = response.send(raffle);
            }
            RaffleRequest::SaveRaffle { raffle, response } => {
                let raffle = self.save_raffle(raffle).await;
                let _ = response.send(raffle);
            }
            RaffleRequest::DeleteRaffle { id, response } => {
                let result = self.delete_raffle(&id).await;
                let _ = response.send(result);
            }
            RaffleRequest::ListWinners { response } => {
                let winners = self.list_winners().await;
                let _ = response.send(winners);
            }
            RaffleRequest::SaveWinner { winner, response } => {
                let winner = self.save_winner(winner).await;
                let _ = response.send(winner);
            }
        }
    }
}

pub struct RaffleService;

impl RaffleService {
    pub fn new() -> Self {
        RaffleService {}
    }
}

#[async_trait]
impl Service<RaffleRequest, RaffleRequestHandler> for RaffleService {}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::raffles::RaffleStatus;

    pub(crate) fn spawn_raffle_service(storage: Storage) -> mpsc::Sender<RaffleRequest> {
        let (raffle_tx, mut raffle_rx) = mpsc::channel(16);
        let mut service = RaffleService::new();
        let handler = RaffleRequestHandler::new(storage);

        tokio::spawn(async move {
            service.run(handler, &mut raffle_rx).await;
        });

        raffle_tx
    }

    pub(crate) fn raffle(id: &str, status: RaffleStatus) -> Raffle {
        Raffle {
            id: id.to_string(),
            name: "AK-47 Redline".to_string(),
            description: "Field-Tested".to_string(),
            image_url: "https://example.com/ak.png".to_string(),
            price_in_cents: 150,
            min_qty: 10,
            status,
        }
    }

    #[tokio::test]
    async fn filters_active_raffles() {
        let channel = spawn_raffle_service(Storage::memory());

        for raffle in [
            raffle("open", RaffleStatus::Active),
            raffle("done", RaffleStatus::Closed),
        ] {
            ask("test", &channel, |response| RaffleRequest::SaveRaffle { raffle, response })
                .await
                .unwrap();
        }

        let all = ask("test", &channel, |response| RaffleRequest::ListRaffles {
            active_only: false,
            response,
        })
        .await
        .unwrap();
        let active = ask("test", &channel, |response| RaffleRequest::ListRaffles {
            active_only: true,
            response,
        })
        .await
        .unwrap();

        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["test-raffle", "open", "done"]);
        let active: Vec<&str> = active.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(active, vec!["test-raffle", "open"]);
    }

    #[tokio::test]
    async fn rejects_raffle_without_image() {
        let channel = spawn_raffle_service(Storage::memory());
        let mut no_image = raffle("open", RaffleStatus::Active);
        no_image.image_url = String::new();

        let result = ask("test", &channel, |response| RaffleRequest::SaveRaffle {
            raffle: no_image,
            response,
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn rejects_prices_that_cannot_be_charged() {
        let channel = spawn_raffle_service(Storage::memory());

        for price_in_cents in [u64::MAX / 2, 10_000_000_000] {
            let mut pricey = raffle("pricey", RaffleStatus::Active);
            pricey.price_in_cents = price_in_cents;
            let result = ask("test", &channel, |response| RaffleRequest::SaveRaffle {
                raffle: pricey,
                response,
            })
            .await;
            assert!(matches!(result, Err(ServiceError::Validation(_))));
        }

        // 99999.99 per ticket, 9999999000.00 for all of them
        let mut top = raffle("top", RaffleStatus::Active);
        top.price_in_cents = 9_999_999;
        ask("test", &channel, |response| RaffleRequest::SaveRaffle {
            raffle: top,
            response,
        })
        .await
        .unwrap();
        assert!(request_raffle("test", &channel, "pricey").await.is_err());
    }

    #[tokio::test]
    async fn request_raffle_reports_missing() {
        let channel = spawn_raffle_service(Storage::memory());

        let placeholder = request_raffle("test", &channel, "test-raffle").await.unwrap();
        assert_eq!(placeholder, Raffle::placeholder());

        let missing = request_raffle("test", &channel, "nope").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let deleted = ask("test", &channel, |response| RaffleRequest::DeleteRaffle {
            id: "nope".to_string(),
            response,
        })
        .await;
        assert!(matches!(deleted, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn winners_get_a_date() {
        let channel = spawn_raffle_service(Storage::memory());

        let winner = ask("test", &channel, |response| RaffleRequest::SaveWinner {
            winner: NewWinner {
                raffle_id: "test-raffle".to_string(),
                raffle_name: "Produto Teste".to_string(),
                user_name: "Maria Souza".to_string(),
                number: "04217".to_string(),
                date: None,
            },
            response,
        })
        .await
        .unwrap();

        let winners = ask("test", &channel, |response| RaffleRequest::ListWinners { response })
            .await
            .unwrap();
        assert_eq!(winners, vec![winner]);
    }
}
