use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::pix::PixError;
use crate::settings::Settings;
use crate::storage::Storage;

pub mod admin;
pub mod http;
pub mod pix;
pub mod purchases;
pub mod raffles;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("{0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Pix error: {0}")]
    Pix(#[from] PixError),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh response channel and waits for the
/// answer.
pub async fn ask<T, R>(
    caller: &str,
    channel: &mpsc::Sender<T>,
    request: impl FnOnce(oneshot::Sender<Result<R, ServiceError>>) -> T,
) -> Result<R, ServiceError>
where
    T: Send + 'static,
{
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(caller.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(caller.to_string(), e.to_string()))?
}

/// Spawns every service over `storage` and returns the channels the HTTP
/// layer talks to. Must run inside a tokio runtime.
pub fn spawn_services(storage: Storage, settings: &Settings) -> http::AppState {
    let (raffle_tx, mut raffle_rx) = mpsc::channel(512);
    let (pix_tx, mut pix_rx) = mpsc::channel(512);
    let (purchase_tx, mut purchase_rx) = mpsc::channel(512);
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (admin_tx, mut admin_rx) = mpsc::channel(512);

    let mut raffle_service = raffles::RaffleService::new();
    let mut pix_service = pix::PixService::new();
    let mut purchase_service = purchases::PurchaseService::new();
    let mut user_service = users::UserService::new();
    let mut admin_service = admin::AdminService::new();

    log::info!("Starting raffle service.");
    let raffle_storage = storage.clone();
    tokio::spawn(async move {
        raffle_service
            .run(
                raffles::RaffleRequestHandler::new(raffle_storage),
                &mut raffle_rx,
            )
            .await;
    });

    log::info!("Starting Pix service.");
    let pix_raffle_tx = raffle_tx.clone();
    let pix_handler = pix::PixRequestHandler::new(&settings.pix, &settings.qr, pix_raffle_tx);
    tokio::spawn(async move {
        pix_service.run(pix_handler, &mut pix_rx).await;
    });

    log::info!("Starting purchase service.");
    let purchase_storage = storage.clone();
    let purchase_raffle_tx = raffle_tx.clone();
    tokio::spawn(async move {
        purchase_service
            .run(
                purchases::PurchaseRequestHandler::new(purchase_storage, purchase_raffle_tx),
                &mut purchase_rx,
            )
            .await;
    });

    log::info!("Starting user service.");
    let user_storage = storage.clone();
    tokio::spawn(async move {
        user_service
            .run(users::UserRequestHandler::new(user_storage), &mut user_rx)
            .await;
    });

    log::info!("Starting admin service.");
    let admin_handler = admin::AdminRequestHandler::new(&settings.admin);
    tokio::spawn(async move {
        admin_service.run(admin_handler, &mut admin_rx).await;
    });

    http::AppState {
        raffle_channel: raffle_tx,
        pix_channel: pix_tx,
        purchase_channel: purchase_tx,
        user_channel: user_tx,
        admin_channel: admin_tx,
    }
}

pub async fn start_services(storage: Storage, settings: Settings) -> Result<(), anyhow::Error> {
    let state = spawn_services(storage, &settings);

    log::info!("Starting HTTP server.");
    http::start_http_server(&settings.server.listen, state).await
}
