use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{Identity, User};
use crate::repositories::users::UserRepository;
use crate::storage::Storage;

pub enum UserRequest {
    CreateUser {
        identity: Identity,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    GetUser {
        phone: String,
        response: oneshot::Sender<Result<Option<User>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: UserRepository,
}

impl UserRequestHandler {
    pub fn new(storage: Storage) -> Self {
        let repository = UserRepository::new(storage);

        UserRequestHandler { repository }
    }

    async fn create_user(&self, identity: Identity) -> Result<User, ServiceError> {
        identity.validate().map_err(ServiceError::Validation)?;

        self.repository
            .insert_user(&identity)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))?
            .ok_or_else(|| {
                ServiceError::Validation("This phone number is already registered.".to_string())
            })
    }

    async fn get_user(&self, phone: &str) -> Result<Option<User>, ServiceError> {
        self.repository
            .get_user_by_phone(phone)
            .await
            .map_err(|e| ServiceError::Repository("Users".to_string(), e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::CreateUser { identity, response } => {
                let user = self.create_user(identity).await;
                let _ = response.send(user);
            }
            UserRequest::GetUser { phone, response } => {
                let user = self.get_user(&phone).await;
                let _ = response.send(user);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
