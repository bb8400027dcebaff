use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{RequestHandler, Service, ServiceError};
use crate::settings;
use crate::utils::sha256_hex;

const SESSION_TTL_HOURS: i64 = 12;

pub enum AdminRequest {
    Login {
        email: String,
        password: String,
        response: oneshot::Sender<Result<String, ServiceError>>,
    },
    Authorize {
        token: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
    Logout {
        token: String,
        response: oneshot::Sender<Result<(), ServiceError>>,
    },
}

#[derive(Clone)]
pub struct AdminRequestHandler {
    email: String,
    password_sha256: String,
    // token -> expiry
    sessions: Arc<DashMap<String, DateTime<Utc>>>,
}

impl AdminRequestHandler {
    pub fn new(admin: &settings::Admin) -> Self {
        AdminRequestHandler {
            email: admin.email.trim().to_lowercase(),
            password_sha256: admin.password_sha256.trim().to_lowercase(),
            sessions: Arc::new(DashMap::new()),
        }
    }

    fn login(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        if email.trim().to_lowercase() != self.email || sha256_hex(password) != self.password_sha256
        {
            log::warn!("Rejected admin login for {}.", email);
            return Err(ServiceError::Unauthorized);
        }

        let now = Utc::now();
        // purge expired sessions, including tokens never presented again
        self.sessions.retain(|_, expires_at| *expires_at > now);

        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .insert(token.clone(), now + Duration::hours(SESSION_TTL_HOURS));
        log::info!("Admin {} logged in.", self.email);

        Ok(token)
    }

    fn authorize(&self, token: &str) -> Result<(), ServiceError> {
        let expires_at = self
            .sessions
            .get(token)
            .map(|session| *session.value())
            .ok_or(ServiceError::Unauthorized)?;

        if expires_at <= Utc::now() {
            self.sessions.remove(token);
            return Err(ServiceError::Unauthorized);
        }

        Ok(())
    }

    fn logout(&self, token: &str) {
        self.sessions.remove(token);
    }
}

#[async_trait]
impl RequestHandler<AdminRequest> for AdminRequestHandler {
    async fn handle_request(&self, request: AdminRequest) {
        match request {
            AdminRequest::Login {
                email,
                password,
                response,
            } => {
                let token = self.login(&email, &password);
                let _ = response.send(token);
            }
            AdminRequest::Authorize { token, response } => {
                let result = self.authorize(&token);
                let _ = response.send(result);
            }
            AdminRequest::Logout { token, response } => {
                self.logout(&token);
                let _ = response.send(Ok(()));
            }
        }
    }
}

pub struct AdminService;

impl AdminService {
    pub fn new() -> Self {
        AdminService {}
    }
}

#[async_trait]
impl Service<AdminRequest, AdminRequestHandler> for AdminService {}
