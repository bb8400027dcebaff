use crate::models::users::{Identity, User};
use crate::storage::{Storage, USERS_KEY};

use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    storage: Storage,
}

impl UserRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Returns `None` when the phone is already registered.
    pub async fn insert_user(&self, identity: &Identity) -> Result<Option<User>, anyhow::Error> {
        let _guard = self.storage.lock().await;

        let phone = identity.phone.trim();
        let mut users: Vec<User> = self.storage.read_list(USERS_KEY)?;
        if users.iter().any(|u| u.phone == phone) {
            return Ok(None);
        }

        let user = User {
            id: Uuid::new_v4().hyphenated().to_string(),
            name: identity.name.trim().to_string(),
            cpf: identity.cpf.trim().to_string(),
            phone: phone.to_string(),
            purchases: Vec::new(),
            created_at: chrono::Utc::now(),
        };

        users.push(user.clone());
        self.storage.write_list(USERS_KEY, &users)?;

        Ok(Some(user))
    }

    pub async fn get_user_by_phone(&self, phone: &str) -> Result<Option<User>, anyhow::Error> {
        let users: Vec<User> = self.storage.read_list(USERS_KEY)?;
        let user = users.into_iter().find(|u| u.phone == phone.trim());

        Ok(user)
    }
}
