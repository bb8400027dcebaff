use serde::{Deserialize, Serialize};

use crate::utils::validate_cpf;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub purchases: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Buyer identification collected before a PIX charge is generated.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Identity {
    pub name: String,
    pub cpf: String,
    pub phone: String,
}

impl Identity {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().chars().count() < 3 {
            return Err("Please provide your full name.".to_string());
        }

        if !validate_cpf(&self.cpf) {
            return Err("Please provide a valid CPF.".to_string());
        }

        if self.phone.trim().chars().count() < 8 {
            return Err("Please provide a valid phone number.".to_string());
        }

        Ok(())
    }
}
