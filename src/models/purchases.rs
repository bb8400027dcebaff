use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Confirmed,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Purchase {
    pub id: String,
    pub raffle_id: String,
    pub raffle_name: String,
    pub user_name: String,
    pub user_cpf: Option<String>,
    pub user_phone: String,
    pub amount_in_cents: u64,
    pub qty: u32,
    pub numbers: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: PurchaseStatus,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PurchaseIntent {
    pub raffle_id: String,
    pub qty: u32,
    pub user_name: String,
    pub user_phone: String,
    pub user_cpf: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SoldNumber {
    pub number: String,
    pub user_name: String,
    pub user_cpf: Option<String>,
    pub user_phone: String,
    pub raffle_id: String,
    pub raffle_name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Stats {
    pub total_revenue_in_cents: u64,
    pub total_purchases: usize,
    pub total_users: usize,
    pub total_numbers: usize,
}
