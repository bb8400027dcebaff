use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    Active,
    Closed,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Raffle {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price_in_cents: u64,
    pub min_qty: u32,
    pub status: RaffleStatus,
}

impl Raffle {
    /// Shown while the catalogue is still empty.
    pub fn placeholder() -> Self {
        Raffle {
            id: "test-raffle".to_string(),
            name: "Produto Teste".to_string(),
            description: "Participe do sorteio e concorra a uma skin exclusiva.".to_string(),
            image_url: "https://images.unsplash.com/photo-1593359677879-a4bb92f829d1".to_string(),
            price_in_cents: 50,
            min_qty: 5,
            status: RaffleStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RaffleStatus::Active
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Winner {
    pub raffle_id: String,
    pub raffle_name: String,
    pub user_name: String,
    pub number: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewWinner {
    pub raffle_id: String,
    pub raffle_name: String,
    pub user_name: String,
    pub number: String,
    pub date: Option<chrono::DateTime<chrono::Utc>>,
}
