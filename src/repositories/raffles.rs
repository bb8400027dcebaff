use crate::models::raffles::{Raffle, Winner};
use crate::storage::{Storage, RAFFLES_KEY, WINNERS_KEY};

#[derive(Clone)]
pub struct RaffleRepository {
    storage: Storage,
}

impl RaffleRepository {
    pub fn new(storage: Storage) -> Self {
        RaffleRepository { storage }
    }

    pub async fn list_raffles(&self) -> Result<Vec<Raffle>, anyhow::Error> {
        let raffles: Vec<Raffle> = self.storage.read_list(RAFFLES_KEY)?;
        if raffles.is_empty() {
            return Ok(vec![Raffle::placeholder()]);
        }

        Ok(raffles)
    }

    pub async fn get_raffle(&self, id: &str) -> Result<Option<Raffle>, anyhow::Error> {
        let raffle = self
            .list_raffles()
            .await?
            .into_iter()
            .find(|raffle| raffle.id == id);

        Ok(raffle)
    }

    /// Inserts or replaces by id. Starts from the visible catalogue, so the
    /// placeholder is stored next to the first raffle saved.
    pub async fn save_raffle(&self, raffle: Raffle) -> Result<Raffle, anyhow::Error> {
        let _guard = self.storage.lock().await;

        let mut raffles = self.list_raffles().await?;
        raffles.retain(|r| r.id != raffle.id);
        raffles.push(raffle.clone());
        self.storage.write_list(RAFFLES_KEY, &raffles)?;

        Ok(raffle)
    }

    pub async fn delete_raffle(&self, id: &str) -> Result<bool, anyhow::Error> {
        let _guard = self.storage.lock().await;

        let mut raffles = self.list_raffles().await?;
        let before = raffles.len();
        raffles.retain(|r| r.id != id);
        if raffles.len() == before {
            return Ok(false);
        }

        if raffles.is_empty() {
            self.storage.remove(RAFFLES_KEY)?;
        } else {
            self.storage.write_list(RAFFLES_KEY, &raffles)?;
        }

        Ok(true)
    }

    pub async fn list_winners(&self) -> Result<Vec<Winner>, anyhow::Error> {
        self.storage.read_list(WINNERS_KEY)
    }

    pub async fn insert_winner(&self, winner: Winner) -> Result<Winner, anyhow::Error> {
        let _guard = self.storage.lock().await;

        let mut winners: Vec<Winner> = self.storage.read_list(WINNERS_KEY)?;
        winners.push(winner.clone());
        self.storage.write_list(WINNERS_KEY, &winners)?;

        Ok(winner)
    }
}
