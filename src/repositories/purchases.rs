use std::collections::HashSet;

use anyhow::bail;
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::models::purchases::{Purchase, PurchaseIntent, PurchaseStatus, SoldNumber, Stats};
use crate::models::raffles::Raffle;
use crate::models::users::User;
use crate::pix::Amount;
use crate::storage::{Storage, PURCHASES_KEY, USERS_KEY};

/// Ticket numbers run from 00000 to 99999.
pub const TICKET_SPACE: u32 = 100_000;

/// Draws `qty` distinct numbers that are not in `sold`.
pub fn allocate_numbers<R: Rng + ?Sized>(
    sold: &HashSet<String>,
    qty: u32,
    rng: &mut R,
) -> Result<Vec<String>, anyhow::Error> {
    let available = TICKET_SPACE as usize - sold.len().min(TICKET_SPACE as usize);
    if qty as usize > available {
        bail!("Only {} numbers left, {} requested", available, qty);
    }

    let mut taken = HashSet::with_capacity(qty as usize);
    let mut numbers = Vec::with_capacity(qty as usize);
    while numbers.len() < qty as usize {
        let number = format!("{:05}", rng.gen_range(0..TICKET_SPACE));
        if !sold.contains(&number) && taken.insert(number.clone()) {
            numbers.push(number);
        }
    }

    Ok(numbers)
}

#[derive(Clone)]
pub struct PurchaseRepository {
    storage: Storage,
}

impl PurchaseRepository {
    pub fn new(storage: Storage) -> Self {
        PurchaseRepository { storage }
    }

    /// Allocates numbers, stores the purchase and links it to the registered
    /// user with the same phone. Runs under the storage lock so two buyers
    /// never receive the same number.
    pub async fn insert_purchase(
        &self,
        intent: &PurchaseIntent,
        raffle: &Raffle,
    ) -> Result<Purchase, anyhow::Error> {
        let amount_in_cents = match raffle.price_in_cents.checked_mul(intent.qty as u64) {
            Some(cents) => Amount::from_cents(cents)?.cents(),
            None => bail!(
                "Amount overflows for {} x {} cents",
                intent.qty,
                raffle.price_in_cents
            ),
        };

        let _guard = self.storage.lock().await;

        let mut purchases: Vec<Purchase> = self.storage.read_list(PURCHASES_KEY)?;
        let sold: HashSet<String> = purchases
            .iter()
            .filter(|p| p.raffle_id == raffle.id)
            .flat_map(|p| p.numbers.iter().cloned())
            .collect();

        let numbers = allocate_numbers(&sold, intent.qty, &mut StdRng::from_entropy())?;

        let purchase = Purchase {
            id: Uuid::new_v4().hyphenated().to_string(),
            raffle_id: raffle.id.clone(),
            raffle_name: raffle.name.clone(),
            user_name: intent.user_name.trim().to_string(),
            user_cpf: intent.user_cpf.clone().filter(|cpf| !cpf.trim().is_empty()),
            user_phone: intent.user_phone.trim().to_string(),
            amount_in_cents,
            qty: intent.qty,
            numbers,
            created_at: chrono::Utc::now(),
            status: PurchaseStatus::Confirmed,
        };

        purchases.push(purchase.clone());
        self.storage.write_list(PURCHASES_KEY, &purchases)?;

        let mut users: Vec<User> = self.storage.read_list(USERS_KEY)?;
        if let Some(user) = users.iter_mut().find(|u| u.phone == purchase.user_phone) {
            user.purchases.push(purchase.id.clone());
            self.storage.write_list(USERS_KEY, &users)?;
        }

        Ok(purchase)
    }

    pub async fn list_purchases(&self) -> Result<Vec<Purchase>, anyhow::Error> {
        self.storage.read_list(PURCHASES_KEY)
    }

    pub async fn get_purchases_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<Purchase>, anyhow::Error> {
        let purchases = self
            .list_purchases()
            .await?
            .into_iter()
            .filter(|p| p.user_phone == phone)
            .collect();

        Ok(purchases)
    }

    pub async fn numbers_sold(&self) -> Result<Vec<SoldNumber>, anyhow::Error> {
        let numbers = self
            .list_purchases()
            .await?
            .into_iter()
            .flat_map(|p| {
                p.numbers
                    .iter()
                    .map(|number| SoldNumber {
                        number: number.clone(),
                        user_name: p.user_name.clone(),
                        user_cpf: p.user_cpf.clone(),
                        user_phone: p.user_phone.clone(),
                        raffle_id: p.raffle_id.clone(),
                        raffle_name: p.raffle_name.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(numbers)
    }

    pub async fn stats(&self) -> Result<Stats, anyhow::Error> {
        let purchases = self.list_purchases().await?;
        let users: Vec<User> = self.storage.read_list(USERS_KEY)?;

        let mut total_revenue_in_cents: u64 = 0;
        for purchase in &purchases {
            let Some(total) = total_revenue_in_cents.checked_add(purchase.amount_in_cents) else {
                bail!("Revenue overflows at purchase {}", purchase.id);
            };
            total_revenue_in_cents = total;
        }

        Ok(Stats {
            total_revenue_in_cents,
            total_purchases: purchases.len(),
            total_users: users.len(),
            total_numbers: purchases.iter().map(|p| p.numbers.len()).sum(),
        })
    }
}
