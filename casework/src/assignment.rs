//! Assignment balancer
//!
//! Picks the active caseworker with the fewest open complaints. Ties go to
//! the lowest user id so repeated runs over the same data pick the same person.

use async_trait::async_trait;

use crate::external::Directory;
use crate::store::{SharedRepository, StoreError};
use crate::types::{Role, StaffWorkload, User};

/// Least-loaded active staff member, or `None` if nobody is eligible.
pub fn select_least_loaded(candidates: &[StaffWorkload]) -> Option<&User> {
    candidates
        .iter()
        .filter(|w| w.user.active)
        .min_by(|a, b| {
            a.open_cases
                .cmp(&b.open_cases)
                .then_with(|| a.user.id.cmp(&b.user.id))
        })
        .map(|w| &w.user)
}

/// [`Directory`] backed by the casework repository
pub struct StoreDirectory {
    repo: SharedRepository,
}

impl StoreDirectory {
    pub fn new(repo: SharedRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Directory for StoreDirectory {
    async fn find_least_loaded(&self, role: Role) -> Result<Option<User>, StoreError> {
        let workloads = self.repo.staff_workloads(role).await?;
        let chosen = select_least_loaded(&workloads).cloned();
        if let Some(user) = &chosen {
            tracing::debug!(role = %role, user = %user.id, "Selected least-loaded staff member");
        }
        Ok(chosen)
    }

    async fn find_any_active(&self, role: Role) -> Result<Option<User>, StoreError> {
        Ok(self.repo.active_users(role).await?.into_iter().next())
    }
}
