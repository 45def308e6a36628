use shared::{
    domain::{ActivityLog, UserId},
    protocol::ActivityFilters,
};

use super::Orchestrator;
use crate::{
    error::{ClientError, ClientResult},
    services::ActivityService,
};

pub type ActivityFeed = Orchestrator<ActivityService>;

impl Orchestrator<ActivityService> {
    /// Loads one user's activity. Without a user id the action fails before any
    /// request is made.
    pub async fn load_for_user(
        &self,
        user_id: Option<&UserId>,
        filters: &ActivityFilters,
    ) -> ClientResult<Vec<ActivityLog>> {
        let Some(user_id) = user_id else {
            return self
                .reject(
                    "load_for_user",
                    ClientError::Precondition(
                        "No user id available to fetch activity for".to_string(),
                    ),
                )
                .await;
        };
        self.track(
            "load_for_user",
            self.service().for_user(user_id, filters),
            |state, entries| state.replace_all(entries.clone()),
        )
        .await
    }
}
