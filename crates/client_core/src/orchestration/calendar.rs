use chrono::{DateTime, Utc};
use shared::{
    domain::{CalendarEvent, EventId},
    protocol::{EventFilters, MessageWindow},
};

use super::{ChatDesk, Orchestrator};
use crate::{error::ClientResult, services::EventService};

pub type CalendarDesk = Orchestrator<EventService>;

impl Orchestrator<EventService> {
    /// Lists events overlapping `[start, end]`.
    pub async fn load_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ClientResult<Vec<CalendarEvent>> {
        self.fetch_all(&EventFilters {
            start: Some(start),
            end: Some(end),
            ..EventFilters::default()
        })
        .await
    }
}

/// Focuses an event, then loads the chat thread linked to it.
///
/// A failed event fetch aborts before the thread is touched; each step reports
/// through its own orchestrator's error slot.
pub async fn select_event(
    calendar: &CalendarDesk,
    chat: &ChatDesk,
    id: &EventId,
) -> ClientResult<CalendarEvent> {
    let event = calendar.fetch_one(id).await?;
    match &event.chat_session_id {
        Some(session_id) => {
            chat.load_messages(session_id, &MessageWindow::default())
                .await?;
        }
        None => chat.clear_thread().await,
    }
    Ok(event)
}
