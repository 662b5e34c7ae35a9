//! Calendar scheduling: create and cancel meetings and reminders.
//!
//! Cancellation and creation are separate routes so that "cancel the
//! meeting" can never be mistaken for a booking request; the cancel
//! route is probed first.

use async_trait::async_trait;
use blotter_core::error::HandlerError;
use blotter_core::handler::{Handler, HandlerReply, TurnContext};
use std::sync::Arc;
use tracing::info;

const MEETING_WORDS: [&str; 5] = ["meeting", "appointment", "call", "event", "calendar"];
const CANCEL_WORDS: [&str; 3] = ["cancel", "delete", "remove"];
const CREATE_WORDS: [&str; 5] = ["schedule", "book", "set up", "arrange", "remind"];

/// Scheduled meeting, as returned by the calendar backend.
#[derive(Debug, Clone)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub attendee: String,
}

/// Calendar backend.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn create(&self, title: &str, attendee: &str) -> Result<Meeting, HandlerError>;
    async fn cancel(&self, attendee: &str) -> Result<Option<Meeting>, HandlerError>;
}

/// Keeps meetings in memory. Stands in until a real backend is wired.
pub struct NullCalendarClient {
    meetings: tokio::sync::Mutex<Vec<Meeting>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl NullCalendarClient {
    pub fn new() -> Self {
        Self {
            meetings: tokio::sync::Mutex::new(Vec::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }
}

impl Default for NullCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarClient for NullCalendarClient {
    async fn create(&self, title: &str, attendee: &str) -> Result<Meeting, HandlerError> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let meeting = Meeting {
            id: format!("mtg-{id}"),
            title: title.to_string(),
            attendee: attendee.to_string(),
        };
        self.meetings.lock().await.push(meeting.clone());
        info!(id = %meeting.id, attendee, "Meeting created");
        Ok(meeting)
    }

    async fn cancel(&self, attendee: &str) -> Result<Option<Meeting>, HandlerError> {
        let mut meetings = self.meetings.lock().await;
        let needle = attendee.to_lowercase();
        let position = meetings
            .iter()
            .position(|m| m.attendee.to_lowercase().contains(&needle));
        Ok(position.map(|i| meetings.remove(i)))
    }
}

/// Best-effort attendee extraction: "with <Name>" first, then the
/// carried entity.
fn attendee(query: &str, ctx: &TurnContext) -> Option<String> {
    if let Some(rest) = query.split(" with ").nth(1) {
        let name: Vec<&str> = rest
            .split_whitespace()
            .take_while(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .collect();
        if !name.is_empty() {
            return Some(name.join(" ").trim_end_matches(['.', ',', '?']).to_string());
        }
    }
    ctx.last_entity.as_ref().map(|e| e.name.clone())
}

fn mentions_meeting(lower: &str) -> bool {
    MEETING_WORDS.iter().any(|w| lower.contains(w))
}

pub struct CalendarCancelHandler {
    calendar: Arc<dyn CalendarClient>,
}

impl CalendarCancelHandler {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Handler for CalendarCancelHandler {
    fn name(&self) -> &str {
        "calendar_cancel"
    }

    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        CANCEL_WORDS.iter().any(|w| lower.contains(w)) && mentions_meeting(&lower)
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let Some(who) = attendee(query, ctx) else {
            return Ok(HandlerReply::failure(
                "Whose meeting should I cancel? Name the attendee.",
            ));
        };
        match self.calendar.cancel(&who).await? {
            Some(meeting) => Ok(HandlerReply::text(format!(
                "Cancelled \"{}\" with {}.",
                meeting.title, meeting.attendee
            ))),
            None => Ok(HandlerReply::failure(format!(
                "No upcoming meeting with {who} found."
            ))),
        }
    }
}

pub struct CalendarCreateHandler {
    calendar: Arc<dyn CalendarClient>,
}

impl CalendarCreateHandler {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }
}

#[async_trait]
impl Handler for CalendarCreateHandler {
    fn name(&self) -> &str {
        "calendar_create"
    }

    fn can_handle(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        CREATE_WORDS.iter().any(|w| lower.contains(w)) && mentions_meeting(&lower)
    }

    async fn process(&self, query: &str, ctx: &TurnContext) -> Result<HandlerReply, HandlerError> {
        let Some(who) = attendee(query, ctx) else {
            return Ok(HandlerReply::failure(
                "Who is the meeting with? Name the attendee.",
            ));
        };
        let meeting = self
            .calendar
            .create(&format!("Meeting with {who}"), &who)
            .await?;
        Ok(HandlerReply::text(format!(
            "Scheduled \"{}\" ({}).",
            meeting.title, meeting.id
        ))
        .with_data(serde_json::json!({ "meeting_id": meeting.id })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blotter_core::handler::ResolvedEntity;

    fn pair() -> (CalendarCreateHandler, CalendarCancelHandler) {
        let calendar = Arc::new(NullCalendarClient::new());
        (
            CalendarCreateHandler::new(calendar.clone()),
            CalendarCancelHandler::new(calendar),
        )
    }

    #[test]
    fn predicates_do_not_overlap() {
        let (create, cancel) = pair();
        assert!(create.can_handle("schedule a meeting with Alice Johnson"));
        assert!(!cancel.can_handle("schedule a meeting with Alice Johnson"));
        assert!(cancel.can_handle("cancel the meeting with Alice"));
        assert!(!create.can_handle("cancel the meeting with Alice"));
        assert!(create.can_handle("remind me to call with Alice next week"));
        assert!(!create.can_handle("log a trade for Alice"));
    }

    #[tokio::test]
    async fn create_then_cancel_round_trip() {
        let (create, cancel) = pair();
        let ctx = TurnContext::default();

        let reply = create
            .process("schedule a call with Alice Johnson tomorrow", &ctx)
            .await
            .unwrap();
        assert!(reply.success);
        assert!(reply.text.contains("Alice Johnson"));

        let reply = cancel
            .process("cancel my meeting with Alice", &ctx)
            .await
            .unwrap();
        assert!(reply.success);
        assert!(reply.text.contains("Cancelled"));

        // A second cancel finds nothing.
        let reply = cancel
            .process("cancel my meeting with Alice", &ctx)
            .await
            .unwrap();
        assert!(!reply.success);
    }

    #[tokio::test]
    async fn attendee_falls_back_to_carried_entity() {
        let (create, cancel) = pair();
        let ctx = TurnContext {
            conversation_id: "c".into(),
            last_entity: Some(ResolvedEntity::new("Bob Lee")),
            history: vec![],
        };
        create
            .process("set up a meeting for next week", &ctx)
            .await
            .unwrap();
        let reply = cancel.process("cancel that meeting", &ctx).await.unwrap();
        assert!(reply.text.contains("Bob Lee"));
    }

    #[tokio::test]
    async fn missing_attendee_asks_for_one() {
        let (create, _) = pair();
        let reply = create
            .process("schedule a meeting", &TurnContext::default())
            .await
            .unwrap();
        assert!(!reply.success);
    }
}
