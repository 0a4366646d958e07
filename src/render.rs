//! Pure view builders.
//!
//! Each call produces the complete list for its panel; the UI replaces what it
//! showed before rather than patching it.

use chrono::TimeZone;
use std::fmt::Display;

use crate::models::{Contact, Message, SelectedContact};

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub id: i64,
    /// First letter of the username, upper-cased
    pub avatar: String,
    pub username: String,
    pub last_message: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub kind: MessageKind,
    pub content: String,
    pub time: String,
}

pub fn avatar_for(username: &str) -> String {
    match username.chars().next() {
        Some(first) => first.to_uppercase().collect(),
        None => "?".to_string(),
    }
}

pub fn render_contacts(contacts: &[Contact], selected: Option<&SelectedContact>) -> Vec<ContactEntry> {
    contacts
        .iter()
        .map(|contact| ContactEntry {
            id: contact.id,
            avatar: avatar_for(&contact.username),
            username: contact.username.clone(),
            last_message: contact.last_message.clone().unwrap_or_default(),
            selected: selected.map_or(false, |s| s.id == contact.id),
        })
        .collect()
}

/// Builds the message panel, formatting times in `tz`.
pub fn render_messages<Tz>(messages: &[Message], current_user_id: i64, tz: &Tz) -> Vec<MessageEntry>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    messages
        .iter()
        .map(|msg| MessageEntry {
            kind: if msg.sender_id == current_user_id {
                MessageKind::Sent
            } else {
                MessageKind::Received
            },
            content: msg.content.clone(),
            time: format_time(msg, tz),
        })
        .collect()
}

/// Wall-clock time of `msg` in `tz`, or the raw timestamp if it can't be parsed.
pub fn format_time<Tz>(msg: &Message, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match msg.sent_at() {
        Some(at) => at.with_timezone(tz).format(TIME_FORMAT).to_string(),
        None => msg.timestamp.clone(),
    }
}
