use std::time::{Duration, Instant};

use crate::models::{Contact, CurrentUser, Message, SelectedContact};
use crate::session::Screen;

/// How long a banner stays up.
pub const BANNER_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Error,
    Info,
}

/// A transient notice shown above the active screen
#[derive(Debug, Clone)]
pub struct Banner {
    pub text: String,
    pub kind: BannerKind,
    pub shown_at: Instant,
}

impl Banner {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= BANNER_TTL
    }
}

/// Everything the UI draws from.
#[derive(Debug)]
pub struct ChatState {
    pub screen: Screen,
    pub token: Option<String>,
    pub current_user: Option<CurrentUser>,
    pub contacts: Vec<Contact>,
    pub selected: Option<SelectedContact>,
    pub messages: Vec<Message>,
    pub add_contact_open: bool,
    /// Blocking alert; the UI swallows input until it is dismissed
    pub alert: Option<String>,
    pub banner: Option<Banner>,
    generation: u64,
}

impl ChatState {
    pub fn new(screen: Screen) -> Self {
        ChatState {
            screen,
            token: None,
            current_user: None,
            contacts: Vec::new(),
            selected: None,
            messages: Vec::new(),
            add_contact_open: false,
            alert: None,
            banner: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Makes `contact` the only selection and invalidates in-flight fetches.
    pub fn select(&mut self, contact: SelectedContact) {
        self.generation += 1;
        self.selected = Some(contact);
        self.messages.clear();
    }

    /// Header label for the conversation panel.
    pub fn header(&self) -> &str {
        self.selected
            .as_ref()
            .map(|c| c.username.as_str())
            .unwrap_or("")
    }

    pub fn show_banner(&mut self, text: impl Into<String>, kind: BannerKind) {
        self.banner = Some(Banner {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    pub fn expire_banner(&mut self, now: Instant) {
        if self.banner.as_ref().map_or(false, |b| b.is_expired(now)) {
            self.banner = None;
        }
    }

    /// Drops everything tied to the signed-in user.
    pub fn reset_session(&mut self) {
        self.generation += 1;
        self.token = None;
        self.current_user = None;
        self.contacts.clear();
        self.selected = None;
        self.messages.clear();
        self.add_contact_open = false;
        self.alert = None;
    }
}
