//! The single owner of session state.
//!
//! The UI turns key presses into calls on [`ChatController`]; background
//! fetches report back through the [`AppEvent`] channel returned by
//! [`ChatController::new`], which the event loop feeds into
//! [`ChatController::handle_event`].

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::ChatApi;
use crate::error::ApiError;
use crate::events::AppEvent;
use crate::models::SelectedContact;
use crate::poller::Poller;
use crate::session::{Screen, TokenStore};
use crate::state::{BannerKind, ChatState};

const EVENT_BUFFER: usize = 100;

/// Result of [`ChatController::send_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input or nobody selected; nothing was sent
    Skipped,
    Sent,
    Failed,
}

pub struct ChatController {
    api: Arc<dyn ChatApi>,
    tokens: TokenStore,
    state: ChatState,
    events: mpsc::Sender<AppEvent>,
    poll_interval: Duration,
    poller: Option<Poller>,
}

impl ChatController {
    pub fn new(
        api: Arc<dyn ChatApi>,
        tokens: TokenStore,
        poll_interval: Duration,
    ) -> (Self, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let controller = ChatController {
            api,
            tokens,
            state: ChatState::new(Screen::Login),
            events: tx,
            poll_interval,
            poller: None,
        };
        (controller, rx)
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChatState {
        &mut self.state
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Loads the stored token and opens `requested`, or the login screen when
    /// a token is required but missing.
    pub async fn bootstrap(&mut self, requested: Screen) {
        self.state.token = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!("Ignoring unreadable session: {}", e);
                None
            }
        };

        let screen = requested.resolve(self.state.token.is_some());
        if screen != requested {
            info!("No session token, redirecting {:?} -> {:?}", requested, screen);
        }

        if screen == Screen::Chat {
            self.enter_chat().await;
        } else {
            self.state.screen = screen;
        }
    }

    async fn enter_chat(&mut self) {
        self.state.screen = Screen::Chat;
        if let Err(e) = self.load_current_user().await {
            error!("Failed to load current user: {}", e);
            self.stop_polling();
            if let Err(e) = self.tokens.clear() {
                error!("Could not remove rejected session token: {}", e);
            }
            self.state.reset_session();
            self.state.screen = Screen::Login;
            self.state.show_banner(e.user_message(), BannerKind::Error);
            return;
        }
        self.load_contacts().await;
        self.start_polling();
    }

    pub async fn load_current_user(&mut self) -> Result<(), ApiError> {
        let token = self.token();
        let user = self.api.current_user(&token).await?;
        info!("Signed in as {} (id {})", user.username, user.id);
        self.state.current_user = Some(user);
        Ok(())
    }

    /// Replaces the contact list. On failure the previous list stays.
    pub async fn load_contacts(&mut self) {
        let token = self.token();
        match self.api.contacts(&token).await {
            Ok(contacts) => {
                debug!("Loaded {} contacts", contacts.len());
                self.state.contacts = contacts;
            }
            Err(e) => error!("Failed to load contacts: {}", e),
        }
    }

    /// Starts a background fetch of the selected conversation. Does nothing
    /// without a selection.
    pub fn load_messages(&self) {
        let Some(selected) = self.state.selected.as_ref() else {
            return;
        };

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        let token = self.token();
        let contact_id = selected.id;
        let generation = self.state.generation();

        tokio::spawn(async move {
            match api.messages(&token, contact_id).await {
                Ok(messages) => {
                    let event = AppEvent::MessagesLoaded {
                        generation,
                        contact_id,
                        messages,
                    };
                    if events.send(event).await.is_err() {
                        debug!("Controller gone, dropping messages for {}", contact_id);
                    }
                }
                Err(e) => error!("Failed to load messages: {}", e),
            }
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::PollTick => self.load_messages(),
            AppEvent::MessagesLoaded {
                generation,
                contact_id,
                messages,
            } => {
                if generation != self.state.generation() {
                    debug!(
                        "Discarding stale messages for contact {} (generation {} != {})",
                        contact_id,
                        generation,
                        self.state.generation()
                    );
                    return;
                }
                self.state.messages = messages;
            }
        }
    }

    pub fn select_contact(&mut self, id: i64, username: &str) {
        debug!("Selecting contact {} ({})", username, id);
        self.state.select(SelectedContact {
            id,
            username: username.to_string(),
        });
        self.load_messages();
    }

    /// Sends the trimmed `input` to the selected contact. On success the
    /// conversation is reloaded; the caller clears its input box.
    pub async fn send_message(&mut self, input: &str) -> SendOutcome {
        let content = input.trim();
        let Some(selected) = self.state.selected.clone() else {
            return SendOutcome::Skipped;
        };
        if content.is_empty() {
            return SendOutcome::Skipped;
        }

        let token = self.token();
        match self
            .api
            .send_message(&token, &selected.username, content)
            .await
        {
            Ok(()) => {
                self.load_messages();
                SendOutcome::Sent
            }
            Err(e) => {
                // No feedback; the message simply does not appear
                debug!("Failed to send message to {}: {}", selected.username, e);
                SendOutcome::Failed
            }
        }
    }

    pub fn show_add_contact(&mut self) {
        self.state.add_contact_open = true;
    }

    pub fn close_add_contact(&mut self) {
        self.state.add_contact_open = false;
    }

    /// Returns true when the contact was added.
    pub async fn add_contact(&mut self, username: &str) -> bool {
        let username = username.trim();
        if username.is_empty() {
            return false;
        }

        let token = self.token();
        match self.api.add_contact(&token, username).await {
            Ok(()) => {
                info!("Added contact {}", username);
                self.close_add_contact();
                self.load_contacts().await;
                true
            }
            Err(e @ ApiError::Rejected { .. }) => {
                self.state.alert = Some(e.user_message());
                false
            }
            Err(e) => {
                error!("Failed to add contact: {}", e);
                false
            }
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.state.alert = None;
    }

    pub async fn login(&mut self, username: &str, password: &str) {
        match self.api.login(username, password).await {
            Ok(token) => {
                if let Err(e) = self.tokens.save(&token) {
                    error!("Could not persist session token: {}", e);
                }
                self.state.token = Some(token);
                self.state.banner = None;
                self.enter_chat().await;
            }
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                self.state.show_banner(e.user_message(), BannerKind::Error);
            }
        }
    }

    pub async fn signup(&mut self, username: &str, password: &str) {
        match self.api.signup(username, password).await {
            Ok(()) => {
                info!("Account {} created", username);
                self.state.screen = Screen::Login;
                self.state
                    .show_banner("Account created, please log in", BannerKind::Info);
            }
            Err(e) => {
                warn!("Signup failed for {}: {}", username, e);
                self.state.show_banner(e.user_message(), BannerKind::Error);
            }
        }
    }

    /// Switches between the login and signup screens.
    pub fn open_screen(&mut self, screen: Screen) {
        self.state.screen = screen.resolve(self.state.token.is_some());
    }

    pub fn logout(&mut self) {
        self.stop_polling();
        if let Err(e) = self.tokens.clear() {
            error!("Could not remove session token: {}", e);
        }
        self.state.reset_session();
        self.state.screen = Screen::Login;
        info!("Logged out");
    }

    fn start_polling(&mut self) {
        self.poller = Some(Poller::start(self.poll_interval, self.events.clone()));
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }

    fn token(&self) -> String {
        self.state.token.clone().unwrap_or_default()
    }
}
