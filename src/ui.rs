use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use palaver::render::{render_contacts, render_messages, MessageKind};
use palaver::state::{BannerKind, ChatState};
use palaver::Screen;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the user asked for. The main loop forwards these to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    Quit,
    Login { username: String, password: String },
    Signup { username: String, password: String },
    OpenScreen(Screen),
    SendMessage(String),
    SelectContact { id: i64, username: String },
    ShowAddContact,
    CloseAddContact,
    AddContact(String),
    DismissAlert,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Messages,
    Contacts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginField {
    Username,
    Password,
}

pub struct ChatUI {
    message_input: Input,
    username_input: Input,
    password_input: Input,
    login_focus: LoginField,
    add_contact_input: Input,
    active_tab: Tab,
    contact_cursor: usize,
}

impl ChatUI {
    pub fn new() -> Self {
        ChatUI {
            message_input: Input::default(),
            username_input: Input::default(),
            password_input: Input::default(),
            login_focus: LoginField::Username,
            add_contact_input: Input::default(),
            active_tab: Tab::Messages,
            contact_cursor: 0,
        }
    }

    pub fn clear_message_input(&mut self) {
        self.message_input = Input::default();
    }

    pub fn clear_add_contact_input(&mut self) {
        self.add_contact_input = Input::default();
    }

    /// Drops every draft, the tab choice and the contact cursor.
    pub fn reset(&mut self) {
        *self = ChatUI::new();
    }

    /// Forgets the typed password, and the username too when `all` is set.
    pub fn clear_login_form(&mut self, all: bool) {
        self.password_input = Input::default();
        if all {
            self.username_input = Input::default();
            self.login_focus = LoginField::Username;
        }
    }

    pub fn handle_input(&mut self, state: &ChatState) -> Result<Option<UiAction>> {
        if event::poll(Duration::from_millis(10))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key, state));
                }
            }
        }
        Ok(None)
    }

    fn handle_key(&mut self, key: KeyEvent, state: &ChatState) -> Option<UiAction> {
        // Alerts block everything until dismissed
        if state.alert.is_some() {
            return Some(UiAction::DismissAlert);
        }

        match state.screen {
            Screen::Login | Screen::Signup => self.handle_login_key(key, state.screen),
            Screen::Chat if state.add_contact_open => self.handle_add_contact_key(key),
            Screen::Chat => self.handle_chat_key(key, state),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent, screen: Screen) -> Option<UiAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Some(UiAction::Quit),
            KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                self.login_focus = match self.login_focus {
                    LoginField::Username => LoginField::Password,
                    LoginField::Password => LoginField::Username,
                };
                None
            }
            KeyCode::Char('n') if ctrl => Some(UiAction::OpenScreen(match screen {
                Screen::Signup => Screen::Login,
                _ => Screen::Signup,
            })),
            KeyCode::Enter => {
                let username = self.username_input.value().trim().to_string();
                let password = self.password_input.value().to_string();
                if username.is_empty() {
                    self.login_focus = LoginField::Username;
                    return None;
                }
                if password.is_empty() {
                    self.login_focus = LoginField::Password;
                    return None;
                }
                Some(match screen {
                    Screen::Signup => UiAction::Signup { username, password },
                    _ => UiAction::Login { username, password },
                })
            }
            _ => {
                let field = match self.login_focus {
                    LoginField::Username => &mut self.username_input,
                    LoginField::Password => &mut self.password_input,
                };
                field.handle_event(&Event::Key(key));
                None
            }
        }
    }

    fn handle_add_contact_key(&mut self, key: KeyEvent) -> Option<UiAction> {
        match key.code {
            KeyCode::Esc => {
                self.clear_add_contact_input();
                Some(UiAction::CloseAddContact)
            }
            KeyCode::Enter => {
                let username = self.add_contact_input.value().trim();
                if username.is_empty() {
                    None
                } else {
                    Some(UiAction::AddContact(username.to_string()))
                }
            }
            _ => {
                self.add_contact_input.handle_event(&Event::Key(key));
                None
            }
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent, state: &ChatState) -> Option<UiAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let contact_count = state.contacts.len();
        if self.contact_cursor >= contact_count {
            self.contact_cursor = contact_count.saturating_sub(1);
        }

        match key.code {
            KeyCode::Esc => Some(UiAction::Quit),
            KeyCode::Tab => {
                self.active_tab = match self.active_tab {
                    Tab::Messages => Tab::Contacts,
                    Tab::Contacts => Tab::Messages,
                };
                None
            }
            KeyCode::Char('a') if ctrl => Some(UiAction::ShowAddContact),
            KeyCode::Char('l') if ctrl => Some(UiAction::Logout),
            KeyCode::Up if self.active_tab == Tab::Contacts => {
                if contact_count > 0 {
                    self.contact_cursor = (self.contact_cursor + contact_count - 1) % contact_count;
                }
                None
            }
            KeyCode::Down if self.active_tab == Tab::Contacts => {
                if contact_count > 0 {
                    self.contact_cursor = (self.contact_cursor + 1) % contact_count;
                }
                None
            }
            KeyCode::Enter => match self.active_tab {
                Tab::Contacts => state.contacts.get(self.contact_cursor).map(|c| {
                    UiAction::SelectContact {
                        id: c.id,
                        username: c.username.clone(),
                    }
                }),
                Tab::Messages => Some(UiAction::SendMessage(self.message_input.value().to_string())),
            },
            _ => {
                if self.active_tab == Tab::Messages {
                    self.message_input.handle_event(&Event::Key(key));
                }
                None
            }
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, state: &ChatState) {
        let size = frame.size();

        match state.screen {
            Screen::Login | Screen::Signup => self.draw_login(frame, state.screen, size),
            Screen::Chat => {
                self.draw_chat(frame, state, size);
                if state.add_contact_open {
                    draw_add_contact_dialog(frame, &self.add_contact_input, size);
                }
            }
        }

        if let Some(text) = &state.alert {
            draw_alert(frame, text, size);
        }

        if let Some(banner) = &state.banner {
            let style = match banner.kind {
                BannerKind::Error => Style::default().fg(Color::White).bg(Color::Red),
                BannerKind::Info => Style::default().fg(Color::Black).bg(Color::Green),
            };
            let area = Rect::new(size.x, size.y, size.width, size.height.min(1));
            frame.render_widget(Clear, area);
            frame.render_widget(Paragraph::new(banner.text.as_str()).style(style), area);
        }
    }

    fn draw_login<B: Backend>(&self, frame: &mut Frame<B>, screen: Screen, size: Rect) {
        let title = match screen {
            Screen::Signup => "Sign up",
            _ => "Log in",
        };
        let popup_area = centered(50, 10, size);
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(Clear, popup_area);
        frame.render_widget(block, popup_area);

        let inner = popup_area.inner(&Margin {
            vertical: 1,
            horizontal: 2,
        });
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Min(1),    // Help
            ])
            .split(inner);

        let focused = |field: LoginField| {
            if self.login_focus == field {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };

        let username = Paragraph::new(self.username_input.value()).block(
            Block::default()
                .title("Username")
                .borders(Borders::ALL)
                .border_style(focused(LoginField::Username)),
        );
        frame.render_widget(username, chunks[0]);

        let masked = "*".repeat(self.password_input.value().chars().count());
        let password = Paragraph::new(masked).block(
            Block::default()
                .title("Password")
                .borders(Borders::ALL)
                .border_style(focused(LoginField::Password)),
        );
        frame.render_widget(password, chunks[1]);

        let switch_hint = match screen {
            Screen::Signup => "Ctrl+N log in",
            _ => "Ctrl+N sign up",
        };
        let help = Paragraph::new(format!("Enter submit | Tab field | {} | ESC quit", switch_hint))
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(help, chunks[2]);

        let (field_area, input) = match self.login_focus {
            LoginField::Username => (chunks[0], &self.username_input),
            LoginField::Password => (chunks[1], &self.password_input),
        };
        frame.set_cursor(field_area.x + input.cursor() as u16 + 1, field_area.y + 1);
    }

    fn draw_chat<B: Backend>(&self, frame: &mut Frame<B>, state: &ChatState, size: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25), // Contacts panel
                Constraint::Percentage(75), // Chat panel
            ])
            .split(size);

        let chat_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Conversation header
                Constraint::Min(5),    // Messages area
                Constraint::Length(3), // Input box
                Constraint::Length(1), // Help line
            ])
            .split(chunks[1]);

        self.draw_contacts(frame, state, chunks[0]);

        let user_label = state
            .current_user
            .as_ref()
            .map(|u| format!(" (signed in as {})", u.username))
            .unwrap_or_default();
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                state.header().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(user_label, Style::default().fg(Color::Gray)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, chat_chunks[0]);

        draw_messages(frame, state, chat_chunks[1]);

        let input_widget = Paragraph::new(self.message_input.value()).block(
            Block::default()
                .title("Message")
                .borders(Borders::ALL)
                .border_style(match self.active_tab {
                    Tab::Messages => Style::default().fg(Color::Yellow),
                    _ => Style::default(),
                }),
        );
        frame.render_widget(input_widget, chat_chunks[2]);

        let help = Paragraph::new(
            "ESC quit | TAB switch | Enter send/select | Ctrl+A add contact | Ctrl+L log out",
        )
        .style(Style::default().fg(Color::Gray));
        frame.render_widget(help, chat_chunks[3]);

        if self.active_tab == Tab::Messages && !state.add_contact_open {
            frame.set_cursor(
                chat_chunks[2].x + self.message_input.cursor() as u16 + 1,
                chat_chunks[2].y + 1,
            );
        }
    }

    fn draw_contacts<B: Backend>(&self, frame: &mut Frame<B>, state: &ChatState, area: Rect) {
        let entries = render_contacts(&state.contacts, state.selected.as_ref());
        let show_cursor = self.active_tab == Tab::Contacts;

        let items: Vec<ListItem> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let marker = if show_cursor && i == self.contact_cursor { "> " } else { "  " };
                let name_style = if entry.selected {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(vec![
                    Line::from(vec![
                        Span::raw(marker),
                        Span::styled(format!("[{}] ", entry.avatar), Style::default().fg(Color::Cyan)),
                        Span::styled(entry.username.clone(), name_style),
                    ]),
                    Line::from(Span::styled(
                        format!("      {}", entry.last_message),
                        Style::default().fg(Color::Gray),
                    )),
                ])
            })
            .collect();

        let contacts_list = List::new(items).block(
            Block::default()
                .title("Contacts (Tab to focus)")
                .borders(Borders::ALL)
                .border_style(match self.active_tab {
                    Tab::Contacts => Style::default().fg(Color::Yellow),
                    _ => Style::default(),
                }),
        );
        frame.render_widget(contacts_list, area);
    }
}

fn draw_messages<B: Backend>(f: &mut Frame<B>, state: &ChatState, area: Rect) {
    let wrap_width = area.width.saturating_sub(2).max(1) as usize; // Account for borders
    let current_user_id = state.current_user.as_ref().map(|u| u.id).unwrap_or_default();
    let peer = state.header();

    let entries = render_messages(&state.messages, current_user_id, &chrono::Local);
    let items: Vec<ListItem> = entries
        .iter()
        .flat_map(|entry| {
            let (who, style) = match entry.kind {
                MessageKind::Sent => ("You", Style::default().fg(Color::Blue)),
                MessageKind::Received => (peer, Style::default()),
            };
            let full_content = format!("[{}] {}: {}", entry.time, who, entry.content);

            wrap(&full_content, wrap_width)
                .into_iter()
                .map(|l| l.into_owned())
                .collect::<Vec<_>>()
                .into_iter()
                .map(move |line| ListItem::new(Text::from(line)).style(style))
        })
        .collect();

    // Keep the newest line in view
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(items.len() - 1));
    }

    let messages_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Messages"))
        .highlight_style(Style::default());
    f.render_stateful_widget(messages_list, area, &mut list_state);
}

fn draw_add_contact_dialog<B: Backend>(f: &mut Frame<B>, input: &Input, area: Rect) {
    let popup_area = centered(50, 7, area);
    let popup_block = Block::default()
        .title("Add Contact")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Instructions
            Constraint::Length(3), // Input field
        ])
        .split(inner_area);

    f.render_widget(
        Paragraph::new("Username (Enter to add, ESC to cancel):"),
        chunks[0],
    );

    let input_widget = Paragraph::new(input.value()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(input_widget, chunks[1]);
    f.set_cursor(chunks[1].x + input.cursor() as u16 + 1, chunks[1].y + 1);
}

fn draw_alert<B: Backend>(f: &mut Frame<B>, text: &str, area: Rect) {
    let popup_area = centered(50, 7, area);
    let popup_block = Block::default()
        .title("Error")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });
    let body = Paragraph::new(vec![
        Line::from(text.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(Color::Gray),
        )),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(body, inner_area);
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
fn centered(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4)).max(area.width.min(1));
    let height = height.min(area.height.saturating_sub(2)).max(area.height.min(1));
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
