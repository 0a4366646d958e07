use crate::models::Message;

/// Events delivered to the controller from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    /// The poll interval elapsed
    PollTick,
    /// A message fetch finished. `generation` is the selection generation the
    /// fetch was started under.
    MessagesLoaded {
        generation: u64,
        contact_id: i64,
        messages: Vec<Message>,
    },
}
