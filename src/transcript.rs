use crate::model::Message;

/// Identifies one outstanding reply (generation or opening scene).
pub type Ticket = u64;

/// A transcript row is either a message or a reply still being waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Settled(Message),
    Pending(Ticket),
}

/// Lines between the viewport and the end before the jump button shows up
const SCROLL_BUTTON_SLACK: u16 = 2;

/// The visible message history of the open chat
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    pub scroll: u16,
    stick_to_bottom: bool,
    max_scroll: u16,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            stick_to_bottom: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Settled(m) => Some(m),
            Entry::Pending(_) => None,
        })
    }

    /// True while anything is waiting for a reply (the typing indicator).
    pub fn is_typing(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Pending(_)))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_to_bottom();
    }

    /// Put a freshly fetched history in front of the rows added locally
    /// while it was loading (sent messages and their pending replies).
    pub fn load_history(&mut self, messages: Vec<Message>) {
        let local = std::mem::take(&mut self.entries);
        self.entries = messages.into_iter().map(Entry::Settled).collect();
        self.entries.extend(local);
        self.scroll_to_bottom();
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(Entry::Settled(message));
        self.scroll_to_bottom();
    }

    pub fn push_pending(&mut self, ticket: Ticket) {
        self.entries.push(Entry::Pending(ticket));
        self.scroll_to_bottom();
    }

    /// Drop the pending row for `ticket` and append `message`.
    ///
    /// Returns false (and changes nothing) if the ticket is not pending.
    pub fn settle(&mut self, ticket: Ticket, message: Message) -> bool {
        if !self.discard(ticket) {
            return false;
        }
        self.push(message);
        true
    }

    /// Drop the pending row for `ticket` without a replacement.
    pub fn discard(&mut self, ticket: Ticket) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| *e != Entry::Pending(ticket));
        before != self.entries.len()
    }

    // Scrolling

    pub fn scroll_to_bottom(&mut self) {
        self.stick_to_bottom = true;
        self.scroll = self.max_scroll;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.stick_to_bottom = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
        if self.scroll == self.max_scroll {
            self.stick_to_bottom = true;
        }
    }

    /// Called by the renderer once the wrapped height is known.
    pub fn fit(&mut self, total_lines: u16, visible_height: u16) {
        self.max_scroll = total_lines.saturating_sub(visible_height);
        if self.stick_to_bottom || self.scroll > self.max_scroll {
            self.scroll = self.max_scroll;
        }
    }

    pub fn show_scroll_button(&self) -> bool {
        self.max_scroll.saturating_sub(self.scroll) > SCROLL_BUTTON_SLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sender;

    #[test]
    fn test_settle_replaces_pending_at_end() {
        let mut t = Transcript::new();
        t.push(Message::user("hi"));
        t.push_pending(7);
        assert!(t.is_typing());

        assert!(t.settle(7, Message::assistant("hello")));
        assert!(!t.is_typing());
        let senders: Vec<Sender> = t.messages().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Assistant]);
    }

    #[test]
    fn test_settle_unknown_ticket_is_ignored() {
        let mut t = Transcript::new();
        t.push_pending(1);
        assert!(!t.settle(2, Message::assistant("late")));
        assert_eq!(t.entries(), &[Entry::Pending(1)]);
    }

    #[test]
    fn test_load_history_preserves_order() {
        let mut t = Transcript::new();
        t.load_history(vec![Message::system("a"), Message::user("b"), Message::assistant("c")]);
        let contents: Vec<&str> = t.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_history_keeps_rows_sent_while_loading() {
        let mut t = Transcript::new();
        t.push(Message::user("go"));
        t.push_pending(3);
        t.load_history(vec![Message::system("req"), Message::assistant("scene")]);

        assert!(t.is_typing());
        assert!(t.settle(3, Message::assistant("reply")));
        let contents: Vec<&str> = t.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["req", "scene", "go", "reply"]);
    }

    #[test]
    fn test_scroll_button_visibility() {
        let mut t = Transcript::new();
        t.fit(50, 10);
        assert_eq!(t.scroll, 40);
        assert!(!t.show_scroll_button());

        t.scroll_up(10);
        t.fit(50, 10);
        assert_eq!(t.scroll, 30);
        assert!(t.show_scroll_button());

        t.scroll_down(100);
        assert!(!t.show_scroll_button());
    }

    #[test]
    fn test_new_message_sticks_to_bottom() {
        let mut t = Transcript::new();
        t.fit(50, 10);
        t.scroll_up(20);
        t.push(Message::user("more"));
        t.fit(52, 10);
        assert_eq!(t.scroll, 42);
    }
}
