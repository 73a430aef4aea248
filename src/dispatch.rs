//! Message generation requests and their cancellation
//!
//! At most one generation request is pending at a time. Starting a new one
//! cancels the previous token first; the cancelled request's task stops
//! waiting and never reports back.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::api::ChatBackend;
use crate::error::ApiResult;
use crate::model::{Chat, Message, NewChat};
use crate::transcript::Ticket;
use crate::tui::AppEvent;

/// Network completions, delivered to the event loop.
#[derive(Debug)]
pub enum ApiEvent {
    ChatsLoaded(ApiResult<Vec<Chat>>),
    ChatResolved {
        chat_id: String,
        result: ApiResult<Vec<Chat>>,
    },
    MessagesLoaded {
        chat_id: String,
        result: ApiResult<Vec<Message>>,
    },
    ChatCreated {
        chat_id: String,
        ticket: Ticket,
        result: ApiResult<()>,
    },
    Started {
        chat_id: String,
        ticket: Ticket,
        result: ApiResult<String>,
    },
    Generated {
        ticket: Ticket,
        result: ApiResult<String>,
    },
    Deleted {
        chat_id: String,
        result: ApiResult<()>,
    },
    SettingsLoaded {
        chat_id: String,
        result: ApiResult<Vec<Chat>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Sending(Ticket),
}

#[derive(Debug)]
struct PendingGeneration {
    ticket: Ticket,
    token: CancellationToken,
}

/// Tracks the single in-flight generation request.
#[derive(Debug, Default)]
pub struct Dispatcher {
    next_ticket: Ticket,
    pending: Option<PendingGeneration>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DispatchState {
        match &self.pending {
            Some(p) => DispatchState::Sending(p.ticket),
            None => DispatchState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// A fresh ticket that is not tracked as a generation (opening scenes).
    pub fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Cancel whatever is pending and register a new request.
    ///
    /// Returns the new ticket and token, plus the ticket that was cancelled.
    pub fn begin(&mut self) -> (Ticket, CancellationToken, Option<Ticket>) {
        let cancelled = self.cancel();
        let ticket = self.issue_ticket();
        let token = CancellationToken::new();
        self.pending = Some(PendingGeneration {
            ticket,
            token: token.clone(),
        });
        (ticket, token, cancelled)
    }

    /// Cancel the pending request, if any, and return its ticket.
    pub fn cancel(&mut self) -> Option<Ticket> {
        let pending = self.pending.take()?;
        pending.token.cancel();
        Some(pending.ticket)
    }

    /// Mark `ticket` as completed. False if it is no longer the pending one.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        match &self.pending {
            Some(p) if p.ticket == ticket => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

/// Run `POST /api/chats/{id}/messages` until it completes or is cancelled.
pub fn spawn_generation(
    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
    chat_id: String,
    text: String,
    ticket: Ticket,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!(ticket, chat_id = %chat_id, "generation cancelled");
                return;
            }
            result = backend.send_message(&chat_id, &text) => result,
        };
        let _ = events.send(AppEvent::Api(ApiEvent::Generated { ticket, result }));
    });
}

/// Persist a new chat, then wait for its opening scene.
///
/// Not cancellable: the opening reply is always awaited to completion.
pub fn spawn_create_and_start(
    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
    chat: NewChat,
    ticket: Ticket,
) {
    tokio::spawn(async move {
        let chat_id = chat.id.clone();
        let created = backend.create_chat(&chat).await;
        let failed = created.is_err();
        let _ = events.send(AppEvent::Api(ApiEvent::ChatCreated {
            chat_id: chat_id.clone(),
            ticket,
            result: created,
        }));
        if failed {
            return;
        }

        let result = backend.start_chat(&chat_id).await;
        let _ = events.send(AppEvent::Api(ApiEvent::Started {
            chat_id,
            ticket,
            result,
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous() {
        let mut d = Dispatcher::new();
        let (first, first_token, cancelled) = d.begin();
        assert_eq!(cancelled, None);
        assert_eq!(d.state(), DispatchState::Sending(first));

        let (second, _, cancelled) = d.begin();
        assert_eq!(cancelled, Some(first));
        assert!(first_token.is_cancelled());
        assert_eq!(d.state(), DispatchState::Sending(second));
    }

    #[test]
    fn test_finish_only_matches_pending() {
        let mut d = Dispatcher::new();
        let (first, _, _) = d.begin();
        let (second, _, _) = d.begin();
        assert!(!d.finish(first));
        assert!(d.finish(second));
        assert_eq!(d.state(), DispatchState::Idle);
    }

    #[test]
    fn test_cancel_when_idle() {
        let mut d = Dispatcher::new();
        assert_eq!(d.cancel(), None);
    }

    #[test]
    fn test_tickets_are_unique() {
        let mut d = Dispatcher::new();
        let start = d.issue_ticket();
        let (generation, _, _) = d.begin();
        assert_ne!(start, generation);
    }
}
