use std::future::Future;
use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::ChatBackend;
use crate::dispatch::{self, ApiEvent, Dispatcher};
use crate::format;
use crate::input::TextInput;
use crate::model::{Chat, Message, NewChat};
use crate::transcript::Transcript;
use crate::tui::AppEvent;

pub const REQUEST_PREFIX: &str = "🔮 Запрос на историю: ";
pub const GENERATION_STOPPED: &str = "⏹️ Генерация остановлена";
pub const NOTHING_TO_STOP: &str = "⏹️ Нет активной генерации";
pub const CONNECTION_ERROR: &str = "Ошибка связи с Тейей";
pub const EMPTY_REQUEST: &str = "Напиши запрос";
pub const CONFIRM_DELETE: &str = "🖤 Точно удалить этот мир?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    ChatList,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    NewChat,
    Settings,
    ConfirmDelete,
}

/// Which chat is open and what it is waiting for. Reset whenever the user
/// leaves the chat.
#[derive(Debug, Default)]
pub struct ViewState {
    pub current_chat_id: Option<String>,
    pub dispatcher: Dispatcher,
}

impl ViewState {
    pub fn is_current(&self, chat_id: &str) -> bool {
        self.current_chat_id.as_deref() == Some(chat_id)
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub modal: Option<Modal>,
    pub view: ViewState,

    // Chat list
    pub chats: Vec<Chat>,
    pub chats_state: ListState,
    pub chats_loaded: bool,
    pub list_status: Option<String>,

    // Open chat
    pub chat_title: String,
    pub transcript: Transcript,
    pub input: TextInput,

    // Dialogs
    pub new_chat_input: TextInput,
    pub new_chat_notice: Option<String>,
    pub settings_request: String,
    pub pending_delete: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub list_area: Option<Rect>,
    pub modal_area: Option<Rect>,
    pub scroll_button_area: Option<Rect>,

    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(backend: Arc<dyn ChatBackend>, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            screen: Screen::ChatList,
            modal: None,
            view: ViewState::default(),

            chats: Vec::new(),
            chats_state: ListState::default(),
            chats_loaded: false,
            list_status: None,

            chat_title: String::new(),
            transcript: Transcript::new(),
            input: TextInput::new(),

            new_chat_input: TextInput::new(),
            new_chat_notice: None,
            settings_request: String::new(),
            pending_delete: None,

            animation_frame: 0,

            list_area: None,
            modal_area: None,
            scroll_button_area: None,

            backend,
            events,
        }
    }

    /// Run a backend call off the loop and deliver its result as an event.
    fn spawn<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<dyn ChatBackend>) -> Fut + Send + 'static,
        Fut: Future<Output = ApiEvent> + Send + 'static,
    {
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = call(backend).await;
            let _ = events.send(AppEvent::Api(event));
        });
    }

    // Chat list

    pub fn load_chats(&mut self) {
        self.spawn(|backend| async move { ApiEvent::ChatsLoaded(backend.list_chats().await) });
    }

    pub fn selected_chat(&self) -> Option<&Chat> {
        self.chats_state.selected().and_then(|i| self.chats.get(i))
    }

    pub fn list_down(&mut self) {
        let len = self.chats.len();
        if len > 0 {
            let i = self.chats_state.selected().unwrap_or(0);
            self.chats_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn list_up(&mut self) {
        let i = self.chats_state.selected().unwrap_or(0);
        self.chats_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.selected_chat().map(|c| c.id.clone()) {
            self.open_chat(&id);
        }
    }

    // Navigation

    /// Select a chat, resolve its title from the list, then load its history.
    pub fn open_chat(&mut self, chat_id: &str) {
        self.reset_view();
        self.view.current_chat_id = Some(chat_id.to_string());
        let chat_id = chat_id.to_string();
        self.spawn(|backend| async move {
            let result = backend.list_chats().await;
            ApiEvent::ChatResolved { chat_id, result }
        });
    }

    pub fn load_chat_messages(&mut self, chat_id: &str) {
        let chat_id = chat_id.to_string();
        self.spawn(|backend| async move {
            let result = backend.chat_messages(&chat_id).await;
            ApiEvent::MessagesLoaded { chat_id, result }
        });
    }

    pub fn back_to_list(&mut self) {
        self.reset_view();
        self.screen = Screen::ChatList;
        self.modal = None;
        self.load_chats();
    }

    /// Forget the open chat. A pending generation is dropped without a notice.
    fn reset_view(&mut self) {
        if let Some(ticket) = self.view.dispatcher.cancel() {
            tracing::debug!(ticket, "dropping pending generation");
        }
        self.view.current_chat_id = None;
        self.transcript.clear();
        self.input.clear();
    }

    fn enter_chat(&mut self, title: &str) {
        self.chat_title = title.to_string();
        self.screen = Screen::Chat;
    }

    // Message dispatch

    pub fn send_message(&mut self) {
        let text = self.input.text().trim().to_string();
        let Some(chat_id) = self.view.current_chat_id.clone() else {
            return;
        };
        if text.is_empty() {
            return;
        }

        let (ticket, token, superseded) = self.view.dispatcher.begin();
        if let Some(old) = superseded {
            tracing::info!(ticket = old, "generation superseded by a new message");
            self.transcript.settle(old, Message::system(GENERATION_STOPPED));
        }

        self.transcript.push(Message::user(text.clone()));
        self.input.clear();
        self.transcript.push_pending(ticket);

        tracing::info!(ticket, chat_id = %chat_id, "sending message");
        dispatch::spawn_generation(
            self.backend.clone(),
            self.events.clone(),
            chat_id,
            text,
            ticket,
            token,
        );
    }

    pub fn stop_generation(&mut self) {
        match self.view.dispatcher.cancel() {
            Some(ticket) => {
                tracing::info!(ticket, "generation stopped by user");
                self.transcript.settle(ticket, Message::system(GENERATION_STOPPED));
            }
            None => self.transcript.push(Message::system(NOTHING_TO_STOP)),
        }
    }

    // Chat creation

    pub fn open_new_chat_modal(&mut self) {
        self.new_chat_notice = None;
        self.modal = Some(Modal::NewChat);
    }

    pub fn create_new_chat(&mut self) {
        let request = self.new_chat_input.text().trim().to_string();
        if request.is_empty() {
            self.new_chat_notice = Some(EMPTY_REQUEST.to_string());
            return;
        }

        let chat = NewChat {
            id: format::chat_id_now(),
            title: format::chat_title(&request),
            request: request.clone(),
        };

        self.modal = None;
        self.new_chat_input.clear();
        self.new_chat_notice = None;

        self.reset_view();
        self.view.current_chat_id = Some(chat.id.clone());
        self.enter_chat(&chat.title);
        self.transcript
            .push(Message::system(format!("{}{}", REQUEST_PREFIX, request)));

        let ticket = self.view.dispatcher.issue_ticket();
        tracing::info!(chat_id = %chat.id, "creating chat");
        dispatch::spawn_create_and_start(self.backend.clone(), self.events.clone(), chat, ticket);
    }

    // Deletion

    pub fn request_delete(&mut self, chat_id: &str) {
        self.pending_delete = Some(chat_id.to_string());
        self.modal = Some(Modal::ConfirmDelete);
    }

    pub fn request_delete_selected(&mut self) {
        if let Some(id) = self.selected_chat().map(|c| c.id.clone()) {
            self.request_delete(&id);
        }
    }

    pub fn confirm_delete(&mut self) {
        self.modal = None;
        let Some(chat_id) = self.pending_delete.take() else {
            return;
        };
        tracing::info!(chat_id = %chat_id, "deleting chat");
        self.spawn(|backend| async move {
            let result = backend.delete_chat(&chat_id).await;
            ApiEvent::Deleted { chat_id, result }
        });
    }

    pub fn cancel_delete(&mut self) {
        self.modal = None;
        self.pending_delete = None;
    }

    // Settings

    pub fn open_settings(&mut self) {
        let Some(chat_id) = self.view.current_chat_id.clone() else {
            return;
        };
        self.spawn(|backend| async move {
            let result = backend.list_chats().await;
            ApiEvent::SettingsLoaded { chat_id, result }
        });
    }

    pub fn close_modal(&mut self) {
        if self.modal == Some(Modal::ConfirmDelete) {
            self.pending_delete = None;
        }
        self.modal = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.transcript.is_typing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Network completions

    pub fn apply(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::ChatsLoaded(result) => match result {
                Ok(chats) => {
                    self.chats = chats;
                    self.chats_loaded = true;
                    self.list_status = None;
                    let selected = match self.chats_state.selected() {
                        _ if self.chats.is_empty() => None,
                        Some(i) => Some(i.min(self.chats.len() - 1)),
                        None => Some(0),
                    };
                    self.chats_state.select(selected);
                }
                Err(e) => {
                    tracing::error!("failed to load chats: {}", e);
                    self.list_status = Some(CONNECTION_ERROR.to_string());
                }
            },

            ApiEvent::ChatResolved { chat_id, result } => {
                if !self.view.is_current(&chat_id) {
                    return;
                }
                match result {
                    Ok(chats) => {
                        let title = chats
                            .iter()
                            .find(|c| c.id == chat_id)
                            .map(|c| c.title.clone())
                            .unwrap_or_default();
                        self.enter_chat(&title);
                        self.load_chat_messages(&chat_id);
                    }
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, "failed to open chat: {}", e);
                        self.view.current_chat_id = None;
                        self.list_status = Some(CONNECTION_ERROR.to_string());
                    }
                }
            }

            ApiEvent::MessagesLoaded { chat_id, result } => {
                if !self.view.is_current(&chat_id) {
                    return;
                }
                match result {
                    Ok(messages) => self.transcript.load_history(messages),
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, "failed to load messages: {}", e);
                        self.transcript.push(Message::system(CONNECTION_ERROR));
                    }
                }
            }

            ApiEvent::ChatCreated { chat_id, ticket, result } => {
                if !self.view.is_current(&chat_id) {
                    return;
                }
                match result {
                    Ok(()) => self.transcript.push_pending(ticket),
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, "failed to create chat: {}", e);
                        self.transcript.push(Message::system(CONNECTION_ERROR));
                    }
                }
            }

            ApiEvent::Started { chat_id, ticket, result } => {
                if !self.view.is_current(&chat_id) {
                    tracing::debug!(chat_id = %chat_id, "opening scene for a chat no longer open");
                    return;
                }
                let message = match result {
                    Ok(reply) => Message::assistant(reply),
                    Err(e) => {
                        tracing::error!(chat_id = %chat_id, "failed to start chat: {}", e);
                        Message::system(CONNECTION_ERROR)
                    }
                };
                self.transcript.settle(ticket, message);
            }

            ApiEvent::Generated { ticket, result } => {
                if !self.view.dispatcher.finish(ticket) {
                    tracing::debug!(ticket, "ignoring stale reply");
                    return;
                }
                let message = match result {
                    Ok(reply) => Message::assistant(reply),
                    Err(e) => {
                        tracing::error!(ticket, "message failed: {}", e);
                        Message::system(CONNECTION_ERROR)
                    }
                };
                if !self.transcript.settle(ticket, message.clone()) {
                    tracing::warn!(ticket, "typing row missing, appending reply");
                    self.transcript.push(message);
                }
            }

            ApiEvent::Deleted { chat_id, result } => match result {
                Ok(()) => {
                    if self.view.is_current(&chat_id) {
                        self.reset_view();
                        self.screen = Screen::ChatList;
                    }
                    self.load_chats();
                }
                Err(e) => {
                    tracing::error!(chat_id = %chat_id, "failed to delete chat: {}", e);
                    self.list_status = Some(CONNECTION_ERROR.to_string());
                }
            },

            ApiEvent::SettingsLoaded { chat_id, result } => {
                if !self.view.is_current(&chat_id) {
                    return;
                }
                match result {
                    Ok(chats) => {
                        if let Some(chat) = chats.into_iter().find(|c| c.id == chat_id) {
                            self.settings_request = chat.request;
                            self.modal = Some(Modal::Settings);
                        }
                    }
                    Err(e) => tracing::error!(chat_id = %chat_id, "failed to load settings: {}", e),
                }
            }
        }
    }
}
