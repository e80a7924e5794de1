//! Outbound messaging seam. The flows talk to this trait instead of the
//! teloxide client directly, so fan-out and the state machine can be driven
//! in tests without a network.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, InputFile, MessageId, ReplyMarkup};
use thiserror::Error;

/// A failed delivery to one recipient. Transient failures are worth a retry
/// (rate limits, network hiccups); permanent ones are not (blocked bot,
/// malformed request).
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transient delivery failure: {0}")]
    Transient(String),
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

impl From<teloxide::RequestError> for DeliveryError {
    fn from(err: teloxide::RequestError) -> Self {
        use teloxide::RequestError::*;
        match err {
            RetryAfter(_) | Network(_) | Io(_) => DeliveryError::Transient(err.to_string()),
            other => DeliveryError::Permanent(other.to_string()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError>;

    async fn send_text_with_markup(
        &self,
        chat: ChatId,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<(), DeliveryError>;

    async fn send_photo(
        &self,
        chat: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError>;

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), DeliveryError>;

    async fn delete_message(&self, chat: ChatId, message: MessageId)
        -> Result<(), DeliveryError>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        toast: Option<&str>,
    ) -> Result<(), DeliveryError>;
}

pub struct TelegramTransport {
    bot: teloxide::Bot,
}

impl TelegramTransport {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.bot.send_message(chat, text).await?;
        Ok(())
    }

    async fn send_text_with_markup(
        &self,
        chat: ChatId,
        text: &str,
        markup: ReplyMarkup,
    ) -> Result<(), DeliveryError> {
        self.bot.send_message(chat, text).reply_markup(markup).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let request = self
            .bot
            .send_photo(chat, InputFile::file_id(file_id.to_string()));
        match caption {
            Some(caption) => request.caption(caption.to_string()).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), DeliveryError> {
        let request = self.bot.edit_message_text(chat, message, text);
        match markup {
            Some(markup) => request.reply_markup(markup).await?,
            None => request.await?,
        };
        Ok(())
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> Result<(), DeliveryError> {
        self.bot.delete_message(chat, message).await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        toast: Option<&str>,
    ) -> Result<(), DeliveryError> {
        let request = self.bot.answer_callback_query(callback_id.to_string());
        match toast {
            Some(toast) => request.text(toast.to_string()).await?,
            None => request.await?,
        };
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory transport for driving the flows without a network. Records
    /// outbound traffic; failure behavior is configured per chat id.
    #[derive(Default)]
    pub struct MockTransport {
        /// Every send attempted, in order, with the delivered text.
        pub sent: Mutex<Vec<(i64, String)>>,
        pub attempts: Mutex<HashMap<i64, u32>>,
        /// One entry per answered callback, carrying the toast if any.
        pub answered: Mutex<Vec<Option<String>>>,
        pub fail_transient: HashSet<i64>,
        pub fail_permanent: HashSet<i64>,
        /// Recipients that fail transiently this many times, then succeed.
        pub flaky: HashMap<i64, u32>,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl MockTransport {
        pub fn attempts_for(&self, chat: i64) -> u32 {
            *self.attempts.lock().unwrap().get(&chat).unwrap_or(&0)
        }

        pub fn sent_chats(&self) -> Vec<i64> {
            self.sent.lock().unwrap().iter().map(|(chat, _)| *chat).collect()
        }

        pub fn sent_texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }

        pub fn toasts(&self) -> Vec<Option<String>> {
            self.answered.lock().unwrap().clone()
        }

        fn record(&self, chat: i64, text: &str) -> u32 {
            self.sent.lock().unwrap().push((chat, text.to_string()));
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(chat).or_insert(0);
            *count += 1;
            *count
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), DeliveryError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let attempt = self.record(chat.0, text);
            if self.fail_permanent.contains(&chat.0) {
                return Err(DeliveryError::Permanent("blocked".into()));
            }
            if self.fail_transient.contains(&chat.0) {
                return Err(DeliveryError::Transient("timeout".into()));
            }
            if let Some(failures) = self.flaky.get(&chat.0) {
                if attempt <= *failures {
                    return Err(DeliveryError::Transient("flood wait".into()));
                }
            }
            Ok(())
        }

        async fn send_text_with_markup(
            &self,
            chat: ChatId,
            text: &str,
            _markup: ReplyMarkup,
        ) -> Result<(), DeliveryError> {
            self.send_text(chat, text).await
        }

        async fn send_photo(
            &self,
            chat: ChatId,
            _file_id: &str,
            caption: Option<&str>,
        ) -> Result<(), DeliveryError> {
            self.send_text(chat, caption.unwrap_or("")).await
        }

        async fn edit_text(
            &self,
            _chat: ChatId,
            _message: MessageId,
            _text: &str,
            _markup: Option<InlineKeyboardMarkup>,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn delete_message(
            &self,
            _chat: ChatId,
            _message: MessageId,
        ) -> Result<(), DeliveryError> {
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            toast: Option<&str>,
        ) -> Result<(), DeliveryError> {
            self.answered.lock().unwrap().push(toast.map(str::to_string));
            Ok(())
        }
    }
}
