//! Top-level menu glue: onboarding, profile, rating, static buttons.

use crate::db;
use crate::state::AppState;
use anyhow::Result;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, ReplyMarkup,
};

pub const MAP_BUTTON: &str = "🛰 Космическая карта";
pub const ECO_BUTTON: &str = "🌍 Экологические данные";
pub const NEWS_BUTTON: &str = "📰 Новости";
pub const QUEST_BUTTON: &str = "🗺️ Квест-трип по городу";
pub const QUIZ_BUTTON: &str = "🎓 Викторина о космосе";
pub const PROFILE_BUTTON: &str = "🏅 Профиль";

pub fn main_menu_kb() -> ReplyMarkup {
    let rows = vec![
        vec![
            KeyboardButton::new(MAP_BUTTON),
            KeyboardButton::new(ECO_BUTTON),
        ],
        vec![
            KeyboardButton::new(NEWS_BUTTON),
            KeyboardButton::new(QUEST_BUTTON),
        ],
        vec![
            KeyboardButton::new(QUIZ_BUTTON),
            KeyboardButton::new(PROFILE_BUTTON),
        ],
    ];
    ReplyMarkup::Keyboard(KeyboardMarkup::new(rows).resize_keyboard(true))
}

pub async fn cmd_start(
    state: &AppState,
    chat: ChatId,
    user_id: i64,
    username: Option<&str>,
) -> Result<()> {
    if let Err(e) = db::upsert_user(&state.pool, user_id, username).await {
        tracing::error!(user_id, "failed to register user: {e}");
    }
    state.clear_session(user_id).await;

    let welcome = "🚀 Привет, космический путешественник! 🚀\n\n\
        Добро пожаловать в чат-бот SR space, твой личный космический центр управления!\n\n\
        Меня зовут Спэйси! От лица всей команды рад приветствовать! Я здесь, чтобы сделать космос ближе для тебя.\n\
        🔹 /map — Космическая карта спутников 🛰\n\
        🔹 /news — Свежие новости о космосе 📰\n\
        🔹 /eco — Данные о загрязнении и климате 🌍\n\
        🔹 /quest — Космический квест-трип по твоему городу 🗺️\n\
        🔹 /quiz — Викторина о космосе 🎓\n\
        🔹 /profile — Твой личный профиль 🏅";
    state.transport.send_text(chat, welcome).await?;
    state
        .transport
        .send_text_with_markup(chat, "Выбери команду или нажми на кнопку ниже ⬇️", main_menu_kb())
        .await?;
    Ok(())
}

pub async fn show_profile(state: &AppState, chat: ChatId, user_id: i64) -> Result<()> {
    let user = match db::find_user(&state.pool, user_id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(user_id, "failed to load profile: {e}");
            state
                .transport
                .send_text(chat, "Ошибка при получении профиля")
                .await?;
            return Ok(());
        }
    };
    let Some(user) = user else {
        state.transport.send_text(chat, "Профиль не найден!").await?;
        return Ok(());
    };

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🏆 Топ-5 рейтинг",
        "show_rating",
    )]]);
    let text = format!(
        "👤 Ваш профиль:\n▫️ Имя: {}\n▫️ Баллы: {}",
        user.username.as_deref().unwrap_or("гость"),
        user.points
    );
    state
        .transport
        .send_text_with_markup(chat, &text, ReplyMarkup::InlineKeyboard(keyboard))
        .await?;
    Ok(())
}

pub async fn show_rating(state: &AppState, query: &CallbackQuery) -> Result<()> {
    let Some(msg) = query.message.as_ref() else {
        state.transport.answer_callback(&query.id, None).await?;
        return Ok(());
    };
    let chat = msg.chat.id;

    let top = match db::top_users(&state.pool, 5).await {
        Ok(top) => top,
        Err(e) => {
            tracing::error!("failed to load rating: {e}");
            state
                .transport
                .answer_callback(&query.id, Some("⚠️ Ошибка загрузки рейтинга"))
                .await?;
            return Ok(());
        }
    };

    if top.is_empty() {
        state
            .transport
            .send_text(chat, "🏆 Рейтинг пока пуст!")
            .await?;
        state.transport.answer_callback(&query.id, None).await?;
        return Ok(());
    }

    let mut text = "🏆 Топ-5 пользователей:\n\n".to_string();
    for (i, entry) in top.iter().enumerate() {
        let username = entry.username.as_deref().unwrap_or("Аноним");
        text.push_str(&format!("{}. {} - ⭐ {} баллов\n", i + 1, username, entry.points));
    }
    state.transport.send_text(chat, &text).await?;
    state.transport.answer_callback(&query.id, None).await?;
    Ok(())
}

/// Placeholder sections; real content lives outside this bot.
pub async fn static_section(state: &AppState, chat: ChatId, section: &str) -> Result<()> {
    let text = match section {
        "map" => "🛰 Космическая карта спутников скоро появится здесь. Следи за обновлениями!",
        "eco" => "🌍 Экологические данные со спутников готовятся к публикации. Загляни позже!",
        "news" => "📰 Свежие космические новости прилетают рассылкой — не пропусти!",
        _ => "Раздел в разработке ⏳",
    };
    state
        .transport
        .send_text_with_markup(chat, text, main_menu_kb())
        .await?;
    Ok(())
}
