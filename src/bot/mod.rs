//! Webhook endpoint and update dispatch. Every inbound event terminates in
//! either a state transition or a user-visible message; handler errors are
//! logged here and never bubble up to the transport layer.

pub mod admin;
pub mod menu;
pub mod notify;
pub mod quest;
pub mod quiz;
pub mod transport;

use crate::domain::callback::Callback;
use crate::domain::quest as quest_domain;
use crate::state::{AppState, Session, SharedState};
use anyhow::Result;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::json;
use teloxide::types::{CallbackQuery, ChatKind, Message, Update, UpdateKind};

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/telegram/webhook", post(handle_update))
        .with_state(state)
}

async fn handle_update(
    State(state): State<SharedState>,
    Json(update): Json<Update>,
) -> Json<serde_json::Value> {
    match update.kind {
        UpdateKind::Message(msg) => {
            if let Err(e) = handle_message(&state, &msg).await {
                tracing::error!(chat = msg.chat.id.0, "message handler failed: {e:#}");
            }
        }
        UpdateKind::CallbackQuery(query) => {
            if let Err(e) = handle_callback(&state, &query).await {
                tracing::error!(user = query.from.id.0, "callback handler failed: {e:#}");
            }
        }
        _ => {}
    }
    Json(json!({"status": "ok"}))
}

async fn handle_message(state: &AppState, msg: &Message) -> Result<()> {
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }
    let chat = msg.chat.id;
    let user_id = chat.0;
    let text = msg.text();

    if let Some(text) = text {
        if text.starts_with('/') {
            return handle_command(state, msg, text).await;
        }

        // The exit button works from anywhere inside the quest.
        if text == quest_domain::EXIT_BUTTON {
            if let Some(Session::Quest(session)) = state.session(user_id).await {
                return quest::exit_to_menu(state, chat, user_id, &session).await;
            }
            state
                .transport
                .send_text_with_markup(chat, "Главное меню 👇", menu::main_menu_kb())
                .await?;
            return Ok(());
        }
    }

    if let Some(Session::Quest(session)) = state.session(user_id).await {
        return quest::handle_message(state, msg, session).await;
    }

    match text {
        Some(menu::QUEST_BUTTON) => quest::start(state, chat, user_id).await,
        Some(menu::QUIZ_BUTTON) => quiz::start(state, chat, user_id).await,
        Some(menu::PROFILE_BUTTON) => menu::show_profile(state, chat, user_id).await,
        Some(menu::MAP_BUTTON) => menu::static_section(state, chat, "map").await,
        Some(menu::ECO_BUTTON) => menu::static_section(state, chat, "eco").await,
        Some(menu::NEWS_BUTTON) => menu::static_section(state, chat, "news").await,
        _ => {
            if let Some(Session::Quiz(_)) = state.session(user_id).await {
                state
                    .transport
                    .send_text(chat, "Отвечай кнопками под вопросом 👆")
                    .await?;
                return Ok(());
            }
            tracing::debug!(user_id, "unroutable message");
            state
                .transport
                .send_text(chat, "Используйте кнопки меню для навигации")
                .await?;
            Ok(())
        }
    }
}

async fn handle_command(state: &AppState, msg: &Message, text: &str) -> Result<()> {
    let chat = msg.chat.id;
    let user_id = chat.0;
    let username = msg.from().and_then(|u| u.username.clone());

    if text.starts_with("/start") {
        return menu::cmd_start(state, chat, user_id, username.as_deref()).await;
    }
    if text.starts_with("/profile") {
        return menu::show_profile(state, chat, user_id).await;
    }
    if text.starts_with("/quest") {
        return quest::start(state, chat, user_id).await;
    }
    if text.starts_with("/quiz") {
        return quiz::start(state, chat, user_id).await;
    }
    if text.starts_with("/map") {
        return menu::static_section(state, chat, "map").await;
    }
    if text.starts_with("/eco") {
        return menu::static_section(state, chat, "eco").await;
    }
    if text.starts_with("/news") {
        return menu::static_section(state, chat, "news").await;
    }
    if let Some(body) = text.strip_prefix("/broadcast") {
        return admin::broadcast_news(state, chat, user_id, body).await;
    }
    if text.starts_with("/reset_quiz") {
        return admin::reset_quiz(state, chat, user_id).await;
    }

    state
        .transport
        .send_text(chat, "Неизвестная команда. Используйте кнопки меню.")
        .await?;
    Ok(())
}

async fn handle_callback(state: &AppState, query: &CallbackQuery) -> Result<()> {
    let Some(data) = query.data.as_deref() else {
        state.transport.answer_callback(&query.id, None).await?;
        return Ok(());
    };

    match Callback::parse(data) {
        Some(Callback::Category(id)) => quiz::handle_category(state, query, &id).await,
        Some(Callback::Answer(picked)) => quiz::handle_answer(state, query, picked).await,
        Some(Callback::ShowRating) => menu::show_rating(state, query).await,
        Some(cb) => quest::handle_callback(state, query, &cb).await,
        None => {
            // Unknown or malformed payload: acknowledge and move on.
            tracing::warn!(user = query.from.id.0, data, "unrecognized callback payload");
            state.transport.answer_callback(&query.id, None).await?;
            Ok(())
        }
    }
}
