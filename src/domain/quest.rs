//! The quest stage registry and the ephemeral per-conversation quest state.
//!
//! The quest is a fixed, ordered chain of stages. Each stage declares what
//! kind of input unlocks it (a photo, free text, or free text gated on a
//! concrete answer), an optional second sub-step, and how the transition to
//! the next stage happens. Handlers in `bot::quest` are generic over this
//! table; nothing stage-specific lives outside of it.

pub const STAGE_COUNT: u8 = 10;

/// Points per committed stage.
pub const STAGE_POINTS: i64 = 10;
/// Bonus for finishing the whole quest.
pub const COMPLETION_BONUS: i64 = 30;

/// Global reply-keyboard button, valid from any in-progress stage.
pub const EXIT_BUTTON: &str = "🚪 Выйти в меню";

/// What kind of input the current sub-step is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A photo; an optional caption rides along as the answer.
    Photo,
    /// Any free text.
    Text,
    /// Free text that must match one of the accepted answers
    /// (case-insensitive). A miss re-prompts and commits nothing.
    GatedText,
}

/// Second sub-step of a stage. Both sub-steps commit as one submission row
/// under the stage's own number.
#[derive(Debug, Clone, Copy)]
pub enum FollowUp {
    /// Photo first, then a text answer.
    Text { prompt: &'static str },
    /// Gated text first, then a photo.
    Photo { prompt: &'static str },
}

/// How the stage hands over to the next one after its commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Enter the next stage immediately.
    Auto,
    /// Show a "Далее ➡️" inline button; the callback performs the transition.
    NextButton,
    /// Final stage: completion bookkeeping instead of a transition.
    Finish,
}

/// A reply-keyboard button shown with the stage prompt. Pressing it does not
/// advance anything, it only answers with a reminder of what to send.
#[derive(Debug, Clone, Copy)]
pub struct FoundButton {
    pub label: &'static str,
    pub reminder: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct StageDef {
    pub number: u8,
    pub prompt: &'static str,
    pub input: InputKind,
    /// Accepted answers for `InputKind::GatedText`, empty otherwise.
    pub accepted: &'static [&'static str],
    /// Re-prompt when a gated answer misses.
    pub gate_retry: &'static str,
    pub found_button: Option<FoundButton>,
    pub follow_up: Option<FollowUp>,
    pub advance: Advance,
    /// Re-prompt when the input is of the wrong kind.
    pub wrong_kind: &'static str,
    /// Sent right after a successful commit.
    pub compliment: &'static str,
    /// Label for the advance button, when `advance` is `NextButton`.
    pub next_label: &'static str,
}

pub static STAGES: [StageDef; STAGE_COUNT as usize] = [
    StageDef {
        number: 1,
        prompt: "Он сказал: «Поехали»! – И вот первое задание квеста:\n\
                 🗽 Задание 1: Космический Памятник\n\
                 Найди в городе памятник или монумент, связанный с космонавтами или учеными.",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: Some(FoundButton {
            label: "Нашел памятник ✅",
            reminder: "Теперь сделай фотографию у памятника, отправь ее мне с ответом на вопрос: \
                       «Кто изображен на памятнике и что он сделал для космонавтики?»",
        }),
        follow_up: None,
        advance: Advance::Auto,
        wrong_kind: "❌ Пожалуйста, отправь фотографию памятника!",
        compliment: "Вот это кадр! Такой ракурс смогли бы подобрать разве что только спутники SR space!",
        next_label: "Далее ➡️",
    },
    StageDef {
        number: 2,
        prompt: "🌃 Задание 2: Космические Улицы\n\
                 Найди на карте своего города улицы или переулки, названные в честь космонавтов или ученых.",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: Some(FoundButton {
            label: "Нашел улицу ✅",
            reminder: "📸 Отлично! Теперь отправь фотографию улицы с названием.",
        }),
        follow_up: Some(FollowUp::Text {
            prompt: "📝 Теперь ответь: «Кто дал имя этой улице и что он сделал для космонавтики?»",
        }),
        advance: Advance::NextButton,
        wrong_kind: "❌ Пожалуйста, отправь фотографию улицы!",
        compliment: "Материалы получены! Эту фотографию можно даже на карту GPS ставить!",
        next_label: "Далее ➡️",
    },
    StageDef {
        number: 3,
        prompt: "🏛️ Задание 3: Космическая Выставка\n\
                 Найди ключевой экспонат и пришли его фото с описанием",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: Some(FoundButton {
            label: "Нашел экспонат ✅",
            reminder: "📸 Отлично! Теперь отправь фотографию экспоната.",
        }),
        follow_up: None,
        advance: Advance::NextButton,
        wrong_kind: "❌ Пожалуйста, отправь фотографию экспоната!",
        compliment: "Экспонат как на подбор! Музей гордится твоим выбором!",
        next_label: "Далее ➡️",
    },
    StageDef {
        number: 4,
        prompt: "⚙️ Задание 4: Технологический прогресс\n\
                 Отыщи в музее фотографию или макет самой первой и самой современной ракеты.",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: Some(FoundButton {
            label: "Нашел ракеты ✅",
            reminder: "📸 Отправь фотографию ракет с подписью «Старая vs Новая»",
        }),
        follow_up: Some(FollowUp::Text {
            prompt: "📝 Теперь напиши, в чем современная ракета лучше старой?",
        }),
        advance: Advance::NextButton,
        wrong_kind: "❌ Пожалуйста, отправь фотографию ракет!",
        compliment: "🚀 Отличное сравнение! Ты настоящий космический инженер!",
        next_label: "Следующее задание ➡️",
    },
    StageDef {
        number: 5,
        prompt: "🌌 Задание 5: Поиск среди звезд\n\
                 Используя карту /map, найди местоположение спутника и сфотографируй экран",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: Some(FoundButton {
            label: "Нашел ✅",
            reminder: "📸 Отправь фотографию",
        }),
        follow_up: None,
        advance: Advance::NextButton,
        wrong_kind: "❌ Пожалуйста, отправь фотографию экрана с картой!",
        compliment: "Вот это точность! Ты точно человек?",
        next_label: "Следующее задание ➡️",
    },
    StageDef {
        number: 6,
        prompt: "❓ Задание 6: Космическая Загадка\n\n\
                 Реши загадку о следующем месте, а затем отправься туда:\n\n\
                 В храме мудрости, где знания спят,\n\
                 Сокровищница мысли, где секреты хранят.\n\
                 Не в лаборатории, не в зале славы,\n\
                 А в месте, где прошлое и настоящее встречаются.\n\n\
                 Его стены — это ворота в прошлое,\n\
                 А полки — это мосты в будущее.\n\
                 Здесь хранятся истории о звездах и земле,\n\
                 И о том, как люди достигли космических высот",
        input: InputKind::GatedText,
        accepted: &["библиотека"],
        gate_retry: "Неверно, попробуй еще раз!",
        found_button: None,
        follow_up: None,
        advance: Advance::NextButton,
        wrong_kind: "📝 Напиши ответ на загадку текстом.",
        compliment: "Загадка разгадана! Ты настоящий космический детектив!",
        next_label: "Далее ➡️",
    },
    StageDef {
        number: 7,
        prompt: "📚 Задание 7: Сотворение космоса и истины о нем\n\n\
                 Тебя уже ждут в библиотеке!\n\
                 Найди раздел о космонавтике. Выбери одну книгу о космосе и расскажи мне, о чем она. \
                 Лучшие описания книг я передаю для публикации в нашем официальном канале, \
                 а авторы получают дополнительный подарок, поэтому постарайся!",
        input: InputKind::Text,
        accepted: &[],
        gate_retry: "",
        found_button: None,
        follow_up: None,
        advance: Advance::NextButton,
        wrong_kind: "📝 Напиши описание книги текстом.",
        compliment: "Получено! Как здорово вышло! Похоже, в тебе зарождается профессиональный писатель!",
        next_label: "Далее ➡️",
    },
    StageDef {
        number: 8,
        prompt: "Задание 8: Достижения на полке\n\n\
                 В настоящее время преемником советского союза в области космических достижений \
                 является компания, ставящая своей миссией — сделать космос доступным для решения \
                 глобальных проблем человечества. Попробуешь угадать её название?",
        input: InputKind::GatedText,
        accepted: &["sr space", "srspace", "ср спейс"],
        gate_retry: "Неверно, попробуй еще! 🔍",
        found_button: None,
        follow_up: Some(FollowUp::Photo {
            prompt: "Верно!\n\n📸 Не покидая библиотеки, найди место, где могла бы оказаться книга \
                     о новых достижениях в области российской космонавтики нашего столетия, \
                     совершенных данной компанией, и пришли мне фото.",
        }),
        advance: Advance::NextButton,
        wrong_kind: "📝 Напиши название компании текстом.",
        compliment: "📸 Отличный выбор! Именно здесь мы разместим книгу о наших достижениях!",
        next_label: "Следующее задание ➡️",
    },
    StageDef {
        number: 9,
        prompt: "🛰️ Задание 9: Будущее российской космонавтики\n\
                 SR Space – частная российская космическая компания, активно развивает российскую \
                 частную космонавтику и внедряет инновационные технологии в сферу космоса для \
                 улучшения качества жизни на Земле.\n\n\
                 Напиши краткий отчет (3-5 предложений) о самых весомых проектах компании на твой \
                 взгляд и их значении для российской космонавтики. Ты можешь воспользоваться сайтом \
                 компании и ее социальными сетями:\n\n\
                 https://srspace.ru/en\n\n\
                 https://t.me/srspaceru\n\n\
                 https://vk.com/srspaceru",
        input: InputKind::Text,
        accepted: &[],
        gate_retry: "",
        found_button: None,
        follow_up: None,
        advance: Advance::NextButton,
        wrong_kind: "📝 Напиши отчет текстом.",
        compliment: "Отчет принят! Твои данные отправлены в ЦУП!",
        next_label: "Перейти к финалу ➡️",
    },
    StageDef {
        number: 10,
        prompt: "Задание 10: Созерцание\n\
                 Найди человека, который дорог тебе, и сделай фотографию с ним \
                 (на фото должно быть не меньше двух людей)",
        input: InputKind::Photo,
        accepted: &[],
        gate_retry: "",
        found_button: None,
        follow_up: None,
        advance: Advance::Finish,
        wrong_kind: "❌ Пожалуйста, отправь совместную фотографию!",
        compliment: "Эта фотография прекрасна…",
        next_label: "Далее ➡️",
    },
];

pub fn stage(number: u8) -> Option<&'static StageDef> {
    if (1..=STAGE_COUNT).contains(&number) {
        Some(&STAGES[(number - 1) as usize])
    } else {
        None
    }
}

/// Case-insensitive match against a gated stage's accepted answers.
pub fn gate_matches(def: &StageDef, text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    def.accepted.iter().any(|a| *a == normalized)
}

/// Which sub-step of a stage the conversation is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStep {
    Primary,
    FollowUp,
    /// Committed; waiting for the explicit advance button.
    AwaitingNext,
}

/// Fine-grained ephemeral quest state for one conversation. The durable
/// counterpart is the `user_progress` row, which only tracks the coarse
/// stage number and city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestStep {
    /// Waiting for the city name that seeds the whole run.
    AwaitingCity,
    /// Saved progress found; waiting for the continue/restart choice.
    ConfirmReset,
    InStage { step: StageStep },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestSession {
    pub stage: u8,
    pub city: Option<String>,
    pub step: QuestStep,
    /// Photo file id buffered between the sub-steps of a photo+text stage.
    pub pending_photo: Option<String>,
    /// Accepted gate answer buffered until the follow-up photo arrives.
    pub pending_answer: Option<String>,
}

impl QuestSession {
    pub fn new_run() -> Self {
        QuestSession {
            stage: 1,
            city: None,
            step: QuestStep::AwaitingCity,
            pending_photo: None,
            pending_answer: None,
        }
    }

    pub fn resuming(stage: u8, city: String) -> Self {
        QuestSession {
            stage,
            city: Some(city),
            step: QuestStep::ConfirmReset,
            pending_photo: None,
            pending_answer: None,
        }
    }

    pub fn enter_stage(&mut self, number: u8) {
        self.stage = number;
        self.step = QuestStep::InStage {
            step: StageStep::Primary,
        };
        self.pending_photo = None;
        self.pending_answer = None;
    }
}

/// What one piece of stage input should lead to. Only `Commit` may write a
/// submission or move the durable stage; every other action leaves the
/// persistent state alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    /// Input of the wrong kind; send the stage's corrective text.
    WrongKind(&'static str),
    /// Gated answer missed; send the retry text.
    GateRetry(&'static str),
    /// The "found it" button was tapped; remind what to send.
    FoundReminder(&'static str),
    /// First artifact accepted and buffered; ask for the second sub-step.
    FollowUpPrompt(&'static str),
    /// Already committed; the advance button is what moves on.
    AwaitingAdvance,
    /// Follow-up sub-step with no follow-up defined: stale, re-enter.
    Reenter,
    /// Commit one submission row carrying these artifacts.
    Commit {
        photo_id: Option<String>,
        answer: Option<String>,
    },
}

/// Decide what to do with one inbound message for the given stage and
/// sub-step. Buffers follow-up artifacts into the session; performs no I/O.
pub fn stage_action(
    def: &StageDef,
    step: StageStep,
    session: &mut QuestSession,
    photo_id: Option<String>,
    text: Option<&str>,
    caption: Option<&str>,
) -> StageAction {
    match step {
        StageStep::Primary => match def.input {
            InputKind::Photo => match photo_id {
                Some(photo) => match def.follow_up {
                    Some(FollowUp::Text { prompt }) => {
                        session.pending_photo = Some(photo);
                        session.step = QuestStep::InStage {
                            step: StageStep::FollowUp,
                        };
                        StageAction::FollowUpPrompt(prompt)
                    }
                    _ => StageAction::Commit {
                        photo_id: Some(photo),
                        answer: caption.map(str::to_string),
                    },
                },
                None => {
                    if let Some(button) = &def.found_button {
                        if text == Some(button.label) {
                            return StageAction::FoundReminder(button.reminder);
                        }
                    }
                    StageAction::WrongKind(def.wrong_kind)
                }
            },
            InputKind::Text => match text.filter(|t| !t.trim().is_empty()) {
                Some(answer) => StageAction::Commit {
                    photo_id: None,
                    answer: Some(answer.to_string()),
                },
                None => StageAction::WrongKind(def.wrong_kind),
            },
            InputKind::GatedText => {
                let Some(answer) = text else {
                    return StageAction::WrongKind(def.wrong_kind);
                };
                if !gate_matches(def, answer) {
                    return StageAction::GateRetry(def.gate_retry);
                }
                match def.follow_up {
                    Some(FollowUp::Photo { prompt }) => {
                        session.pending_answer = Some(answer.to_string());
                        session.step = QuestStep::InStage {
                            step: StageStep::FollowUp,
                        };
                        StageAction::FollowUpPrompt(prompt)
                    }
                    _ => StageAction::Commit {
                        photo_id: None,
                        answer: Some(answer.to_string()),
                    },
                }
            }
        },
        StageStep::FollowUp => match def.follow_up {
            Some(FollowUp::Text { prompt }) => match text.filter(|t| !t.trim().is_empty()) {
                Some(answer) => StageAction::Commit {
                    photo_id: session.pending_photo.take(),
                    answer: Some(answer.to_string()),
                },
                None => StageAction::WrongKind(prompt),
            },
            Some(FollowUp::Photo { prompt }) => match photo_id {
                Some(photo) => StageAction::Commit {
                    photo_id: Some(photo),
                    answer: session.pending_answer.take(),
                },
                None => StageAction::WrongKind(prompt),
            },
            None => StageAction::Reenter,
        },
        StageStep::AwaitingNext => StageAction::AwaitingAdvance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_ordered_and_complete() {
        assert_eq!(STAGES.len(), STAGE_COUNT as usize);
        for (i, def) in STAGES.iter().enumerate() {
            assert_eq!(def.number as usize, i + 1);
            assert!(!def.prompt.is_empty());
            assert!(!def.compliment.is_empty());
        }
    }

    #[test]
    fn only_final_stage_finishes() {
        for def in &STAGES {
            if def.number == STAGE_COUNT {
                assert_eq!(def.advance, Advance::Finish);
            } else {
                assert_ne!(def.advance, Advance::Finish);
            }
        }
    }

    #[test]
    fn gated_stages_declare_answers() {
        for def in &STAGES {
            match def.input {
                InputKind::GatedText => {
                    assert!(!def.accepted.is_empty());
                    assert!(!def.gate_retry.is_empty());
                }
                _ => assert!(def.accepted.is_empty()),
            }
        }
    }

    #[test]
    fn riddle_gate_is_case_insensitive() {
        let riddle = stage(6).unwrap();
        assert!(gate_matches(riddle, "библиотека"));
        assert!(gate_matches(riddle, "Библиотека"));
        assert!(gate_matches(riddle, "  БИБЛИОТЕКА "));
        assert!(!gate_matches(riddle, "музей"));

        let company = stage(8).unwrap();
        assert!(gate_matches(company, "SR Space"));
        assert!(gate_matches(company, "srspace"));
        assert!(gate_matches(company, "Ср Спейс"));
        assert!(!gate_matches(company, "роскосмос"));
    }

    #[test]
    fn stage_lookup_bounds() {
        assert!(stage(0).is_none());
        assert!(stage(1).is_some());
        assert!(stage(STAGE_COUNT).is_some());
        assert!(stage(STAGE_COUNT + 1).is_none());
    }

    fn in_stage(number: u8) -> QuestSession {
        let mut session = QuestSession::new_run();
        session.city = Some("Москва".to_string());
        session.enter_stage(number);
        session
    }

    #[test]
    fn wrong_kind_input_changes_nothing() {
        let def = stage(1).unwrap();
        let mut session = in_stage(1);
        let before = session.clone();

        let action = stage_action(def, StageStep::Primary, &mut session, None, Some("привет"), None);

        assert_eq!(action, StageAction::WrongKind(def.wrong_kind));
        assert_eq!(session, before);
    }

    #[test]
    fn found_button_reminds_without_commit() {
        let def = stage(1).unwrap();
        let button = def.found_button.as_ref().unwrap();
        let mut session = in_stage(1);
        let before = session.clone();

        let action =
            stage_action(def, StageStep::Primary, &mut session, None, Some(button.label), None);

        assert_eq!(action, StageAction::FoundReminder(button.reminder));
        assert_eq!(session, before);
    }

    #[test]
    fn gate_miss_retries_without_commit() {
        let def = stage(6).unwrap();
        let mut session = in_stage(6);
        let before = session.clone();

        let miss = stage_action(def, StageStep::Primary, &mut session, None, Some("музей"), None);
        assert_eq!(miss, StageAction::GateRetry(def.gate_retry));
        assert_eq!(session, before);

        let hit =
            stage_action(def, StageStep::Primary, &mut session, None, Some("Библиотека"), None);
        assert_eq!(
            hit,
            StageAction::Commit {
                photo_id: None,
                answer: Some("Библиотека".to_string()),
            }
        );
    }

    #[test]
    fn photo_stage_with_follow_up_buffers_then_commits_both() {
        let def = stage(2).unwrap();
        let mut session = in_stage(2);

        let first =
            stage_action(def, StageStep::Primary, &mut session, Some("file1".to_string()), None, None);
        assert!(matches!(first, StageAction::FollowUpPrompt(_)));
        assert_eq!(session.pending_photo.as_deref(), Some("file1"));
        assert_eq!(
            session.step,
            QuestStep::InStage {
                step: StageStep::FollowUp
            }
        );

        let second =
            stage_action(def, StageStep::FollowUp, &mut session, None, Some("Гагарин"), None);
        assert_eq!(
            second,
            StageAction::Commit {
                photo_id: Some("file1".to_string()),
                answer: Some("Гагарин".to_string()),
            }
        );
        assert!(session.pending_photo.is_none());
    }

    #[test]
    fn gated_stage_follow_up_photo_carries_buffered_answer() {
        let def = stage(8).unwrap();
        let mut session = in_stage(8);

        let first =
            stage_action(def, StageStep::Primary, &mut session, None, Some("SR Space"), None);
        assert!(matches!(first, StageAction::FollowUpPrompt(_)));
        assert_eq!(session.pending_answer.as_deref(), Some("SR Space"));

        let second = stage_action(
            def,
            StageStep::FollowUp,
            &mut session,
            Some("shelf".to_string()),
            None,
            None,
        );
        assert_eq!(
            second,
            StageAction::Commit {
                photo_id: Some("shelf".to_string()),
                answer: Some("SR Space".to_string()),
            }
        );
    }

    #[test]
    fn final_stage_photo_commits_with_caption() {
        let def = stage(STAGE_COUNT).unwrap();
        let mut session = in_stage(STAGE_COUNT);

        let action = stage_action(
            def,
            StageStep::Primary,
            &mut session,
            Some("family".to_string()),
            None,
            Some("мы"),
        );
        assert_eq!(
            action,
            StageAction::Commit {
                photo_id: Some("family".to_string()),
                answer: Some("мы".to_string()),
            }
        );
    }

    #[test]
    fn committed_stage_waits_for_advance_button() {
        let def = stage(3).unwrap();
        let mut session = in_stage(3);
        session.step = QuestStep::InStage {
            step: StageStep::AwaitingNext,
        };

        let action = stage_action(
            def,
            StageStep::AwaitingNext,
            &mut session,
            Some("late_photo".to_string()),
            None,
            None,
        );
        assert_eq!(action, StageAction::AwaitingAdvance);
    }

    #[test]
    fn session_transitions() {
        let mut session = QuestSession::new_run();
        assert_eq!(session.step, QuestStep::AwaitingCity);

        session.city = Some("Москва".to_string());
        session.enter_stage(1);
        assert_eq!(
            session.step,
            QuestStep::InStage {
                step: StageStep::Primary
            }
        );

        session.pending_photo = Some("file123".to_string());
        session.enter_stage(2);
        assert_eq!(session.stage, 2);
        assert!(session.pending_photo.is_none());
    }
}
