//! Static quiz catalog and the session-local answering state machine.
//!
//! The catalog never changes at runtime. Durable completion lives in the
//! `completed_categories` table; everything else about an attempt (active
//! category, question index, categories touched this session) is ephemeral
//! and dies with the conversation.

use std::collections::HashSet;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub text: &'static str,
    pub options: [&'static str; OPTIONS_PER_QUESTION],
    pub correct: usize,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub title: &'static str,
    pub questions: &'static [Question],
}

pub static CATALOG: &[Category] = &[
    Category {
        id: "satellites",
        title: "🛰 Спутники и миссии",
        questions: &[
            Question {
                text: "Какая российская компания занимается разработкой малых спутниковых систем для мониторинга Земли?",
                options: ["1️⃣ Роскосмос", "2️⃣ SR Space", "3️⃣ Сколково", "4️⃣ Glavkosmos"],
                correct: 1,
                explanation: "✅ Правильный ответ: 2️⃣ SR Space\nSR Space разрабатывает спутниковые системы для экологического и климатического мониторинга.",
            },
            Question {
                text: "Какой космический телескоп, запущенный в 1990 году, стал символом глубоких космических наблюдений?",
                options: ["1️⃣ Кеплер", "2️⃣ Хаббл", "3️⃣ Джеймс Уэбб", "4️⃣ Чандра"],
                correct: 1,
                explanation: "✅ Правильный ответ: 2️⃣ Хаббл\nХаббл до сих пор позволяет получать уникальные изображения Вселенной.",
            },
            Question {
                text: "Какая миссия доставила первых людей на Луну в 1969 году?",
                options: ["1️⃣ Аполлон-11", "2️⃣ Аполлон-13", "3️⃣ Вояджер-1", "4️⃣ Маринер-10"],
                correct: 0,
                explanation: "✅ Правильный ответ: 1️⃣ Аполлон-11\nАполлон-11 стал историческим прорывом в освоении Луны и космоса.",
            },
        ],
    },
    Category {
        id: "ecology",
        title: "🌍 Земля и экология",
        questions: &[
            Question {
                text: "Какой газ считается основным виновником парникового эффекта?",
                options: ["1️⃣ Кислород", "2️⃣ Азот", "3️⃣ Углекислый газ", "4️⃣ Водород"],
                correct: 2,
                explanation: "✅ Правильный ответ: 3️⃣ Углекислый газ\nИзбыточное содержание CO₂ приводит к глобальному потеплению.",
            },
            Question {
                text: "Какую роль выполняют спутниковые системы, разработанные, например, SR Space, в экологическом мониторинге?",
                options: [
                    "1️⃣ Производят солнечную энергию",
                    "2️⃣ Отслеживают изменения атмосферы и лесные пожары",
                    "3️⃣ Моделируют землетрясения",
                    "4️⃣ Измеряют глубину океанов",
                ],
                correct: 1,
                explanation: "✅ Правильный ответ: 2️⃣ Отслеживают изменения атмосферы и лесные пожары\nТакие спутники собирают данные о выбросах CO₂, температуре и активности очагов пожаров.",
            },
            Question {
                text: "Какую информацию предоставляют спутниковые данные для оценки состояния экосистем?",
                options: [
                    "1️⃣ Данные о температуре и влажности почвы",
                    "2️⃣ Сведения о миграции животных",
                    "3️⃣ Информацию о росте растительности и изменениях в лесном покрове",
                    "4️⃣ Измерение уровня ультрафиолетового излучения",
                ],
                correct: 2,
                explanation: "✅ Правильный ответ: 3️⃣ Информация о росте растительности и изменениях в лесном покрове\nСпутниковые данные, например через анализ NDVI, позволяют отслеживать динамику вегетации.",
            },
        ],
    },
    Category {
        id: "rockets",
        title: "🚀 Ракеты и технологии",
        questions: &[
            Question {
                text: "Как называется первая многоразовая ракета, разработанная компанией SpaceX?",
                options: ["1️⃣ Falcon 1", "2️⃣ Falcon 9", "3️⃣ Falcon Heavy", "4️⃣ Starship"],
                correct: 1,
                explanation: "✅ Правильный ответ: 2️⃣ Falcon 9\nМногоразовость Falcon 9 позволила значительно снизить затраты на запуски.",
            },
            Question {
                text: "Какая страна первой вывела искусственный спутник на орбиту Земли?",
                options: ["1️⃣ США", "2️⃣ СССР", "3️⃣ Китай", "4️⃣ Великобритания"],
                correct: 1,
                explanation: "✅ Правильный ответ: 2️⃣ СССР\nЗапуск Спутника-1 в 1957 году открыл космическую эру.",
            },
            Question {
                text: "Как называется ракета-носитель, разрабатываемая компанией SR Space для вывода малых спутников на орбиту?",
                options: ["1️⃣ Небо", "2️⃣ Космос-2", "3️⃣ Stalker", "4️⃣ Союз-7"],
                correct: 2,
                explanation: "✅ Правильный ответ: 3️⃣ Stalker\nStalker — сверхлегкая ракета-носитель SR Space для коммерческих запусков малых аппаратов.",
            },
        ],
    },
];

pub fn category(id: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|c| c.id == id)
}

/// Why a category selection was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    UnknownCategory,
    AlreadyCompleted,
    /// Another category is in progress in this session.
    AnotherActive,
    /// Started earlier in this session; no re-entry.
    AlreadyAttempted,
}

/// Outcome of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Correct; more questions remain.
    Correct { next_index: usize },
    /// Correct and that was the last question: the category is complete.
    CategoryComplete,
    /// Wrong: the category terminates immediately and may be retried later.
    Incorrect { correct_option: &'static str },
    /// No active category — stray callback.
    NoActiveCategory,
}

/// Ephemeral per-conversation quiz state.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    pub active: Option<&'static str>,
    pub question_index: usize,
    /// Category ids started in this session; blocks re-entry once started.
    pub attempted: Vec<&'static str>,
}

impl QuizSession {
    /// Try to activate a category. `completed` is the durable set from the
    /// store; it wins over any session state.
    pub fn select(
        &mut self,
        id: &str,
        completed: &HashSet<String>,
    ) -> Result<&'static Category, SelectError> {
        let category = category(id).ok_or(SelectError::UnknownCategory)?;
        if completed.contains(id) {
            return Err(SelectError::AlreadyCompleted);
        }
        if let Some(active) = self.active {
            if active == category.id {
                return Err(SelectError::AlreadyAttempted);
            }
            return Err(SelectError::AnotherActive);
        }
        if self.attempted.contains(&category.id) {
            return Err(SelectError::AlreadyAttempted);
        }

        self.active = Some(category.id);
        self.question_index = 0;
        self.attempted.push(category.id);
        Ok(category)
    }

    pub fn current_question(&self) -> Option<(&'static Category, &'static Question)> {
        let category = category(self.active?)?;
        let question = category.questions.get(self.question_index)?;
        Some((category, question))
    }

    pub fn answer(&mut self, picked: usize) -> AnswerOutcome {
        let Some((category, question)) = self.current_question() else {
            return AnswerOutcome::NoActiveCategory;
        };

        if picked != question.correct {
            // Terminated without completion: clear the session marker so the
            // category can be retried later.
            self.attempted.retain(|id| *id != category.id);
            self.active = None;
            self.question_index = 0;
            return AnswerOutcome::Incorrect {
                correct_option: question.options[question.correct],
            };
        }

        self.question_index += 1;
        if self.question_index >= category.questions.len() {
            self.active = None;
            self.question_index = 0;
            AnswerOutcome::CategoryComplete
        } else {
            AnswerOutcome::Correct {
                next_index: self.question_index,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_completed() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn catalog_is_well_formed() {
        assert!(!CATALOG.is_empty());
        for category in CATALOG {
            assert!(!category.questions.is_empty());
            for question in category.questions {
                assert!(question.correct < OPTIONS_PER_QUESTION);
                assert!(question.options.iter().all(|o| !o.is_empty()));
                assert!(question.explanation.contains('✅'));
            }
        }
    }

    #[test]
    fn full_correct_run_completes_category() {
        let mut session = QuizSession::default();
        let category = session.select("satellites", &no_completed()).unwrap();

        for i in 0..category.questions.len() {
            let (_, question) = session.current_question().unwrap();
            let outcome = session.answer(question.correct);
            if i + 1 == category.questions.len() {
                assert_eq!(outcome, AnswerOutcome::CategoryComplete);
            } else {
                assert_eq!(outcome, AnswerOutcome::Correct { next_index: i + 1 });
            }
        }
        assert!(session.active.is_none());
    }

    #[test]
    fn wrong_answer_terminates_and_allows_retry() {
        let mut session = QuizSession::default();
        session.select("ecology", &no_completed()).unwrap();

        let (_, question) = session.current_question().unwrap();
        let wrong = (question.correct + 1) % OPTIONS_PER_QUESTION;
        let outcome = session.answer(wrong);
        assert_eq!(
            outcome,
            AnswerOutcome::Incorrect {
                correct_option: question.options[question.correct]
            }
        );
        assert!(session.active.is_none());

        // The session marker cleared, so the category may be retried.
        assert!(session.select("ecology", &no_completed()).is_ok());
    }

    #[test]
    fn second_category_blocked_while_one_active() {
        let mut session = QuizSession::default();
        session.select("satellites", &no_completed()).unwrap();
        assert_eq!(
            session.select("ecology", &no_completed()),
            Err(SelectError::AnotherActive)
        );
    }

    #[test]
    fn completed_category_rejected_regardless_of_session() {
        let mut session = QuizSession::default();
        let completed: HashSet<String> = ["rockets".to_string()].into();
        assert_eq!(
            session.select("rockets", &completed),
            Err(SelectError::AlreadyCompleted)
        );
    }

    #[test]
    fn unknown_category_rejected() {
        let mut session = QuizSession::default();
        assert_eq!(
            session.select("wormholes", &no_completed()),
            Err(SelectError::UnknownCategory)
        );
    }

    #[test]
    fn stray_answer_without_active_category() {
        let mut session = QuizSession::default();
        assert_eq!(session.answer(0), AnswerOutcome::NoActiveCategory);
    }
}
