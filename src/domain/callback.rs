//! Parsing of inline-keyboard callback payloads.
//!
//! Payloads are opaque strings chosen by us, but they arrive from the outside
//! world, so everything here is defensive: anything that does not match a
//! known discriminator (or carries an out-of-range id) parses to `None` and
//! the caller answers the callback as a no-op.

use crate::domain::quest;
use crate::domain::quiz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// Resume the quest at the stored stage.
    Continue(u8),
    /// First step of the restart flow: ask for confirmation.
    RestartConfirm,
    /// Second step: confirmed, wipe progress.
    RestartFinal,
    CancelRestart,
    /// "Далее ➡️" after stage `n`: advance to stage `n + 1`.
    Next(u8),
    /// Quiz category selected.
    Category(String),
    /// Quiz answer option picked.
    Answer(usize),
    ShowRating,
}

impl Callback {
    pub fn parse(data: &str) -> Option<Callback> {
        match data {
            "restart_confirm" => return Some(Callback::RestartConfirm),
            "restart_final" => return Some(Callback::RestartFinal),
            "cancel_restart" => return Some(Callback::CancelRestart),
            "show_rating" => return Some(Callback::ShowRating),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("continue_") {
            let n: u8 = rest.parse().ok()?;
            if (1..=quest::STAGE_COUNT).contains(&n) {
                return Some(Callback::Continue(n));
            }
            return None;
        }
        if let Some(rest) = data.strip_prefix("next_") {
            let n: u8 = rest.parse().ok()?;
            if (1..=quest::STAGE_COUNT).contains(&n) {
                return Some(Callback::Next(n));
            }
            return None;
        }
        if let Some(rest) = data.strip_prefix("cat_") {
            if quiz::category(rest).is_some() {
                return Some(Callback::Category(rest.to_string()));
            }
            return None;
        }
        if let Some(rest) = data.strip_prefix("ans_") {
            let i: usize = rest.parse().ok()?;
            if i < quiz::OPTIONS_PER_QUESTION {
                return Some(Callback::Answer(i));
            }
            return None;
        }

        None
    }
}

/// Payload builders, kept next to the parser so the two cannot drift.
pub fn continue_payload(stage: u8) -> String {
    format!("continue_{stage}")
}

pub fn next_payload(stage: u8) -> String {
    format!("next_{stage}")
}

pub fn category_payload(id: &str) -> String {
    format!("cat_{id}")
}

pub fn answer_payload(index: usize) -> String {
    format!("ans_{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quest_payloads() {
        assert_eq!(Callback::parse("continue_3"), Some(Callback::Continue(3)));
        assert_eq!(Callback::parse("next_10"), Some(Callback::Next(10)));
        assert_eq!(Callback::parse("restart_confirm"), Some(Callback::RestartConfirm));
        assert_eq!(Callback::parse("restart_final"), Some(Callback::RestartFinal));
        assert_eq!(Callback::parse("cancel_restart"), Some(Callback::CancelRestart));
    }

    #[test]
    fn parses_quiz_payloads() {
        assert_eq!(
            Callback::parse("cat_satellites"),
            Some(Callback::Category("satellites".to_string()))
        );
        assert_eq!(Callback::parse("ans_0"), Some(Callback::Answer(0)));
        assert_eq!(Callback::parse("ans_3"), Some(Callback::Answer(3)));
    }

    #[test]
    fn rejects_out_of_range_ids() {
        assert_eq!(Callback::parse("continue_0"), None);
        assert_eq!(Callback::parse("continue_11"), None);
        assert_eq!(Callback::parse("next_0"), None);
        assert_eq!(Callback::parse("ans_4"), None);
        assert_eq!(Callback::parse("cat_black_holes"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Callback::parse(""), None);
        assert_eq!(Callback::parse("continue_"), None);
        assert_eq!(Callback::parse("continue_abc"), None);
        assert_eq!(Callback::parse("next_-1"), None);
        assert_eq!(Callback::parse("drop tables"), None);
    }

    #[test]
    fn builders_round_trip() {
        assert_eq!(Callback::parse(&next_payload(7)), Some(Callback::Next(7)));
        assert_eq!(Callback::parse(&answer_payload(2)), Some(Callback::Answer(2)));
    }
}
