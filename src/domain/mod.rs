pub mod callback;
pub mod quest;
pub mod quiz;
