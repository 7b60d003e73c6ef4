//! Win detection.

use serde::Serialize;

use crate::deck::DeckStore;
use crate::game::{GameError, GameResult, Seat};

/// Result of a win check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Ongoing,
    Winner(Seat),
}

/// Pure query over deck state deciding whether the game has ended.
pub struct WinDetector;

impl WinDetector {
    /// A participant with empty play and collect decks loses.
    ///
    /// Both participants empty at once cannot happen under correct
    /// sequencing and is reported as `InvariantViolation`.
    pub async fn evaluate(decks: &DeckStore) -> GameResult<GameOutcome> {
        let human_out = decks.empty_of(Seat::Human).await?;
        let automated_out = decks.empty_of(Seat::Automated).await?;

        match (human_out, automated_out) {
            (false, false) => Ok(GameOutcome::Ongoing),
            (true, false) => Ok(GameOutcome::Winner(Seat::Automated)),
            (false, true) => Ok(GameOutcome::Winner(Seat::Human)),
            (true, true) => Err(GameError::InvariantViolation(
                "both participants are out of cards".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::MemoryDeckRepository;
    use crate::deck::testing::{BOT, HUMAN, Pile, SESSION, arrange, card};
    use crate::game::Suit;
    use std::sync::Arc;

    async fn evaluate_layout(piles: &[(Pile, Vec<crate::game::CardId>)], rest: Pile) -> GameResult<GameOutcome> {
        let repo = Arc::new(MemoryDeckRepository::new());
        arrange(&repo, piles, rest).await;
        let decks = DeckStore::open(SESSION, repo, HUMAN, BOT, None).await?;
        WinDetector::evaluate(&decks).await
    }

    #[tokio::test]
    async fn test_fresh_deal_is_ongoing() {
        let repo = Arc::new(MemoryDeckRepository::new());
        let mut decks = DeckStore::open(SESSION, repo, HUMAN, BOT, Some(3))
            .await
            .unwrap();
        decks.deal_session().await.unwrap();

        assert_eq!(
            WinDetector::evaluate(&decks).await.unwrap(),
            GameOutcome::Ongoing
        );
    }

    #[tokio::test]
    async fn test_collect_cards_keep_a_participant_alive() {
        let outcome = evaluate_layout(
            &[(Pile::HumanCollect, vec![card(2, Suit::Club)])],
            Pile::BotPlay,
        )
        .await
        .unwrap();
        assert_eq!(outcome, GameOutcome::Ongoing);
    }

    #[tokio::test]
    async fn test_empty_participant_loses() {
        let outcome = evaluate_layout(&[], Pile::BotCollect).await.unwrap();
        assert_eq!(outcome, GameOutcome::Winner(Seat::Automated));

        let outcome = evaluate_layout(&[], Pile::HumanPlay).await.unwrap();
        assert_eq!(outcome, GameOutcome::Winner(Seat::Human));
    }

    #[tokio::test]
    async fn test_both_empty_is_an_invariant_violation() {
        let err = evaluate_layout(&[], Pile::Discard).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
