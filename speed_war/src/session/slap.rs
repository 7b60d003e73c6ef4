//! Slap validation and resolution.

use serde::Serialize;

use crate::deck::DeckStore;
use crate::game::{ExposedPair, GameResult, Seat};

/// Why a slap changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A slap was already resolved against this pair
    AlreadyClaimed,
    /// One side of the pair is still a placeholder
    Unexposed,
    /// The two exposed cards differ in rank
    RankMismatch,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let reason = match self {
            RejectReason::AlreadyClaimed => "pair already claimed",
            RejectReason::Unexposed => "no pair exposed",
            RejectReason::RankMismatch => "ranks differ",
        };
        write!(f, "{reason}")
    }
}

/// Outcome of a slap claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum SlapVerdict {
    Resolved { cards_won: usize },
    Rejected { reason: RejectReason },
}

impl SlapVerdict {
    pub fn is_resolved(&self) -> bool {
        matches!(self, SlapVerdict::Resolved { .. })
    }
}

/// Validates slap claims against the exposed pair and awards the discard pile.
pub struct SlapResolver;

impl SlapResolver {
    /// Check a claim without touching any state
    pub fn judge(pair: &ExposedPair) -> Option<RejectReason> {
        if pair.claimed {
            Some(RejectReason::AlreadyClaimed)
        } else if pair.previous.is_sentinel() || pair.newest.is_sentinel() {
            Some(RejectReason::Unexposed)
        } else if !pair.is_match() {
            Some(RejectReason::RankMismatch)
        } else {
            None
        }
    }

    /// Attempt a slap on behalf of `claimant`.
    ///
    /// A rejected claim has no side effect. A resolved claim drains the
    /// discard deck into the claimant's collect deck and marks the pair
    /// claimed so a second claim on it is rejected.
    ///
    /// # Arguments
    ///
    /// * `pair` - The session's exposed pair
    /// * `decks` - The session's deck store
    /// * `claimant` - Seat making the claim
    ///
    /// # Returns
    ///
    /// * `GameResult<SlapVerdict>` - The verdict, or a storage failure
    pub async fn attempt_slap(
        pair: &mut ExposedPair,
        decks: &mut DeckStore,
        claimant: Seat,
    ) -> GameResult<SlapVerdict> {
        if let Some(reason) = Self::judge(pair) {
            return Ok(SlapVerdict::Rejected { reason });
        }

        let cards_won = decks.drain_discard_to(claimant).await?;
        pair.mark_claimed();
        Ok(SlapVerdict::Resolved { cards_won })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::testing::{BOT, HUMAN, Pile, SESSION, arrange, card};
    use crate::deck::{DeckRepository, MemoryDeckRepository};
    use crate::game::{Card, DeckRole, Suit};
    use std::sync::Arc;

    async fn store_with(repo: Arc<MemoryDeckRepository>) -> DeckStore {
        DeckStore::open(SESSION, repo, HUMAN, BOT, Some(1))
            .await
            .unwrap()
    }

    fn pair_of(previous: Card, newest: Card) -> ExposedPair {
        let mut pair = ExposedPair::default();
        pair.push(previous);
        pair.push(newest);
        pair
    }

    #[test]
    fn test_judge_rejections() {
        let seven_h = Card::new(card(7, Suit::Heart), 7, Suit::Heart);
        let seven_c = Card::new(card(7, Suit::Club), 7, Suit::Club);
        let nine_d = Card::new(card(9, Suit::Diamond), 9, Suit::Diamond);

        assert_eq!(
            SlapResolver::judge(&ExposedPair::default()),
            Some(RejectReason::Unexposed)
        );

        let mut half = ExposedPair::default();
        half.push(seven_h.clone());
        assert_eq!(SlapResolver::judge(&half), Some(RejectReason::Unexposed));

        assert_eq!(
            SlapResolver::judge(&pair_of(seven_h.clone(), nine_d)),
            Some(RejectReason::RankMismatch)
        );
        assert_eq!(SlapResolver::judge(&pair_of(seven_h, seven_c)), None);
    }

    #[tokio::test]
    async fn test_matching_pair_drains_discard_to_claimant() {
        let repo = Arc::new(MemoryDeckRepository::new());
        let seven_h = card(7, Suit::Heart);
        let seven_c = card(7, Suit::Club);
        arrange(
            &repo,
            &[(Pile::Discard, vec![seven_h, seven_c])],
            Pile::BotPlay,
        )
        .await;
        let mut decks = store_with(repo.clone()).await;

        let mut pair = pair_of(
            decks.card(seven_h).unwrap().clone(),
            decks.card(seven_c).unwrap().clone(),
        );
        let verdict = SlapResolver::attempt_slap(&mut pair, &mut decks, Seat::Human)
            .await
            .unwrap();

        assert_eq!(verdict, SlapVerdict::Resolved { cards_won: 2 });
        assert!(pair.claimed);
        assert!(pair.newest.is_sentinel());

        let collect = decks.deck_id(Seat::Human, DeckRole::Collect);
        let mut won = repo.deck_cards(collect).await.unwrap();
        won.sort();
        let mut expected = vec![seven_h, seven_c];
        expected.sort();
        assert_eq!(won, expected);
        assert_eq!(decks.counts().await.unwrap().discard, 0);
    }

    #[tokio::test]
    async fn test_second_claim_on_same_pair_is_rejected() {
        let repo = Arc::new(MemoryDeckRepository::new());
        let seven_h = card(7, Suit::Heart);
        let seven_c = card(7, Suit::Club);
        arrange(
            &repo,
            &[(Pile::Discard, vec![seven_h, seven_c])],
            Pile::HumanPlay,
        )
        .await;
        let mut decks = store_with(repo).await;
        let mut pair = pair_of(
            decks.card(seven_h).unwrap().clone(),
            decks.card(seven_c).unwrap().clone(),
        );

        let first = SlapResolver::attempt_slap(&mut pair, &mut decks, Seat::Automated)
            .await
            .unwrap();
        let before = decks.counts().await.unwrap();
        let second = SlapResolver::attempt_slap(&mut pair, &mut decks, Seat::Human)
            .await
            .unwrap();

        assert!(first.is_resolved());
        assert_eq!(
            second,
            SlapVerdict::Rejected {
                reason: RejectReason::AlreadyClaimed
            }
        );
        assert_eq!(decks.counts().await.unwrap(), before);
        assert_eq!(before.automated.collect, 2);
    }

    #[tokio::test]
    async fn test_mismatched_slap_leaves_decks_alone() {
        let repo = Arc::new(MemoryDeckRepository::new());
        let five_s = card(5, Suit::Spade);
        let six_s = card(6, Suit::Spade);
        arrange(
            &repo,
            &[(Pile::Discard, vec![five_s, six_s])],
            Pile::HumanPlay,
        )
        .await;
        let mut decks = store_with(repo).await;
        let before = decks.counts().await.unwrap();
        let mut pair = pair_of(
            decks.card(five_s).unwrap().clone(),
            decks.card(six_s).unwrap().clone(),
        );

        let verdict = SlapResolver::attempt_slap(&mut pair, &mut decks, Seat::Human)
            .await
            .unwrap();

        assert_eq!(
            verdict,
            SlapVerdict::Rejected {
                reason: RejectReason::RankMismatch
            }
        );
        assert!(!pair.claimed);
        assert_eq!(decks.counts().await.unwrap(), before);
    }
}
