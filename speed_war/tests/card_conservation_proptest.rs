/// Property-based tests for card conservation using proptest
///
/// Whatever sequence of deck operations runs, every one of the 52 cards is
/// held by exactly one deck of the session.
mod common;

use common::{SESSION, assert_conserved};
use proptest::prelude::*;
use speed_war::game::Seat;
use speed_war::session::{GameOutcome, WinDetector};
use speed_war::{DeckRepository, DeckRole, DeckStore, MemoryDeckRepository, ParticipantId};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Flip(Seat),
    Drain(Seat),
    Reset(Seat),
    Peek(Seat),
}

fn seat_strategy() -> impl Strategy<Value = Seat> {
    prop_oneof![Just(Seat::Human), Just(Seat::Automated)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => seat_strategy().prop_map(Op::Flip),
        1 => seat_strategy().prop_map(Op::Drain),
        1 => seat_strategy().prop_map(Op::Reset),
        1 => seat_strategy().prop_map(Op::Peek),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_deck_operations_conserve_cards(
        seed in any::<u64>(),
        ops in prop::collection::vec(op_strategy(), 0..120),
    ) {
        runtime().block_on(async {
            let repo = Arc::new(MemoryDeckRepository::new());
            let mut store = DeckStore::open(
                SESSION,
                repo.clone(),
                common::HUMAN,
                common::BOT,
                Some(seed),
            )
            .await
            .unwrap();
            store.deal_session().await.unwrap();

            for op in ops {
                match op {
                    Op::Flip(seat) => {
                        if let Some(card) = store.top_of_play(seat).await.unwrap() {
                            let play = store.deck_id(seat, DeckRole::Play);
                            let discard = store.discard_id();
                            store.move_card(card.id, play, discard).await.unwrap();
                        }
                    }
                    Op::Drain(seat) => {
                        store.drain_discard_to(seat).await.unwrap();
                    }
                    Op::Reset(seat) => {
                        store.reset_from_collect(seat).await.unwrap();
                    }
                    Op::Peek(seat) => {
                        store.top_of_play(seat).await.unwrap();
                    }
                }

                assert_eq!(store.counts().await.unwrap().total(), 52);
                store.audit().await.unwrap();
            }

            assert_conserved(&repo).await;
        });
    }

    #[test]
    fn prop_fresh_deal_is_ongoing(seed in any::<u64>()) {
        let outcome = runtime().block_on(async {
            let repo = Arc::new(MemoryDeckRepository::new());
            let mut store =
                DeckStore::open(SESSION, repo, ParticipantId(500), ParticipantId(2), Some(seed))
                    .await
                    .unwrap();
            store.deal_session().await.unwrap();
            WinDetector::evaluate(&store).await.unwrap()
        });
        prop_assert_eq!(outcome, GameOutcome::Ongoing);
    }

    #[test]
    fn prop_reset_with_cards_in_play_changes_nothing(
        seed in any::<u64>(),
        flips in 0usize..20,
    ) {
        runtime().block_on(async {
            let repo = Arc::new(MemoryDeckRepository::new());
            let mut store = DeckStore::open(
                SESSION,
                repo.clone(),
                common::HUMAN,
                common::BOT,
                Some(seed),
            )
            .await
            .unwrap();
            store.deal_session().await.unwrap();

            // Move a few cards into the human's collect deck
            for _ in 0..flips {
                if let Some(card) = store.top_of_play(Seat::Human).await.unwrap() {
                    let play = store.deck_id(Seat::Human, DeckRole::Play);
                    let discard = store.discard_id();
                    store.move_card(card.id, play, discard).await.unwrap();
                }
            }
            store.drain_discard_to(Seat::Human).await.unwrap();

            let before = repo.assignments(SESSION).await.unwrap();
            assert_eq!(store.reset_from_collect(Seat::Human).await.unwrap(), 0);
            let after = repo.assignments(SESSION).await.unwrap();
            assert_eq!(before, after);
        });
    }
}
