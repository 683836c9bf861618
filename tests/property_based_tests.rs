mod common;

use chrono::Duration;
use common::strategies::*;
use common::{assert_roster_invariants, volunteers, TestHarness};
use proptest::prelude::*;
use volunteer_core::models::{EventId, VolunteerId};
use volunteer_core::waitlist::WaitlistQueue;

const VOLUNTEERS: usize = 6;

async fn apply(harness: &TestHarness, event_id: EventId, vs: &[VolunteerId], op: Operation) {
    let c = &harness.coordinator;
    let result = match op {
        Operation::Register(i) => c.register(event_id, vs[i]).await.map(|_| ()),
        Operation::Unregister(i) => c.unregister(event_id, vs[i]).await,
        Operation::LeaveWaitlist(i) => c.leave_waitlist(event_id, vs[i]).await,
        Operation::Accept(i) => c.accept_promotion(event_id, vs[i]).await,
        Operation::Decline(i) => c.decline_promotion(event_id, vs[i]).await,
        Operation::Sweep(hours) => {
            harness.advance(Duration::hours(hours));
            c.sweep_expired().await.map(|_| ())
        }
    };

    if let Err(e) = result {
        assert!(
            !matches!(e.code(), "persistence_error" | "concurrent_modification"),
            "unexpected infrastructure error: {e}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: capacity, single-active-record and join-order invariants hold
    /// after every operation in any sequence
    #[test]
    fn roster_invariants_hold_for_any_sequence(
        (capacity, max_waitlist) in event_shape_strategy(),
        ops in operation_sequence_strategy(VOLUNTEERS, 40),
    ) {
        tokio_test::block_on(async {
            let harness = TestHarness::new();
            let event_id = harness.approved_event(capacity, max_waitlist).await;
            let vs = volunteers(VOLUNTEERS);

            for op in ops {
                apply(&harness, event_id, &vs, op).await;
                assert_roster_invariants(&harness.roster(event_id).await);
            }
        });
    }

    /// Property: a second sweep at the same instant changes nothing
    #[test]
    fn sweep_is_idempotent(
        (capacity, max_waitlist) in event_shape_strategy(),
        ops in operation_sequence_strategy(VOLUNTEERS, 30),
    ) {
        tokio_test::block_on(async {
            let harness = TestHarness::new();
            let event_id = harness.approved_event(capacity, max_waitlist).await;
            let vs = volunteers(VOLUNTEERS);

            for op in ops {
                apply(&harness, event_id, &vs, op).await;
            }

            harness.coordinator.sweep_expired().await.unwrap();
            let once = harness.roster(event_id).await;
            let report = harness.coordinator.sweep_expired().await.unwrap();
            assert!(report.is_idle());
            assert_eq!(harness.roster(event_id).await, once);
        });
    }

    /// Property: waiting positions are 1..=n in join order
    #[test]
    fn waitlist_positions_follow_join_order(
        joins in 1usize..20,
        leaves in prop::collection::vec(0usize..20, 0..10),
    ) {
        let now = chrono::Utc::now();
        let event_id = EventId::new();
        let vs = volunteers(joins);
        let mut queue = WaitlistQueue::new();
        for v in &vs {
            queue.join(event_id, *v, now, 100).unwrap();
        }
        for i in leaves {
            if i < joins {
                queue.leave(vs[i]);
            }
        }

        let remaining: Vec<VolunteerId> = vs.iter().copied().filter(|v| queue.contains(*v)).collect();
        for (rank, v) in remaining.iter().enumerate() {
            prop_assert_eq!(queue.position(*v), Some(rank + 1));
        }
        if let Some(first) = remaining.first() {
            prop_assert_eq!(queue.next_eligible().map(|e| e.volunteer_id), Some(*first));
        }
    }
}
