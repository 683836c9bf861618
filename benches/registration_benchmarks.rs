use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use volunteer_core::models::EventId;
use volunteer_core::test_helpers::{EventFactory, RecordingNotificationGateway};
use volunteer_core::waitlist::WaitlistQueue;
use volunteer_core::{VolunteerConfig, VolunteerCoordinator, VolunteerId};

fn benchmark_waitlist_join_and_position(c: &mut Criterion) {
    let event_id = EventId::new();
    let volunteers: Vec<VolunteerId> = (0..200).map(|_| VolunteerId::new()).collect();

    c.bench_function("waitlist_join_200_then_position", |b| {
        b.iter(|| {
            let now = chrono::Utc::now();
            let mut queue = WaitlistQueue::new();
            for v in &volunteers {
                let _ = queue.join(event_id, *v, now, 500);
            }
            black_box(queue.position(volunteers[199]))
        })
    });
}

fn benchmark_register_until_full(c: &mut Criterion) {
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("failed to build tokio runtime: {e}"),
    };

    c.bench_function("register_50_seats_then_waitlist", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let coordinator = VolunteerCoordinator::in_memory(
                    VolunteerConfig::default(),
                    Arc::new(RecordingNotificationGateway::new()),
                );
                let factory = EventFactory::new().capacity(50).waitlist(10);
                let event = coordinator
                    .create_event(factory.new_event())
                    .await
                    .ok()?;
                coordinator.lifecycle().approve(event.id).await.ok()?;
                for _ in 0..60 {
                    let _ = coordinator.register(event.id, VolunteerId::new()).await;
                }
                Some(black_box(event.id))
            })
        })
    });
}

criterion_group!(
    benches,
    benchmark_waitlist_join_and_position,
    benchmark_register_until_full
);
criterion_main!(benches);
