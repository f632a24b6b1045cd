use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use secret_council::{
    Ballot, Event, Notice, Policy, Role, Session, ShuffledDeck,
    functional::{assign_roles, tally},
};
use std::hint::black_box;

/// Helper to create a started session with N players
fn setup_session(n_players: usize, deck: ShuffledDeck) -> (Session, Vec<Role>) {
    let mut session = Session::with_deck(deck, 7);
    for _ in 0..n_players {
        session.apply(Event::Join).unwrap();
    }
    let Ok(Notice::GameStarted { roles, .. }) = session.apply(Event::Start) else {
        panic!("session failed to start");
    };
    (session, roles)
}

/// Plays a loyal-only game to its end, one government per round
fn play_loyal_game(n_players: usize) -> Notice {
    let deck = ShuffledDeck::stacked([Policy::Loyal; 17]);
    let (mut session, roles) = setup_session(n_players, deck);
    loop {
        let state = session.snapshot();
        let president = state.president.unwrap();
        let chancellor = (0..n_players)
            .find(|seat| {
                *seat != president
                    && !state.term_limits.contains(seat)
                    && roles[*seat] != Role::Usurper
            })
            .unwrap();

        session
            .apply(Event::NominateChancellor {
                caller: president,
                proposal: chancellor,
            })
            .unwrap();
        for caller in 0..n_players {
            session
                .apply(Event::CastVote {
                    caller,
                    ballot: Ballot::Yes,
                })
                .unwrap();
        }
        session
            .apply(Event::DiscardCard {
                caller: president,
                index: 0,
            })
            .unwrap();
        let notice = session
            .apply(Event::DiscardCard {
                caller: chancellor,
                index: 0,
            })
            .unwrap();
        if matches!(notice, Notice::GameEnded { .. }) {
            return notice;
        }
    }
}

/// Benchmark role dealing for each bracket
fn bench_assign_roles(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_roles");

    for n_players in [5, 7, 9, 10].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                let mut rng = StdRng::seed_from_u64(1);
                b.iter(|| assign_roles(black_box(n), &mut rng));
            },
        );
    }

    group.finish();
}

/// Benchmark the election tally on a full table
fn bench_tally(c: &mut Criterion) {
    let votes: Vec<_> = (0..10).map(|i| Some(Ballot::from(i % 3 != 0))).collect();

    c.bench_function("tally_10_votes", |b| {
        b.iter(|| tally(black_box(&votes)));
    });
}

/// Benchmark snapshot generation mid-game
fn bench_snapshot(c: &mut Criterion) {
    let (session, _) = setup_session(10, ShuffledDeck::seeded(3));

    c.bench_function("snapshot_10_players", |b| {
        b.iter(|| session.snapshot());
    });
}

/// Benchmark full games from join to game over
fn bench_full_game(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_loyal_game");

    for n_players in [5, 10].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_players", n_players)),
            n_players,
            |b, &n| {
                b.iter(|| play_loyal_game(black_box(n)));
            },
        );
    }

    group.finish();
}

criterion_group!(rules, bench_assign_roles, bench_tally);

criterion_group!(sessions, bench_snapshot, bench_full_game);

criterion_main!(rules, sessions);
