/// Integration tests for full council sessions
///
/// These tests drive sessions through the public event API only: elections,
/// legislation, forced enactments, term limits, special powers and every
/// way a game can end.
use secret_council::{
    Ballot, Event, Faction, GameEnding, GameError, GameSnapshot, Notice, Phase, Policy,
    PowerRequest, Revealed, Role, Session, ShuffledDeck,
};

/// Joins `players` seats and starts the session, returning the dealt roles.
fn start(session: &mut Session, players: usize) -> Vec<Role> {
    for _ in 0..players {
        session.apply(Event::Join).unwrap();
    }
    match session.apply(Event::Start) {
        Ok(Notice::GameStarted { roles, .. }) => roles,
        other => panic!("expected game start, got {other:?}"),
    }
}

/// First living seat the president may nominate.
fn eligible(state: &GameSnapshot, roles: &[Role], allow_usurper: bool) -> Option<usize> {
    state
        .eligible_chancellors()
        .into_iter()
        .find(|seat| allow_usurper || roles[*seat] != Role::Usurper)
}

fn vote_all(session: &mut Session, ballot: Ballot) -> Notice {
    let mut last = Notice::VoteRegistered;
    for caller in session.snapshot().living_players() {
        last = session.apply(Event::CastVote { caller, ballot }).unwrap();
    }
    last
}

/// Nominates anyone eligible and votes the government down.
fn fail_election(session: &mut Session, roles: &[Role]) -> Notice {
    let state = session.snapshot();
    session
        .apply(Event::NominateChancellor {
            caller: state.president.unwrap(),
            proposal: eligible(&state, roles, true).unwrap(),
        })
        .unwrap();
    vote_all(session, Ballot::No)
}

/// Elects a government without the usurper and enacts the first card the
/// chancellor keeps.
fn enact_round(session: &mut Session, roles: &[Role]) -> Notice {
    let chancellor = loop {
        if let Some(chancellor) = eligible(&session.snapshot(), roles, false) {
            break chancellor;
        }
        // Only the usurper is eligible under this president.
        fail_election(session, roles);
    };
    let president = session.president().unwrap();

    session
        .apply(Event::NominateChancellor {
            caller: president,
            proposal: chancellor,
        })
        .unwrap();
    let notice = vote_all(session, Ballot::Yes);
    assert!(matches!(notice, Notice::LegislationPresident { .. }));

    session
        .apply(Event::DiscardCard {
            caller: president,
            index: 0,
        })
        .unwrap();
    session
        .apply(Event::DiscardCard {
            caller: chancellor,
            index: 0,
        })
        .unwrap()
}

/// Uses whichever power is pending without ever touching the usurper.
fn resolve_power(session: &mut Session, roles: &[Role]) {
    let state = session.snapshot();
    let president = state.president.unwrap();
    let bystander = state
        .living_players()
        .into_iter()
        .find(|seat| {
            *seat != president
                && roles[*seat] != Role::Usurper
                && !state.investigated.contains(seat)
        })
        .unwrap();
    let request = match state.phase {
        Phase::PowerPeek => PowerRequest::Peek,
        Phase::PowerExecution => PowerRequest::Execute(bystander),
        Phase::PowerInvestigate => PowerRequest::Investigate(bystander),
        Phase::PowerSpecialElection => PowerRequest::ChooseSuccessor(bystander),
        _ => return,
    };
    session
        .apply(Event::UseSpecialPower {
            caller: president,
            request,
        })
        .unwrap();
}

fn stacked(policy: Policy) -> ShuffledDeck {
    ShuffledDeck::stacked([policy; 17])
}

#[test]
fn test_unanimous_election_starts_legislation() {
    let mut session = Session::with_seed(21);
    start(&mut session, 5);
    let president = session.president().unwrap();

    session
        .apply(Event::NominateChancellor {
            caller: president,
            proposal: (president + 1) % 5,
        })
        .unwrap();
    let Notice::LegislationPresident { hand, state } = vote_all(&mut session, Ballot::Yes) else {
        panic!("expected legislation");
    };

    assert_eq!(hand.len(), 3);
    assert_eq!(state.policies.loyal, 0);
    assert_eq!(state.policies.subversive, 0);
    assert_eq!(state.phase, Phase::PresidentDiscarding);
}

#[test]
fn test_split_election_fails_and_advances_president() {
    let mut session = Session::with_seed(22);
    start(&mut session, 5);
    let president = session.president().unwrap();

    session
        .apply(Event::NominateChancellor {
            caller: president,
            proposal: (president + 2) % 5,
        })
        .unwrap();

    let mut last = Notice::VoteRegistered;
    for caller in 0..5 {
        let ballot = Ballot::from(caller < 3);
        last = session.apply(Event::CastVote { caller, ballot }).unwrap();
    }
    // Three yes against two no passes; flip it to test the failure path.
    assert!(matches!(last, Notice::LegislationPresident { .. }));

    let mut session = Session::with_seed(22);
    start(&mut session, 5);
    session
        .apply(Event::NominateChancellor {
            caller: president,
            proposal: (president + 2) % 5,
        })
        .unwrap();
    for caller in 0..5 {
        let ballot = Ballot::from(caller >= 3);
        last = session.apply(Event::CastVote { caller, ballot }).unwrap();
    }

    let Notice::NextPresident(state) = last else {
        panic!("expected next president, got {last:?}");
    };
    assert_eq!(state.election_tracker, 1);
    assert_eq!(state.president, Some((president + 1) % 5));
    assert_eq!(state.phase, Phase::NominatingChancellor);
}

#[test]
fn test_three_failed_elections_force_top_policy() {
    let mut session = Session::with_deck(stacked(Policy::Loyal), 5);
    start(&mut session, 6);

    for round in 0..3 {
        let state = session.snapshot();
        let president = state.president.unwrap();
        session
            .apply(Event::NominateChancellor {
                caller: president,
                proposal: (president + 3) % 6,
            })
            .unwrap();
        let notice = vote_all(&mut session, Ballot::No);

        if round < 2 {
            assert!(matches!(notice, Notice::NextPresident(_)));
        } else {
            let Notice::PolicyEnacted {
                card,
                power,
                forced,
                state,
            } = notice
            else {
                panic!("expected forced enactment, got {notice:?}");
            };
            assert_eq!(card, Policy::Loyal);
            assert_eq!(power, None);
            assert!(forced);
            assert_eq!(state.election_tracker, 0);
            assert_eq!(state.policies.loyal, 1);
        }
    }
}

#[test]
fn test_last_government_is_term_limited() {
    let mut session = Session::with_deck(stacked(Policy::Loyal), 9);
    let roles = start(&mut session, 7);
    let president = session.president().unwrap();

    enact_round(&mut session, &roles);
    let state = session.snapshot();
    let chancellor = state.term_limits[1];
    let next = state.president.unwrap();
    assert_eq!(state.term_limits[0], president);

    for proposal in [president, chancellor] {
        if proposal == next {
            continue;
        }
        let result = session.apply(Event::NominateChancellor {
            caller: next,
            proposal,
        });
        assert!(matches!(result, Err(GameError::Invalid(_))));
    }
}

#[test]
fn test_five_loyal_policies_win() {
    let mut session = Session::with_deck(stacked(Policy::Loyal), 3);
    let roles = start(&mut session, 8);

    for _ in 0..4 {
        let notice = enact_round(&mut session, &roles);
        assert!(matches!(notice, Notice::PolicyEnacted { power: None, .. }));
    }
    let Notice::GameEnded {
        reason,
        roles: revealed,
        state,
    } = enact_round(&mut session, &roles)
    else {
        panic!("expected game end");
    };

    assert_eq!(reason, GameEnding::LoyalPolicy);
    assert_eq!(reason.winner(), Faction::Loyalist);
    assert_eq!(revealed, roles);
    assert_eq!(state.phase, Phase::GameOver);
    assert_eq!(session.apply(Event::Join), Err(GameError::WrongPhase));
}

#[test]
fn test_small_council_powers_and_usurper_execution() {
    let mut session = Session::with_deck(stacked(Policy::Subversive), 11);
    let roles = start(&mut session, 5);
    let usurper = roles.iter().position(|r| *r == Role::Usurper).unwrap();

    for expected in 1..=2 {
        let Notice::PolicyEnacted { power, state, .. } = enact_round(&mut session, &roles) else {
            panic!("expected enactment");
        };
        assert_eq!(power, None);
        assert_eq!(state.policies.subversive, expected);
    }

    // Third subversive policy: peek.
    assert!(matches!(
        enact_round(&mut session, &roles),
        Notice::PolicyEnacted { power: Some(_), .. }
    ));
    assert_eq!(session.phase(), Phase::PowerPeek);
    let president = session.president().unwrap();
    let Ok(Notice::SpecialPowerFeedback { revealed, .. }) =
        session.apply(Event::UseSpecialPower {
            caller: president,
            request: PowerRequest::Peek,
        })
    else {
        panic!("expected peek feedback");
    };
    assert_eq!(
        revealed,
        Some(Revealed::TopPolicies(vec![Policy::Subversive; 3]))
    );

    // Fourth: execution of someone other than the usurper.
    enact_round(&mut session, &roles);
    assert_eq!(session.phase(), Phase::PowerExecution);
    let president = session.president().unwrap();
    let target = (0..5)
        .find(|seat| *seat != president && *seat != usurper)
        .unwrap();
    session
        .apply(Event::UseSpecialPower {
            caller: president,
            request: PowerRequest::Execute(target),
        })
        .unwrap();
    assert!(session.snapshot().is_eliminated(target));

    // Fifth: a second execution. The same target is refused.
    enact_round(&mut session, &roles);
    assert_eq!(session.phase(), Phase::PowerExecution);
    let president = session.president().unwrap();
    let repeat = session.apply(Event::UseSpecialPower {
        caller: president,
        request: PowerRequest::Execute(target),
    });
    assert!(matches!(repeat, Err(GameError::Invalid(_))));

    let Ok(Notice::GameEnded { reason, .. }) = session.apply(Event::UseSpecialPower {
        caller: president,
        request: PowerRequest::Execute(usurper),
    }) else {
        panic!("expected game end");
    };
    assert_eq!(reason, GameEnding::UsurperExecuted);
    assert!(session.is_over());
}

#[test]
fn test_usurper_elected_after_three_subversive_policies() {
    let mut session = Session::with_deck(stacked(Policy::Subversive), 13);
    let roles = start(&mut session, 5);
    let usurper = roles.iter().position(|r| *r == Role::Usurper).unwrap();

    for _ in 0..3 {
        enact_round(&mut session, &roles);
    }
    resolve_power(&mut session, &roles);

    loop {
        // The usurper cannot nominate themselves; pass the presidency on.
        while session.president() == Some(usurper) {
            fail_election(&mut session, &roles);
        }
        if !session.snapshot().term_limits.contains(&usurper) {
            break;
        }
        // Serve another term so the usurper leaves the term limits.
        enact_round(&mut session, &roles);
        resolve_power(&mut session, &roles);
    }

    let president = session.president().unwrap();
    let nominated = session.apply(Event::NominateChancellor {
        caller: president,
        proposal: usurper,
    });
    assert!(nominated.is_ok(), "usurper nomination: {nominated:?}");

    let Notice::GameEnded { reason, .. } = vote_all(&mut session, Ballot::Yes) else {
        panic!("expected game end");
    };
    assert_eq!(reason, GameEnding::UsurperElected);
    assert_eq!(reason.winner(), Faction::Conspirator);
}

#[test]
fn test_large_council_investigation() {
    let mut session = Session::with_deck(stacked(Policy::Subversive), 17);
    let roles = start(&mut session, 9);

    let Notice::PolicyEnacted { power, .. } = enact_round(&mut session, &roles) else {
        panic!("expected enactment");
    };
    assert!(power.is_some());
    assert_eq!(session.phase(), Phase::PowerInvestigate);

    let president = session.president().unwrap();
    let target = (president + 1) % 9;
    let Ok(Notice::SpecialPowerFeedback { revealed, state }) =
        session.apply(Event::UseSpecialPower {
            caller: president,
            request: PowerRequest::Investigate(target),
        })
    else {
        panic!("expected investigation feedback");
    };
    assert_eq!(
        revealed,
        Some(Revealed::Role {
            player: target,
            role: roles[target]
        })
    );
    assert_eq!(state.investigated, vec![target]);
    assert_eq!(state.phase, Phase::NominatingChancellor);
}
