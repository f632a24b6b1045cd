//! Random bots playing every seat of a council.
//!
//! One [`BotTable`] controls all seats of a single session. It only ever
//! picks events that are legal for the last observed state, choosing
//! uniformly among the legal options, and follows the session through the
//! notices it gets back.

use anyhow::{Context, bail};
use rand::{Rng, rngs::StdRng, seq::IndexedRandom};
use secret_council::{
    Ballot, Event, GameEnding, GameSnapshot, Notice, Phase, PlayerIndex, PowerRequest,
    SessionLink,
};

use crate::metrics;

/// Consecutive rejected events tolerated before a game is abandoned.
const MAX_CONSECUTIVE_REJECTIONS: usize = 16;

/// Result of one simulated game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    /// `None` when no legal move remained or the event budget ran out
    pub ending: Option<GameEnding>,
    /// Events applied by the session
    pub events: usize,
    /// Events the session rejected
    pub rejected: usize,
}

/// Bot controller for every seat of one session
pub struct BotTable {
    rng: StdRng,
    yes_probability: f64,
    state: Option<GameSnapshot>,
    hand: usize,
}

impl BotTable {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            yes_probability: 0.7,
            state: None,
            hand: 0,
        }
    }

    /// Pick the next event for the last observed state. `None` means no
    /// seat has a legal move left.
    pub fn next_event(&mut self) -> Option<Event> {
        let state = self.state.as_ref()?;
        let president = state.president?;
        let living = state.living_players();

        let event = match state.phase {
            Phase::WaitingForPlayers | Phase::GameOver => return None,
            Phase::NominatingChancellor => {
                let candidates = state.eligible_chancellors();
                Event::NominateChancellor {
                    caller: president,
                    proposal: *candidates.choose(&mut self.rng)?,
                }
            }
            Phase::VotingOnGovernment => {
                let caller = living
                    .iter()
                    .copied()
                    .find(|seat| state.votes.get(*seat).is_some_and(Option::is_none))?;
                Event::CastVote {
                    caller,
                    ballot: Ballot::from(self.rng.random_bool(self.yes_probability)),
                }
            }
            Phase::PresidentDiscarding => Event::DiscardCard {
                caller: president,
                index: self.rng.random_range(0..self.hand.max(1)),
            },
            Phase::ChancellorEnacting => Event::DiscardCard {
                caller: state.chancellor?,
                index: self.rng.random_range(0..self.hand.max(1)),
            },
            Phase::VetoRequested => Event::VetoVote {
                caller: state.chancellor?,
                ballot: Ballot::from(self.rng.random_bool(0.5)),
            },
            Phase::VetoConfirmation => Event::VetoVote {
                caller: president,
                ballot: Ballot::from(self.rng.random_bool(0.5)),
            },
            Phase::PowerPeek => Event::UseSpecialPower {
                caller: president,
                request: PowerRequest::Peek,
            },
            Phase::PowerExecution | Phase::PowerSpecialElection | Phase::PowerInvestigate => {
                let targets: Vec<PlayerIndex> = living
                    .iter()
                    .copied()
                    .filter(|seat| *seat != president)
                    .filter(|seat| {
                        state.phase != Phase::PowerInvestigate
                            || !state.investigated.contains(seat)
                    })
                    .collect();
                let target = *targets.choose(&mut self.rng)?;
                let request = match state.phase {
                    Phase::PowerExecution => PowerRequest::Execute(target),
                    Phase::PowerSpecialElection => PowerRequest::ChooseSuccessor(target),
                    _ => PowerRequest::Investigate(target),
                };
                Event::UseSpecialPower {
                    caller: president,
                    request,
                }
            }
        };
        Some(event)
    }

    /// Update the tracked state from an applied event and its notice.
    pub fn observe(&mut self, event: Event, notice: &Notice) {
        match notice {
            Notice::VoteRegistered => {
                if let (Some(state), Event::CastVote { caller, ballot }) = (&mut self.state, event)
                    && let Some(slot) = state.votes.get_mut(caller)
                {
                    *slot = Some(ballot);
                }
            }
            Notice::LegislationPresident { hand, .. } | Notice::LegislationChancellor { hand, .. } => {
                self.hand = hand.len();
            }
            _ => {}
        }

        if let Some(state) = notice.state() {
            self.state = Some(state.clone());
        }
    }
}

/// Join `players` seats, start the game and play it to the end.
pub async fn play_game(
    link: &mut SessionLink,
    players: usize,
    rng: StdRng,
    max_events: usize,
) -> anyhow::Result<GameSummary> {
    let mut table = BotTable::new(rng);
    let mut summary = GameSummary {
        ending: None,
        events: 0,
        rejected: 0,
    };

    for _ in 0..players {
        link.request(Event::Join)
            .await
            .context("session closed while joining")?
            .context("join rejected")?;
    }
    let started = link
        .request(Event::Start)
        .await
        .context("session closed while starting")?
        .context("start rejected")?;
    table.observe(Event::Start, &started);
    metrics::games_started_total();

    let mut consecutive_rejections = 0;
    while summary.events < max_events {
        let Some(event) = table.next_event() else {
            log::warn!("Session {}: no legal move left, abandoning", link.id());
            return Ok(summary);
        };

        match link.request(event).await.context("session closed mid-game")? {
            Ok(notice) => {
                summary.events += 1;
                consecutive_rejections = 0;
                metrics::events_applied_total();
                if let Notice::GameEnded { reason, .. } = &notice {
                    summary.ending = Some(*reason);
                    return Ok(summary);
                }
                table.observe(event, &notice);
            }
            Err(error) => {
                summary.rejected += 1;
                consecutive_rejections += 1;
                metrics::events_rejected_total(&error);
                log::debug!("Session {}: {:?} rejected: {}", link.id(), event, error);
                if consecutive_rejections >= MAX_CONSECUTIVE_REJECTIONS {
                    bail!(
                        "session {} rejected {} events in a row",
                        link.id(),
                        consecutive_rejections
                    );
                }
            }
        }
    }

    log::warn!(
        "Session {}: event budget of {} exhausted",
        link.id(),
        max_events
    );
    Ok(summary)
}
