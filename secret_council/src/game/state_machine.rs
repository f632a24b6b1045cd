//! Council session state machine.
//!
//! A [`Session`] owns every piece of mutable game state. Each inbound
//! [`Event`] is validated against the current [`Phase`] and the caller's
//! seat, applied exactly once, and answered with exactly one [`Outcome`].
//! Forced sub-steps (a forced enactment after three failed governments) are
//! folded into the output of the event that triggered them.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use thiserror::Error;

use super::constants::{
    ELECTION_TRACKER_LIMIT, LEGISLATIVE_HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS,
    VETO_UNLOCK_THRESHOLD,
};
use super::entities::{
    Ballot, GameEnding, GameSnapshot, PlayerIndex, Policy, PolicyDeck, PolicyTracks, Revealed,
    Role, ShuffledDeck, SpecialPower,
};
use super::functional;

/// Errors returned for rejected events. None of them end the session.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not allowed in the current phase")]
    WrongPhase,
    #[error("not your turn to act")]
    Unauthorized,
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("game is full")]
    GameFull,
}

fn invalid(reason: impl Into<String>) -> GameError {
    GameError::Invalid(reason.into())
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Phase {
    #[default]
    WaitingForPlayers,
    NominatingChancellor,
    VotingOnGovernment,
    PresidentDiscarding,
    ChancellorEnacting,
    VetoRequested,
    VetoConfirmation,
    PowerExecution,
    PowerSpecialElection,
    PowerInvestigate,
    PowerPeek,
    GameOver,
}

impl Phase {
    /// The special power this phase is waiting on, if any.
    #[must_use]
    pub const fn power(self) -> Option<SpecialPower> {
        match self {
            Self::PowerExecution => Some(SpecialPower::Execution),
            Self::PowerSpecialElection => Some(SpecialPower::SpecialElection),
            Self::PowerInvestigate => Some(SpecialPower::Investigate),
            Self::PowerPeek => Some(SpecialPower::Peek),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_over(self) -> bool {
        matches!(self, Self::GameOver)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::WaitingForPlayers => "waiting for players",
            Self::NominatingChancellor => "nominating chancellor",
            Self::VotingOnGovernment => "voting on government",
            Self::PresidentDiscarding => "president discarding",
            Self::ChancellorEnacting => "chancellor enacting",
            Self::VetoRequested => "veto requested",
            Self::VetoConfirmation => "veto confirmation",
            Self::PowerExecution => "execution",
            Self::PowerSpecialElection => "special election",
            Self::PowerInvestigate => "investigation",
            Self::PowerPeek => "policy peek",
            Self::GameOver => "game over",
        };
        write!(f, "{repr}")
    }
}

/// A president's use of an unlocked special power.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PowerRequest {
    Peek,
    ChooseSuccessor(PlayerIndex),
    Execute(PlayerIndex),
    Investigate(PlayerIndex),
}

impl PowerRequest {
    #[must_use]
    pub const fn power(self) -> SpecialPower {
        match self {
            Self::Peek => SpecialPower::Peek,
            Self::ChooseSuccessor(_) => SpecialPower::SpecialElection,
            Self::Execute(_) => SpecialPower::Execution,
            Self::Investigate(_) => SpecialPower::Investigate,
        }
    }
}

/// Inbound player actions.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Event {
    Join,
    Start,
    NominateChancellor {
        caller: PlayerIndex,
        proposal: PlayerIndex,
    },
    CastVote {
        caller: PlayerIndex,
        ballot: Ballot,
    },
    DiscardCard {
        caller: PlayerIndex,
        index: usize,
    },
    VetoVote {
        caller: PlayerIndex,
        ballot: Ballot,
    },
    UseSpecialPower {
        caller: PlayerIndex,
        request: PowerRequest,
    },
}

/// Successful results of an event.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Notice {
    PlayerRegistered(PlayerIndex),
    GameStarted {
        roles: Vec<Role>,
        state: GameSnapshot,
    },
    ElectionStarted(GameSnapshot),
    VoteRegistered,
    NextPresident(GameSnapshot),
    PolicyEnacted {
        card: Policy,
        power: Option<SpecialPower>,
        /// Set when the election tracker forced the top card into law.
        forced: bool,
        state: GameSnapshot,
    },
    LegislationPresident {
        hand: Vec<Policy>,
        state: GameSnapshot,
    },
    LegislationChancellor {
        hand: Vec<Policy>,
        state: GameSnapshot,
    },
    SpecialPowerFeedback {
        revealed: Option<Revealed>,
        state: GameSnapshot,
    },
    VetoRequested(GameSnapshot),
    GameEnded {
        reason: GameEnding,
        roles: Vec<Role>,
        state: GameSnapshot,
    },
}

impl Notice {
    /// The state snapshot carried by this notice, if it has one.
    #[must_use]
    pub const fn state(&self) -> Option<&GameSnapshot> {
        match self {
            Self::PlayerRegistered(_) | Self::VoteRegistered => None,
            Self::ElectionStarted(state)
            | Self::NextPresident(state)
            | Self::VetoRequested(state)
            | Self::GameStarted { state, .. }
            | Self::PolicyEnacted { state, .. }
            | Self::LegislationPresident { state, .. }
            | Self::LegislationChancellor { state, .. }
            | Self::SpecialPowerFeedback { state, .. }
            | Self::GameEnded { state, .. } => Some(state),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PlayerRegistered(index) => format!("player {index} registered"),
            Self::GameStarted { roles, .. } => format!("game started with {} players", roles.len()),
            Self::ElectionStarted(state) => format!(
                "election started for chancellor {:?} under president {:?}",
                state.chancellor, state.president
            ),
            Self::VoteRegistered => "vote registered".to_string(),
            Self::NextPresident(state) => format!(
                "government failed, tracker at {}, president {:?}",
                state.election_tracker, state.president
            ),
            Self::PolicyEnacted {
                card,
                power,
                forced,
                state,
            } => {
                let how = if *forced { "forced" } else { "enacted" };
                match power {
                    Some(power) => format!("{card} policy {how} ({}), unlocks {power}", state.policies),
                    None => format!("{card} policy {how} ({})", state.policies),
                }
            }
            Self::LegislationPresident { hand, .. } => {
                format!("president holds {} policies", hand.len())
            }
            Self::LegislationChancellor { hand, .. } => {
                format!("chancellor holds {} policies", hand.len())
            }
            Self::SpecialPowerFeedback { revealed, .. } => match revealed {
                Some(_) => "special power used, information revealed".to_string(),
                None => "special power used".to_string(),
            },
            Self::VetoRequested(state) => format!("veto pending in {}", state.phase),
            Self::GameEnded { reason, .. } => format!("game over, {reason}"),
        };
        write!(f, "{repr}")
    }
}

/// The single output produced for every event.
pub type Outcome = Result<Notice, GameError>;

/// One council game.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    player_count: usize,
    president: Option<PlayerIndex>,
    chancellor: Option<PlayerIndex>,
    next_president: Option<PlayerIndex>,
    roles: Vec<Role>,
    policies: PolicyTracks,
    election_tracker: u8,
    /// Most recently elected president and chancellor.
    term_limits: Vec<PlayerIndex>,
    eliminated: BTreeSet<PlayerIndex>,
    investigated: BTreeSet<PlayerIndex>,
    votes: Vec<Option<Ballot>>,
    /// Legislative hand held by the president or chancellor.
    pending: Vec<Policy>,
    deck: Box<dyn PolicyDeck>,
    rng: StdRng,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(
            Box::new(ShuffledDeck::new()),
            StdRng::from_rng(&mut rand::rng()),
        )
    }

    /// Fully deterministic session: roles, first president and deck order
    /// all derive from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_parts(
            Box::new(ShuffledDeck::seeded(seed)),
            StdRng::seed_from_u64(seed),
        )
    }

    /// Session drawing from a caller-provided deck.
    #[must_use]
    pub fn with_deck<D: PolicyDeck + 'static>(deck: D, seed: u64) -> Self {
        Self::with_parts(Box::new(deck), StdRng::seed_from_u64(seed))
    }

    fn with_parts(deck: Box<dyn PolicyDeck>, rng: StdRng) -> Self {
        Self {
            phase: Phase::WaitingForPlayers,
            player_count: 0,
            president: None,
            chancellor: None,
            next_president: None,
            roles: Vec::with_capacity(MAX_PLAYERS),
            policies: PolicyTracks::default(),
            election_tracker: 0,
            term_limits: Vec::with_capacity(2),
            eliminated: BTreeSet::new(),
            investigated: BTreeSet::new(),
            votes: Vec::with_capacity(MAX_PLAYERS),
            pending: Vec::with_capacity(LEGISLATIVE_HAND_SIZE),
            deck,
            rng,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.phase.is_over()
    }

    #[must_use]
    pub const fn player_count(&self) -> usize {
        self.player_count
    }

    #[must_use]
    pub const fn president(&self) -> Option<PlayerIndex> {
        self.president
    }

    /// Chancellor of the government currently on the ballot or in office.
    #[must_use]
    pub const fn chancellor(&self) -> Option<PlayerIndex> {
        self.chancellor
    }

    #[must_use]
    pub const fn policies(&self) -> PolicyTracks {
        self.policies
    }

    #[must_use]
    pub const fn election_tracker(&self) -> u8 {
        self.election_tracker
    }

    /// Secret roles; empty until the game starts.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            player_count: self.player_count,
            president: self.president,
            chancellor: self.chancellor,
            next_president: self.next_president,
            election_tracker: self.election_tracker,
            policies: self.policies,
            votes: self.votes.clone(),
            eliminated: self.eliminated.iter().copied().collect(),
            investigated: self.investigated.iter().copied().collect(),
            term_limits: self.term_limits.clone(),
        }
    }

    /// Validates and applies one event.
    pub fn apply(&mut self, event: Event) -> Outcome {
        if self.phase.is_over() {
            return Err(GameError::WrongPhase);
        }

        match event {
            Event::Join => self.join(),
            Event::Start => self.start(),
            Event::NominateChancellor { caller, proposal } => self.nominate(caller, proposal),
            Event::CastVote { caller, ballot } => match self.phase {
                Phase::VotingOnGovernment => self.cast_vote(caller, ballot),
                Phase::VetoRequested | Phase::VetoConfirmation => self.veto_vote(caller, ballot),
                _ => Err(GameError::WrongPhase),
            },
            Event::DiscardCard { caller, index } => match self.phase {
                Phase::PresidentDiscarding => self.president_discard(caller, index),
                Phase::ChancellorEnacting => self.chancellor_discard(caller, index),
                _ => Err(GameError::WrongPhase),
            },
            Event::VetoVote { caller, ballot } => self.veto_vote(caller, ballot),
            Event::UseSpecialPower { caller, request } => self.use_power(caller, request),
        }
    }

    fn require_phase(&self, phase: Phase) -> Result<(), GameError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(GameError::WrongPhase)
        }
    }

    fn require_president(&self, caller: PlayerIndex) -> Result<(), GameError> {
        if self.president == Some(caller) {
            Ok(())
        } else {
            Err(GameError::Unauthorized)
        }
    }

    fn require_chancellor(&self, caller: PlayerIndex) -> Result<(), GameError> {
        if self.chancellor == Some(caller) {
            Ok(())
        } else {
            Err(GameError::Unauthorized)
        }
    }

    fn is_living(&self, player: PlayerIndex) -> bool {
        player < self.player_count && !self.eliminated.contains(&player)
    }

    fn living_count(&self) -> usize {
        self.player_count - self.eliminated.len()
    }

    fn usurper_eliminated(&self) -> bool {
        self.roles
            .iter()
            .position(|role| *role == Role::Usurper)
            .is_some_and(|seat| self.eliminated.contains(&seat))
    }

    /// First living seat at or after `start`, wrapping around the table.
    fn next_living_from(&self, start: PlayerIndex) -> PlayerIndex {
        let n = self.player_count.max(1);
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|seat| !self.eliminated.contains(seat))
            .unwrap_or(start % n)
    }

    /// Hands the presidency to the next living seat in circular order.
    fn rotate_presidency(&mut self) {
        let president = self.next_living_from(self.next_president.unwrap_or(0));
        self.president = Some(president);
        self.next_president = Some(self.next_living_from(president + 1));
        self.chancellor = None;
    }

    fn ending(&self, elected: Option<Role>) -> Option<GameEnding> {
        functional::game_ending(self.policies, elected, self.usurper_eliminated())
    }

    fn finish(&mut self, reason: GameEnding) -> Notice {
        self.phase = Phase::GameOver;
        self.pending.clear();
        log::debug!("council finished: {reason} ({})", self.policies);
        Notice::GameEnded {
            reason,
            roles: self.roles.clone(),
            state: self.snapshot(),
        }
    }

    fn join(&mut self) -> Outcome {
        self.require_phase(Phase::WaitingForPlayers)?;
        if self.player_count >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }
        let index = self.player_count;
        self.player_count += 1;
        Ok(Notice::PlayerRegistered(index))
    }

    fn start(&mut self) -> Outcome {
        self.require_phase(Phase::WaitingForPlayers)?;
        let Some(roles) = functional::assign_roles(self.player_count, &mut self.rng) else {
            return Err(invalid(format!(
                "need at least {MIN_PLAYERS} players to start, have {}",
                self.player_count
            )));
        };

        let n = self.player_count;
        self.roles = roles;
        self.votes = vec![None; n];
        self.eliminated.clear();
        self.investigated.clear();
        self.term_limits.clear();

        let president = self.rng.random_range(0..n);
        self.president = Some(president);
        self.next_president = Some((president + 1) % n);
        self.phase = Phase::NominatingChancellor;
        log::debug!("council of {n} started, first president is seat {president}");

        Ok(Notice::GameStarted {
            roles: self.roles.clone(),
            state: self.snapshot(),
        })
    }

    fn nominate(&mut self, caller: PlayerIndex, proposal: PlayerIndex) -> Outcome {
        self.require_phase(Phase::NominatingChancellor)?;
        self.require_president(caller)?;
        if proposal >= self.player_count {
            return Err(invalid(format!("no player in seat {proposal}")));
        }
        if proposal == caller {
            return Err(invalid("the president cannot nominate themselves"));
        }
        if self.eliminated.contains(&proposal) {
            return Err(invalid(format!("seat {proposal} has been executed")));
        }
        let eligible = functional::eligible_chancellors(
            self.player_count,
            caller,
            &self.term_limits,
            |seat| self.eliminated.contains(&seat),
        );
        if !eligible.contains(&proposal) {
            return Err(invalid(format!("seat {proposal} is term-limited")));
        }

        self.chancellor = Some(proposal);
        self.votes = vec![None; self.player_count];
        self.phase = Phase::VotingOnGovernment;
        Ok(Notice::ElectionStarted(self.snapshot()))
    }

    fn cast_vote(&mut self, caller: PlayerIndex, ballot: Ballot) -> Outcome {
        if !self.is_living(caller) {
            return Err(GameError::Unauthorized);
        }
        let Some(slot) = self.votes.get_mut(caller) else {
            return Err(GameError::Unauthorized);
        };
        if slot.is_some() {
            return Err(invalid("already voted this round"));
        }
        *slot = Some(ballot);

        let cast = self.votes.iter().flatten().count();
        if cast < self.living_count() {
            return Ok(Notice::VoteRegistered);
        }

        if !functional::election_passes(&self.votes) {
            let outcome = self.failed_government();
            if outcome.is_err() {
                self.votes[caller] = None;
            }
            return outcome;
        }

        let (Some(president), Some(chancellor)) = (self.president, self.chancellor) else {
            log::error!("election resolved without a full government on the ballot");
            return Err(invalid("no government on the ballot"));
        };
        self.term_limits.clear();
        self.term_limits.extend([president, chancellor]);

        let elected = self.roles.get(chancellor).copied();
        if let Some(reason) = self.ending(elected) {
            return Ok(self.finish(reason));
        }

        self.pending = self.deck.draw(LEGISLATIVE_HAND_SIZE);
        self.phase = Phase::PresidentDiscarding;
        Ok(Notice::LegislationPresident {
            hand: self.pending.clone(),
            state: self.snapshot(),
        })
    }

    /// Shared by rejected governments and accepted vetoes.
    fn failed_government(&mut self) -> Outcome {
        if self.election_tracker + 1 < ELECTION_TRACKER_LIMIT {
            self.rotate_presidency();
            self.phase = Phase::NominatingChancellor;
            self.election_tracker += 1;
            return Ok(Notice::NextPresident(self.snapshot()));
        }

        let Some(card) = self.deck.draw(1).into_iter().next() else {
            log::error!("policy deck returned no card for a forced enactment");
            return Err(invalid("policy deck is empty"));
        };
        self.rotate_presidency();
        self.phase = Phase::NominatingChancellor;
        self.term_limits.clear();
        // Forced enactments never grant a power.
        self.enact_track(card);
        if let Some(reason) = self.ending(None) {
            return Ok(self.finish(reason));
        }

        Ok(Notice::PolicyEnacted {
            card,
            power: None,
            forced: true,
            state: self.snapshot(),
        })
    }

    /// Moves a card onto its track and resets the election tracker.
    fn enact_track(&mut self, card: Policy) {
        self.election_tracker = 0;
        match card {
            Policy::Loyal => self.policies.loyal += 1,
            Policy::Subversive => self.policies.subversive += 1,
        }
    }

    fn enact_pending(&mut self) -> Outcome {
        let Some(card) = self.pending.pop() else {
            log::error!("enactment requested with an empty legislative hand");
            return Err(invalid("no policy awaiting enactment"));
        };
        self.pending.clear();

        self.enact_track(card);
        let power = match card {
            Policy::Loyal => None,
            Policy::Subversive => {
                functional::unlocked_power(self.player_count, self.policies.subversive)
            }
        };
        if let Some(reason) = self.ending(None) {
            return Ok(self.finish(reason));
        }

        match power {
            Some(power) => self.phase = power.phase(),
            None => {
                self.rotate_presidency();
                self.phase = Phase::NominatingChancellor;
            }
        }

        Ok(Notice::PolicyEnacted {
            card,
            power,
            forced: false,
            state: self.snapshot(),
        })
    }

    fn president_discard(&mut self, caller: PlayerIndex, index: usize) -> Outcome {
        self.require_president(caller)?;
        if index >= self.pending.len() {
            return Err(invalid(format!("discard index {index} out of range")));
        }

        let discarded = self.pending.remove(index);
        self.deck.discard(discarded);
        self.phase = Phase::ChancellorEnacting;
        Ok(Notice::LegislationChancellor {
            hand: self.pending.clone(),
            state: self.snapshot(),
        })
    }

    fn chancellor_discard(&mut self, caller: PlayerIndex, index: usize) -> Outcome {
        self.require_chancellor(caller)?;
        if index >= self.pending.len() {
            return Err(invalid(format!("discard index {index} out of range")));
        }

        let discarded = self.pending.remove(index);
        self.deck.discard(discarded);

        if self.policies.subversive >= VETO_UNLOCK_THRESHOLD {
            self.phase = Phase::VetoRequested;
            return Ok(Notice::VetoRequested(self.snapshot()));
        }
        self.enact_pending()
    }

    fn veto_vote(&mut self, caller: PlayerIndex, ballot: Ballot) -> Outcome {
        match self.phase {
            Phase::VetoRequested => {
                self.require_chancellor(caller)?;
                match ballot {
                    Ballot::Yes => {
                        self.phase = Phase::VetoConfirmation;
                        Ok(Notice::VetoRequested(self.snapshot()))
                    }
                    Ballot::No => self.enact_pending(),
                }
            }
            Phase::VetoConfirmation => {
                self.require_president(caller)?;
                match ballot {
                    Ballot::Yes => {
                        let vetoed = std::mem::take(&mut self.pending);
                        let outcome = self.failed_government();
                        if outcome.is_err() {
                            self.pending = vetoed;
                            return outcome;
                        }
                        for card in vetoed {
                            self.deck.discard(card);
                        }
                        outcome
                    }
                    Ballot::No => self.enact_pending(),
                }
            }
            _ => Err(GameError::WrongPhase),
        }
    }

    fn use_power(&mut self, caller: PlayerIndex, request: PowerRequest) -> Outcome {
        let Some(unlocked) = self.phase.power() else {
            return Err(GameError::WrongPhase);
        };
        self.require_president(caller)?;
        if request.power() != unlocked {
            return Err(GameError::WrongPhase);
        }

        let revealed = match request {
            PowerRequest::Peek => {
                let top = self.deck.peek();
                self.rotate_presidency();
                Some(Revealed::TopPolicies(top))
            }
            PowerRequest::ChooseSuccessor(target) => {
                if !self.is_living(target) || target == caller {
                    return Err(invalid(format!("seat {target} cannot be chosen as successor")));
                }
                // The regular rotation resumes from `next_president` afterwards.
                self.president = Some(target);
                self.chancellor = None;
                None
            }
            PowerRequest::Execute(target) => {
                if !self.is_living(target) || target == caller {
                    return Err(invalid(format!("seat {target} cannot be executed")));
                }
                self.eliminated.insert(target);
                if let Some(reason) = self.ending(None) {
                    return Ok(self.finish(reason));
                }
                self.rotate_presidency();
                None
            }
            PowerRequest::Investigate(target) => {
                if !self.is_living(target) || target == caller {
                    return Err(invalid(format!("seat {target} cannot be investigated")));
                }
                if self.investigated.contains(&target) {
                    return Err(invalid(format!("seat {target} was already investigated")));
                }
                let Some(role) = self.roles.get(target).copied() else {
                    return Err(invalid(format!("no player in seat {target}")));
                };
                self.investigated.insert(target);
                self.rotate_presidency();
                Some(Revealed::Role {
                    player: target,
                    role,
                })
            }
        };

        self.phase = Phase::NominatingChancellor;
        Ok(Notice::SpecialPowerFeedback {
            revealed,
            state: self.snapshot(),
        })
    }
}
