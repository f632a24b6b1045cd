use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{LOYAL_POLICIES_IN_DECK, PEEK_SIZE, SUBVERSIVE_POLICIES_IN_DECK};
use super::functional;
use super::state_machine::Phase;

/// Seat number of a player, assigned in join order starting at zero.
pub type PlayerIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Faction {
    Loyalist,
    Conspirator,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Loyalist => "loyalist",
            Self::Conspirator => "conspirator",
        };
        write!(f, "{repr}")
    }
}

/// Secret role dealt to each player when the game starts.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Role {
    #[default]
    Loyalist,
    Conspirator,
    /// The conspirators' figurehead. Electing them late ends the game for
    /// the conspirators; executing them ends it for the loyalists.
    Usurper,
}

impl Role {
    #[must_use]
    pub const fn faction(self) -> Faction {
        match self {
            Self::Loyalist => Faction::Loyalist,
            Self::Conspirator | Self::Usurper => Faction::Conspirator,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Loyalist => "loyalist",
            Self::Conspirator => "conspirator",
            Self::Usurper => "usurper",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Policy {
    Loyal,
    Subversive,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Loyal => "L",
            Self::Subversive => "S",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Ballot {
    Yes,
    No,
}

impl Ballot {
    /// Contribution of this ballot to an election tally.
    #[must_use]
    pub const fn weight(self) -> i32 {
        match self {
            Self::Yes => 1,
            Self::No => -1,
        }
    }
}

impl From<bool> for Ballot {
    fn from(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }
}

/// Extra presidential action unlocked by subversive enactments.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SpecialPower {
    Investigate,
    SpecialElection,
    Peek,
    Execution,
}

impl SpecialPower {
    /// Phase the session waits in until the president uses this power.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::Investigate => Phase::PowerInvestigate,
            Self::SpecialElection => Phase::PowerSpecialElection,
            Self::Peek => Phase::PowerPeek,
            Self::Execution => Phase::PowerExecution,
        }
    }
}

impl fmt::Display for SpecialPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Investigate => "investigate loyalty",
            Self::SpecialElection => "call special election",
            Self::Peek => "policy peek",
            Self::Execution => "execution",
        };
        write!(f, "{repr}")
    }
}

/// Why a game ended. Variants are listed in the order they are checked.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum GameEnding {
    SubversivePolicy,
    LoyalPolicy,
    UsurperElected,
    UsurperExecuted,
}

impl GameEnding {
    #[must_use]
    pub const fn winner(self) -> Faction {
        match self {
            Self::SubversivePolicy | Self::UsurperElected => Faction::Conspirator,
            Self::LoyalPolicy | Self::UsurperExecuted => Faction::Loyalist,
        }
    }
}

impl fmt::Display for GameEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::SubversivePolicy => "six subversive policies enacted",
            Self::LoyalPolicy => "five loyal policies enacted",
            Self::UsurperElected => "usurper elected chancellor",
            Self::UsurperExecuted => "usurper executed",
        };
        write!(f, "{} win: {repr}", self.winner())
    }
}

/// Enacted policy counts for both factions.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PolicyTracks {
    pub loyal: u8,
    pub subversive: u8,
}

impl fmt::Display for PolicyTracks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}/S{}", self.loyal, self.subversive)
    }
}

/// Private information handed to the president by a special power.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Revealed {
    TopPolicies(Vec<Policy>),
    Role { player: PlayerIndex, role: Role },
}

/// Owned copy of the publicly visible session fields. Later transitions
/// never reach back into a snapshot that was already emitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub player_count: usize,
    pub president: Option<PlayerIndex>,
    pub chancellor: Option<PlayerIndex>,
    pub next_president: Option<PlayerIndex>,
    pub election_tracker: u8,
    pub policies: PolicyTracks,
    pub votes: Vec<Option<Ballot>>,
    pub eliminated: Vec<PlayerIndex>,
    pub investigated: Vec<PlayerIndex>,
    pub term_limits: Vec<PlayerIndex>,
}

impl GameSnapshot {
    #[must_use]
    pub fn is_eliminated(&self, player: PlayerIndex) -> bool {
        self.eliminated.contains(&player)
    }

    /// Seats still eligible to act, in seat order.
    #[must_use]
    pub fn living_players(&self) -> Vec<PlayerIndex> {
        (0..self.player_count)
            .filter(|player| !self.is_eliminated(*player))
            .collect()
    }

    /// Seats the current president may nominate; empty without a president.
    #[must_use]
    pub fn eligible_chancellors(&self) -> Vec<PlayerIndex> {
        match self.president {
            Some(president) => functional::eligible_chancellors(
                self.player_count,
                president,
                &self.term_limits,
                |seat| self.is_eliminated(seat),
            ),
            None => Vec::new(),
        }
    }
}

/// Source of policy cards for a session.
pub trait PolicyDeck: fmt::Debug + Send {
    /// Removes and returns the top `n` cards in draw order, reshuffling the
    /// discard pile back in if the draw pile runs short.
    fn draw(&mut self, n: usize) -> Vec<Policy>;

    /// Returns the top cards without removing them.
    fn peek(&mut self) -> Vec<Policy>;

    fn discard(&mut self, policy: Policy);
}

/// The standard 17-card policy deck. The top of the draw pile is the end of
/// `draw_pile`.
#[derive(Debug)]
pub struct ShuffledDeck {
    draw_pile: Vec<Policy>,
    discard_pile: Vec<Policy>,
    rng: StdRng,
}

impl Default for ShuffledDeck {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuffledDeck {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// A deck that deals `order` front to back before any reshuffle.
    #[must_use]
    pub fn stacked(order: impl IntoIterator<Item = Policy>) -> Self {
        let mut draw_pile: Vec<Policy> = order.into_iter().collect();
        draw_pile.reverse();
        Self {
            draw_pile,
            discard_pile: Vec::new(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let mut draw_pile = Vec::with_capacity(LOYAL_POLICIES_IN_DECK + SUBVERSIVE_POLICIES_IN_DECK);
        draw_pile.extend(std::iter::repeat_n(Policy::Loyal, LOYAL_POLICIES_IN_DECK));
        draw_pile.extend(std::iter::repeat_n(
            Policy::Subversive,
            SUBVERSIVE_POLICIES_IN_DECK,
        ));
        draw_pile.shuffle(&mut rng);
        Self {
            draw_pile,
            discard_pile: Vec::new(),
            rng,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.draw_pile.len()
    }

    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discard_pile.len()
    }

    fn ensure(&mut self, n: usize) {
        if self.draw_pile.len() < n {
            self.draw_pile.append(&mut self.discard_pile);
            self.draw_pile.shuffle(&mut self.rng);
            log::debug!("reshuffled policy deck, {} cards in pile", self.draw_pile.len());
        }
    }
}

impl PolicyDeck for ShuffledDeck {
    fn draw(&mut self, n: usize) -> Vec<Policy> {
        self.ensure(n);
        let at = self.draw_pile.len().saturating_sub(n);
        let mut drawn = self.draw_pile.split_off(at);
        drawn.reverse();
        drawn
    }

    fn peek(&mut self) -> Vec<Policy> {
        self.ensure(PEEK_SIZE);
        self.draw_pile.iter().rev().take(PEEK_SIZE).copied().collect()
    }

    fn discard(&mut self, policy: Policy) {
        self.discard_pile.push(policy);
    }
}
