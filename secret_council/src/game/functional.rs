//! Pure rule helpers shared by the session state machine.
//!
//! Nothing here touches session state directly, which keeps the lookup
//! tables and the termination order easy to test in isolation.

use rand::Rng;

use super::constants::{
    LOYAL_POLICIES_TO_WIN, MAX_PLAYERS, MIN_PLAYERS, SUBVERSIVE_POLICIES_TO_WIN,
    USURPER_ELECTION_THRESHOLD,
};
use super::entities::{Ballot, GameEnding, PlayerIndex, PolicyTracks, Role, SpecialPower};

/// Player-count bracket used by the role and power tables.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Bracket {
    Small,
    Medium,
    Large,
}

impl Bracket {
    /// `None` outside of the playable range.
    #[must_use]
    pub const fn for_players(player_count: usize) -> Option<Self> {
        match player_count {
            5 | 6 => Some(Self::Small),
            7 | 8 => Some(Self::Medium),
            9 | 10 => Some(Self::Large),
            _ => None,
        }
    }

    /// Conspirators dealt in addition to the usurper.
    #[must_use]
    pub const fn conspirators(self) -> usize {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 3,
        }
    }
}

use SpecialPower::{Execution, Investigate, Peek, SpecialElection};

/// Power unlocked by the Nth subversive policy, indexed by track value.
#[rustfmt::skip]
const POWER_TABLE: [[Option<SpecialPower>; 6]; 3] = [
    [None, None, None, Some(Peek), Some(Execution), Some(Execution)],
    [None, None, Some(Investigate), Some(SpecialElection), Some(Execution), Some(Execution)],
    [None, Some(Investigate), Some(Investigate), Some(SpecialElection), Some(Execution), Some(Execution)],
];

/// Looks up the power unlocked when the subversive track reaches
/// `subversive`.
#[must_use]
pub fn unlocked_power(player_count: usize, subversive: u8) -> Option<SpecialPower> {
    let row = match Bracket::for_players(player_count)? {
        Bracket::Small => 0,
        Bracket::Medium => 1,
        Bracket::Large => 2,
    };
    POWER_TABLE[row].get(usize::from(subversive)).copied().flatten()
}

/// Signed election tally: +1 per yes, -1 per no. Unset ballots count zero.
#[must_use]
pub fn tally(votes: &[Option<Ballot>]) -> i32 {
    votes.iter().flatten().map(|ballot| ballot.weight()).sum()
}

/// An election passes only on a strictly positive tally.
#[must_use]
pub fn election_passes(votes: &[Option<Ballot>]) -> bool {
    tally(votes) > 0
}

/// Seats `president` may nominate, in seat order.
///
/// `term_limits` lists the last government as `[president, chancellor]`.
/// When every other living player served in it, the last president's limit
/// is waived so a small council can always form a government.
pub fn eligible_chancellors(
    player_count: usize,
    president: PlayerIndex,
    term_limits: &[PlayerIndex],
    is_eliminated: impl Fn(PlayerIndex) -> bool,
) -> Vec<PlayerIndex> {
    let candidates: Vec<PlayerIndex> = (0..player_count)
        .filter(|seat| *seat != president && !is_eliminated(*seat))
        .collect();
    let unlimited: Vec<PlayerIndex> = candidates
        .iter()
        .copied()
        .filter(|seat| !term_limits.contains(seat))
        .collect();
    if !unlimited.is_empty() {
        return unlimited;
    }

    let last_chancellor = term_limits.last().copied();
    candidates
        .into_iter()
        .filter(|seat| Some(*seat) != last_chancellor)
        .collect()
}

/// Deals roles for `player_count` seats: one usurper at a uniformly random
/// seat, then conspirators on uniformly random loyalist seats until the
/// bracket's count is filled. Returns `None` outside of the playable range.
pub fn assign_roles<R: Rng>(player_count: usize, rng: &mut R) -> Option<Vec<Role>> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) {
        return None;
    }
    let conspirators = Bracket::for_players(player_count)?.conspirators();

    let mut roles = vec![Role::Loyalist; player_count];
    roles[rng.random_range(0..player_count)] = Role::Usurper;

    let mut placed = 0;
    while placed < conspirators {
        let seat = rng.random_range(0..player_count);
        if roles[seat] == Role::Loyalist {
            roles[seat] = Role::Conspirator;
            placed += 1;
        }
    }
    Some(roles)
}

/// Termination check in fixed priority order. `elected` is the role of a
/// chancellor who was elected by the vote being resolved, if any.
#[must_use]
pub fn game_ending(
    policies: PolicyTracks,
    elected: Option<Role>,
    usurper_eliminated: bool,
) -> Option<GameEnding> {
    if policies.subversive >= SUBVERSIVE_POLICIES_TO_WIN {
        Some(GameEnding::SubversivePolicy)
    } else if policies.loyal >= LOYAL_POLICIES_TO_WIN {
        Some(GameEnding::LoyalPolicy)
    } else if elected == Some(Role::Usurper) && policies.subversive >= USURPER_ELECTION_THRESHOLD
    {
        Some(GameEnding::UsurperElected)
    } else if usurper_eliminated {
        Some(GameEnding::UsurperExecuted)
    } else {
        None
    }
}
