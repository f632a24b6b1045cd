/// Fewest players a council can start with.
pub const MIN_PLAYERS: usize = 5;
/// Most players that may join a single council.
pub const MAX_PLAYERS: usize = 10;

/// Loyal policies needed for the loyalists to win on policy.
pub const LOYAL_POLICIES_TO_WIN: u8 = 5;
/// Subversive policies needed for the conspirators to win on policy.
pub const SUBVERSIVE_POLICIES_TO_WIN: u8 = 6;
/// Subversive track value at which the chancellor may request a veto.
pub const VETO_UNLOCK_THRESHOLD: u8 = 5;
/// Subversive track value from which electing the usurper ends the game.
pub const USURPER_ELECTION_THRESHOLD: u8 = 3;
/// Consecutive failed governments that force the top policy into law.
pub const ELECTION_TRACKER_LIMIT: u8 = 3;

/// Cards dealt to the president at the start of a legislative session.
pub const LEGISLATIVE_HAND_SIZE: usize = 3;
/// Cards revealed by the peek power.
pub const PEEK_SIZE: usize = 3;

pub const LOYAL_POLICIES_IN_DECK: usize = 6;
pub const SUBVERSIVE_POLICIES_IN_DECK: usize = 11;
