pub mod algorithm;
pub mod dispatcher;
pub mod nearest;
pub mod types;

pub use algorithm::MatchingAlgorithm;
pub use dispatcher::{Dispatcher, TripTicket};
pub use nearest::NearestFirst;
pub use types::{MatchCandidate, MatchResult};
