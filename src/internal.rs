mod pacing;

pub(crate) use pacing::{pause, random_delay};
