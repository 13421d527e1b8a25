pub mod accounts;
pub mod challenge_tags;
pub mod challenges;
pub mod likes;
pub mod participants;
pub mod sessions;
pub mod tags;
