pub mod biomes;
pub mod classify;
pub mod locate;
pub mod scan;
pub mod watch;
