//! dscctl command implementations

pub mod compile;
pub mod dot;
pub mod simulate;
pub mod verify;
