#[macro_use]
extern crate tracing;

pub mod animation;
pub mod card_stack;
pub mod cli;
pub mod gesture;
pub mod simulate;
pub mod utils;
