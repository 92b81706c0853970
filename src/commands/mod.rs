//! Bot commands.

mod reset;
mod tracked;

use crate::{Data, HeraldError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, HeraldError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![tracked::tracked(), reset::reset_notices()]
}
