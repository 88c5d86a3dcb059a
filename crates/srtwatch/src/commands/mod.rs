//! Command dispatch: bridges CLI args -> client/server calls -> output.

pub mod config_cmd;
pub mod devices;
pub mod remove;
pub mod rename;
pub mod report;
pub mod serve;
pub mod watch;
pub mod watchlist;

use crate::cli::{Command, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(ctx, args).await,
        Command::Watch(args) => watch::handle(ctx, args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Report(args) => report::handle(ctx, args, global).await,
        Command::Rename(args) => rename::handle(ctx, args, global).await,
        Command::Remove(args) => remove::handle(ctx, args, global).await,
        Command::Watchlist(args) => watchlist::handle(ctx, args, global).await,
        Command::Config(args) => config_cmd::handle(ctx, args, global),
    }
}
