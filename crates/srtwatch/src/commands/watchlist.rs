//! `srtwatch watchlist` -- manage the persisted watchlist.

use tabled::Tabled;

use srtwatch_core::{StreamingState, WatchEntry, Watchlist};

use crate::cli::{GlobalOpts, WatchlistArgs, WatchlistCommand};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct WatchRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "SRT")]
    srt: String,
    #[tabled(rename = "Live")]
    live: String,
}

fn to_row(entry: &WatchEntry) -> WatchRow {
    WatchRow {
        name: entry.identity.clone().unwrap_or_default(),
        address: entry.local_address.clone(),
        port: entry.port,
        srt: entry.streaming.to_string(),
        live: if entry.liveness { "yes".into() } else { "no".into() },
    }
}

fn entry_id(entry: &WatchEntry) -> String {
    entry
        .identity
        .clone()
        .unwrap_or_else(|| format!("{}:{}", entry.local_address, entry.port))
}

pub async fn handle(
    ctx: &Context,
    args: WatchlistArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let path = ctx.config.observer.watchlist_path();

    match args.command {
        WatchlistCommand::Show => {
            let list = Watchlist::load_or_default(&path)?;
            let rendered = output::render_list(&global.output, list.entries(), to_row, entry_id);
            output::print_output(&rendered, global.quiet);
        }

        WatchlistCommand::Add {
            address,
            port,
            name,
        } => {
            let mut list = Watchlist::load_or_default(&path)?;
            let entry = WatchEntry {
                identity: name,
                local_address: address,
                public_address: None,
                streaming: StreamingState::Unknown,
                port,
                liveness: false,
            };
            let id = entry_id(&entry);
            if list.add(entry) {
                list.save(&path)?;
                output::print_output(&format!("added {id}"), global.quiet);
            } else {
                output::print_output(&format!("{id} already on the watchlist"), global.quiet);
            }
        }

        WatchlistCommand::Remove { key } => {
            let mut list = Watchlist::load_or_default(&path)?;
            let removed = list.remove(&key);
            if removed == 0 {
                return Err(CliError::NotFound {
                    resource_type: "watchlist entry".into(),
                    identifier: key,
                });
            }
            list.save(&path)?;
            output::print_output(&format!("removed {removed} entry(ies)"), global.quiet);
        }
    }

    Ok(())
}
