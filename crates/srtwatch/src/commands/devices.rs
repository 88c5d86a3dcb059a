//! `srtwatch devices` -- pull and render the fleet snapshot.

use owo_colors::OwoColorize;
use tabled::Tabled;

use srtwatch_core::{StreamingState, WireEntry};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "WAN")]
    wan: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "SRT")]
    srt: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn to_row(entry: &WireEntry, color: bool) -> DeviceRow {
    let d = &entry.data;
    let srt = if color {
        match d.streaming_state {
            StreamingState::On => d.streaming_state.to_string().green().to_string(),
            StreamingState::Off => d.streaming_state.to_string().red().to_string(),
            StreamingState::Unknown => d.streaming_state.to_string().yellow().to_string(),
        }
    } else {
        d.streaming_state.to_string()
    };

    DeviceRow {
        name: d.identity.clone(),
        address: d.local_address.clone(),
        wan: d.public_address.clone().unwrap_or_default(),
        port: d.port,
        srt,
        live: if d.liveness { "yes".into() } else { "no".into() },
        updated: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

pub async fn handle(ctx: &Context, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client()?;

    let entries = match args.address.as_deref() {
        Some(address) => client.fetch_by_address(address).await,
        None => client.fetch_snapshot().await,
    }
    .map_err(|e| CliError::from_api(e, &ctx.server_url))?;

    let color = output::should_color(&global.color);
    let rendered = output::render_list(
        &global.output,
        &entries,
        |e| to_row(e, color),
        |e| e.data.identity.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
