//! `srtwatch remove` -- delete a device record by exact triple.

use crate::cli::{GlobalOpts, RemoveArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: RemoveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client()?;
    client
        .remove_device(&args.identity, &args.address, args.port)
        .await
        .map_err(|e| CliError::from_api(e, &ctx.server_url))?;

    output::print_output(
        &format!("removed '{}' ({}:{})", args.identity, args.address, args.port),
        global.quiet,
    );
    Ok(())
}
