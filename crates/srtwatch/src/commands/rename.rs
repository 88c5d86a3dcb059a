//! `srtwatch rename` -- change a device identity in place.

use crate::cli::{GlobalOpts, RenameArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: RenameArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = ctx.client()?;
    client
        .rename_device(&args.old_name, &args.new_name)
        .await
        .map_err(|e| CliError::from_api(e, &ctx.server_url))?;

    output::print_output(
        &format!("renamed '{}' -> '{}'", args.old_name, args.new_name),
        global.quiet,
    );
    Ok(())
}
