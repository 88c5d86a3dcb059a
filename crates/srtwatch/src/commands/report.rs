//! `srtwatch report` -- one-shot status report submission.
//!
//! Handy for probes and smoke tests; production devices usually post
//! directly to the server.

use srtwatch_core::StatusReport;

use crate::cli::{GlobalOpts, ReportArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: ReportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let report = StatusReport {
        identity: args.name,
        local_address: args.address,
        public_address: args.public_address,
        streaming_state: args.streaming,
        port: args.port,
        liveness: Some(!args.down),
    };

    let client = ctx.client()?;
    let ack = client
        .submit_report(&report)
        .await
        .map_err(|e| CliError::from_api(e, &ctx.server_url))?;

    output::print_output(
        &format!("{} ({:?})", report.identity(), ack.action),
        global.quiet,
    );
    Ok(())
}
