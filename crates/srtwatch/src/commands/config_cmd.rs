//! `srtwatch config` -- inspect and initialize the config file.

use srtwatch_config::{config_path, save_config, Config, ConfigError};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::context::Context;
use crate::error::CliError;
use crate::output;

pub fn handle(ctx: &Context, args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let path = config_path();
            if path.exists() {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("config file already exists at {}", path.display()),
                });
            }
            save_config(&Config::default())?;
            output::print_output(
                &format!("configuration written to {}", path.display()),
                global.quiet,
            );
        }

        ConfigCommand::Show => {
            let toml_text = toml::to_string_pretty(&ctx.config).map_err(ConfigError::from)?;
            let rendered = output::render_single(&global.output, &ctx.config, |_| {
                toml_text.trim_end().to_owned()
            });
            output::print_output(&rendered, global.quiet);
        }

        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
        }
    }

    Ok(())
}
