//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(invsync_config::config_path);

    match args.command {
        ConfigCommand::Path => output::print_output(&path.display().to_string()),
        ConfigCommand::Show => {
            let config = invsync_config::read_config(Some(&path))
                .map_err(|e| CliError::from_config(e, &path))?;
            let rendered = config
                .to_toml_string()
                .map_err(|e| CliError::from_config(e, &path))?;
            output::print_output(rendered.trim_end());
        }
    }
    Ok(())
}
