//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::effective_path(global);
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
        }
        ConfigCommand::Show => {
            let cfg = config::load_config(&path)?;
            let text = toml::to_string_pretty(&cfg)?;
            output::print_output(text.trim_end(), global.quiet);
        }
    }
    Ok(())
}
