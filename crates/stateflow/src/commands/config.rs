use colored::Colorize;
use stateflow_config::ConfigError;

pub fn handle() -> anyhow::Result<()> {
    match stateflow_config::find_config_file() {
        Ok(path) => {
            eprintln!("{} {}", "Loaded:".dimmed(), path.display());
            let settings = stateflow_config::load(&path)?;
            print!("{}", settings.to_yaml()?);
        }
        Err(ConfigError::ConfigFileNotFound) => {
            eprintln!("{}", "No configuration file found, showing built-in defaults".dimmed());
            print!("{}", stateflow_config::Settings::default().to_yaml()?);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
