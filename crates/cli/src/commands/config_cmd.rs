//! `blotter config` — Show the effective configuration.

use blotter_config::AppConfig;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    // Debug output redacts the API key.
    println!("{config:#?}");
    Ok(())
}
