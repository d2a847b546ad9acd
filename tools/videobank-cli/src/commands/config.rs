//! Show or initialise the configuration file.

use videobank_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config.save()?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let path = config_file_path();
    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# {} (not present, showing defaults)", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
