//! Run the supervisor in the foreground

use anyhow::Result;
use cli_lib::daemon::{DaemonSettings, Supervisor};
use cli_lib::{system_config, util};
use std::path::Path;

pub async fn run(config_path: Option<&Path>, root: Option<&Path>, remote: Option<&str>) -> Result<()> {
    let config = system_config::load(config_path)?;
    let settings = DaemonSettings::resolve(&config, root, remote, util::state_dir()?)?;

    let mut supervisor = Supervisor::new(settings);
    supervisor.run().await?;
    Ok(())
}
