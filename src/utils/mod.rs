use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use directories::{ProjectDirs, UserDirs};
use policyangel_config::ConfigPath;
use rustix::time::{clock_gettime, ClockId};

pub mod id;

pub fn version() -> String {
    String::from(env!("CARGO_PKG_VERSION"))
}

pub fn get_monotonic_time() -> Duration {
    let ts = clock_gettime(ClockId::Monotonic);
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

pub fn expand_home(path: &Path) -> anyhow::Result<Option<PathBuf>> {
    if let Ok(rest) = path.strip_prefix("~") {
        let dirs = UserDirs::new().context("error retrieving home directory")?;
        Ok(Some([dirs.home_dir(), rest].iter().collect()))
    } else {
        Ok(None)
    }
}

/// Resolves where the config is loaded from.
///
/// The command line argument takes precedence over `POLICYANGEL_CARDS_CONFIG`, which takes
/// precedence over the user and system config directories.
pub fn config_path(cli_path: Option<PathBuf>) -> anyhow::Result<ConfigPath> {
    let explicit = cli_path.or_else(|| {
        env::var_os("POLICYANGEL_CARDS_CONFIG")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    });

    if let Some(path) = explicit {
        let path = expand_home(&path)?.unwrap_or(path);
        return Ok(ConfigPath::Explicit(path));
    }

    let user_path = ProjectDirs::from("", "", "policyangel")
        .context("error retrieving home directory")?
        .config_dir()
        .join("cards.kdl");
    let system_path = PathBuf::from("/etc/policyangel/cards.kdl");

    Ok(ConfigPath::Regular {
        user_path,
        system_path,
    })
}
