use crate::contents::Locale;
use anyhow::{anyhow, Result};
use serenity::all::GatewayIntents;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/sucrose/config.toml";

/// Bot configuration
#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub paths: Paths,
    pub commands: Commands,
    pub events: Events,
    pub logging: Logging,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    pub discord_token: String,
    /// Gateway intents bitmask
    pub intents: u64,
    pub bot_owners: Vec<String>,
    pub locale: Locale,
}

impl Default for General {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            intents: 14319,
            bot_owners: Vec::new(),
            locale: Locale::default(),
        }
    }
}

/// Where the handler tree lives.  `production` picks `compiled` over `development`.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Paths {
    pub production: bool,
    pub development: PathBuf,
    pub compiled: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            production: false,
            development: PathBuf::from("bot"),
            compiled: PathBuf::from("dist"),
        }
    }
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Commands {
    /// Reset and recreate every loaded scope once the client is ready
    pub register_on_ready: bool,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Events {
    pub ignore: Vec<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Logging {
    pub directory: PathBuf,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("_logs"),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut config = Self::parse(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;
        config.apply_env();

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// `SUCROSE_TOKEN` and `PROD` win over the file
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("SUCROSE_TOKEN") {
            self.general.discord_token = token;
        }
        if let Ok(prod) = std::env::var("PROD") {
            self.paths.production = prod == "true";
        }
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }

    /// Root of the handler tree for the current execution mode
    pub fn root(&self) -> &Path {
        if self.paths.production {
            &self.paths.compiled
        } else {
            &self.paths.development
        }
    }

    pub fn intents(&self) -> GatewayIntents {
        GatewayIntents::from_bits_truncate(self.general.intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.general.intents, 14319);
        assert_eq!(cfg.root(), Path::new("bot"));
        assert_eq!(cfg.logging.directory, PathBuf::from("_logs"));
        assert!(!cfg.commands.register_on_ready);
    }

    #[test]
    fn production_flag_selects_compiled_tree() {
        let cfg = Config::parse(
            r#"
            [general]
            discord_token = "abc"
            locale = "fr"

            [paths]
            production = true
            compiled = "out"

            [events]
            ignore = ["message"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.general.discord_token, "abc");
        assert_eq!(cfg.general.locale, Locale::Fr);
        assert_eq!(cfg.root(), Path::new("out"));
        assert_eq!(cfg.events.ignore, vec!["message".to_owned()]);
    }

    #[test]
    fn intents_keep_known_bits() {
        let cfg = Config::default();
        assert!(cfg.intents().contains(GatewayIntents::GUILDS));
        assert!(cfg.intents().contains(GatewayIntents::GUILD_MESSAGES));
    }
}
