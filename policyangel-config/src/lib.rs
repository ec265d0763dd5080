#[macro_use]
extern crate tracing;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use miette::{Context as _, IntoDiagnostic as _};

#[macro_use]
mod macros;

pub mod animations;
pub mod card_stack;
pub mod utils;

pub use crate::animations::{Animation, Animations, Curve};
pub use crate::card_stack::{CardStack, NamedCardStack};
pub use crate::utils::FloatOrInt;
use crate::animations::AnimationsPart;
use crate::card_stack::CardStackPart;
use crate::utils::MergeWith;

/// Name of the deck on the dashboard action cards screen.
pub const ACTION_CARDS: &str = "action-cards";
/// Name of the deck on the stacked carousel screen.
pub const STACKED_CAROUSEL: &str = "stacked-carousel";

const DEFAULT_CONFIG: &str = include_str!("../../resources/default-config.kdl");

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub animations: Animations,
    pub card_stacks: Vec<NamedCardStack>,
}

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct ConfigPart {
    #[knuffel(child)]
    pub animations: Option<AnimationsPart>,
    #[knuffel(children(name = "card-stack"))]
    pub card_stacks: Vec<CardStackPart>,
}

#[derive(Debug, Clone)]
pub enum ConfigPath {
    /// Explicitly set config path.
    ///
    /// Load the config only from this path, never create it.
    Explicit(PathBuf),

    /// Default config path.
    ///
    /// Prioritize the user path, fallback to the system path, fallback to creating the user path.
    Regular {
        /// User config path, usually `$XDG_CONFIG_HOME/policyangel/cards.kdl`.
        user_path: PathBuf,
        /// System config path, usually `/etc/policyangel/cards.kdl`.
        system_path: PathBuf,
    },
}

impl Default for Config {
    fn default() -> Self {
        let stack = |name: &str| NamedCardStack {
            name: String::from(name),
            stack: CardStack::default(),
        };

        Self {
            animations: Animations::default(),
            card_stacks: vec![stack(ACTION_CARDS), stack(STACKED_CAROUSEL)],
        }
    }
}

impl MergeWith<ConfigPart> for Config {
    fn merge_with(&mut self, part: &ConfigPart) {
        merge!((self, part), animations);

        // Repeated blocks for the same deck layer on top of each other.
        for stack_part in &part.card_stacks {
            match self
                .card_stacks
                .iter_mut()
                .find(|named| named.name == stack_part.name)
            {
                Some(named) => named.stack.merge_with(stack_part),
                None => self.card_stacks.push(NamedCardStack {
                    name: stack_part.name.clone(),
                    stack: CardStack::from_part(stack_part),
                }),
            }
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("cards.kdl"),
            &contents,
        )
        .context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        let part: ConfigPart = knuffel::parse(filename, text)?;
        Ok(Self::from_part(&part))
    }

    /// Returns the settings of the named deck.
    ///
    /// Decks without a configuration block use the default settings.
    pub fn card_stack(&self, name: &str) -> CardStack {
        self.card_stacks
            .iter()
            .find(|named| named.name == name)
            .map(|named| named.stack)
            .unwrap_or_default()
    }

    /// Returns the text of the built-in configuration.
    pub fn default_text() -> &'static str {
        DEFAULT_CONFIG
    }
}

impl ConfigPath {
    /// Returns the file the config is read from.
    ///
    /// A regular path prefers the user file over the system file, and fails if neither exists.
    pub fn resolve(&self) -> miette::Result<&Path> {
        match self {
            ConfigPath::Explicit(path) => Ok(path),
            ConfigPath::Regular {
                user_path,
                system_path,
            } => {
                if user_path.exists() {
                    Ok(user_path)
                } else if system_path.exists() {
                    Ok(system_path)
                } else {
                    Err(miette::miette!(
                        "no config file found; create one at {user_path:?} or {system_path:?}",
                    ))
                }
            }
        }
    }

    /// Loads the config, returns an error if it doesn't exist.
    pub fn load(&self) -> miette::Result<Config> {
        let _span = tracy_client::span!("ConfigPath::load");

        let path = self.resolve()?;
        Config::load(path).context("error loading config")
    }
}
