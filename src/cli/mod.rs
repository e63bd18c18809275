//! CLI argument parsing and input handling

use std::{
    io::{self, Read},
    path::PathBuf,
};

use clap::{Args, Parser, Subcommand};

use crate::{
    error::Result,
    normalize::ChatInput,
    services::InvocationOptions,
};

/// Chat-model adapter: normalize agent input and invoke a chat backend
#[derive(Debug, Parser)]
#[command(name = "llm-adapter")]
#[command(about = "Normalize agent input and invoke a chat backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "LLM_ADAPTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send input to a backend and print the completion
    Invoke {
        #[command(flatten)]
        input: InputArgs,

        /// Backend profile name
        #[arg(short, long)]
        backend: Option<String>,

        /// Sampling temperature for this call
        #[arg(long)]
        temperature: Option<f32>,

        /// Output token limit for this call
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Print the conversation an input normalizes to, without calling a backend
    Normalize {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Look up a capability on the adapter (provider, model_name, temperature, ...)
    Probe {
        /// Capability name
        name: String,

        /// Backend profile name
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Show version information
    Version,
}

/// Input taken from the command line or stdin
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input text; read from stdin when omitted
    pub input: Option<String>,

    /// Parse the input as JSON and classify it by shape
    #[arg(long)]
    pub json: bool,
}

impl InputArgs {
    /// Resolve the input, reading stdin if no argument was given
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or `--json` input does not parse
    pub fn read(self) -> Result<ChatInput> {
        let raw = match self.input {
            Some(input) => input,
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        parse_input(raw, self.json)
    }
}

/// Turn raw CLI input into a [`ChatInput`]
///
/// # Errors
///
/// Returns [`AdapterError::Json`](crate::error::AdapterError::Json) when `json` is set and the input is not JSON
pub fn parse_input(raw: String, json: bool) -> Result<ChatInput> {
    if json {
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(ChatInput::from(value))
    } else {
        Ok(ChatInput::Text(raw))
    }
}

/// Per-call options from flags, if any flag was given
#[must_use]
pub fn options_from_flags(
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Option<InvocationOptions> {
    if temperature.is_none() && max_tokens.is_none() {
        return None;
    }
    Some(InvocationOptions {
        temperature,
        max_tokens,
        ..InvocationOptions::default()
    })
}

impl Cli {
    /// Parse CLI arguments from environment
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
