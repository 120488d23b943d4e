// Operator configuration for the grading harness
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use codegrade_common::config::{DEFAULT_INTERPRETER, DEFAULT_PAYLOAD_ENV};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How numbers are compared when matching actual against expected output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NumericEquality {
    /// `5` and `5.0` are different outputs
    #[default]
    Strict,
    /// Floats with an integral value compare equal to the integer
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Grade one payload of submitted code and print a single JSON verdict line.
///
/// The grading mode comes from the payload itself; these flags only tune
/// where the payload is read from and how the interpreter is launched.
#[derive(Debug, Parser)]
#[command(name = "codegrade", version)]
#[command(
    about = "Run submitted code against test cases and print one JSON verdict",
    long_about = None
)]
pub struct Args {
    /// Environment variable holding the base64-encoded payload
    #[arg(long, env = "CODEGRADE_PAYLOAD_ENV", default_value = DEFAULT_PAYLOAD_ENV)]
    pub payload_env: String,

    /// Read the base64-encoded payload from this file instead
    #[arg(long, env = "CODEGRADE_PAYLOAD_FILE")]
    pub payload_file: Option<PathBuf>,

    /// Interpreter command used to run submitted code
    #[arg(long, env = "CODEGRADE_INTERPRETER", default_value = DEFAULT_INTERPRETER)]
    pub interpreter: String,

    /// JSON file with `{ "command": ..., "args": [...] }` overriding --interpreter
    #[arg(long, env = "CODEGRADE_INTERPRETER_CONFIG")]
    pub interpreter_config: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        env = "CODEGRADE_NUMERIC_EQUALITY",
        default_value_t = NumericEquality::Strict
    )]
    pub numeric_equality: NumericEquality,

    #[arg(long, value_enum, env = "CODEGRADE_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Args {
    /// Resolve the interpreter to launch, preferring the config file
    pub fn interpreter(&self) -> Result<InterpreterConfig> {
        match &self.interpreter_config {
            Some(path) => InterpreterConfig::load(path),
            None => InterpreterConfig::new(&self.interpreter, Vec::new()),
        }
    }

    /// Raw (still encoded) payload text
    pub fn read_payload(&self) -> Result<String> {
        if let Some(path) = &self.payload_file {
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read payload file {}", path.display()));
        }

        std::env::var(&self.payload_env)
            .with_context(|| format!("Payload variable `{}` is not set", self.payload_env))
    }

    /// Environment variables through which submitted code could find the payload
    pub fn payload_variables(&self) -> Vec<String> {
        vec![self.payload_env.clone(), "CODEGRADE_PAYLOAD_FILE".to_string()]
    }
}

/// Interpreter launch line: `<command> <args...> -c <bootstrap>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl InterpreterConfig {
    pub fn new(command: &str, args: Vec<String>) -> Result<Self> {
        if command.trim().is_empty() {
            bail!("Interpreter command cannot be empty");
        }
        Ok(Self {
            command: command.to_string(),
            args,
        })
    }

    /// Load an interpreter definition from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Interpreter config file not found: {}", config_path.display());
        }

        let content =
            fs::read_to_string(config_path).context("Failed to read interpreter config")?;

        let config: InterpreterConfig =
            serde_json::from_str(&content).context("Failed to parse interpreter config")?;

        Self::new(&config.command, config.args)
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_INTERPRETER.to_string(),
            args: Vec::new(),
        }
    }
}
