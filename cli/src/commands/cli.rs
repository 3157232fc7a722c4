use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pstate", version, about = "Inspect page-state URL tokens and stored state")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ./page_state.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct EncodeArgs {
    /// Value as JSON; tagged envelopes are accepted for sets, tuples and dates.
    pub value: String,

    /// Query-parameter key used in error messages.
    #[arg(long, default_value = "value")]
    pub key: String,

    /// Value-map entry `INTERNAL=EXTERNAL`, INTERNAL given as JSON.
    /// Can be specified multiple times.
    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub map: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DecodeArgs {
    /// Raw query-parameter value.
    pub raw: String,

    /// Declared type, e.g. `int`, `date`, `list[str]`, `set[int]`.
    #[arg(long = "type", default_value = "str")]
    pub ty: String,

    #[arg(long, default_value = "value")]
    pub key: String,

    #[arg(long = "map", action = clap::ArgAction::Append)]
    pub map: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InspectArgs {
    /// File holding one stored class payload.
    #[arg(group = "input")]
    pub path: Option<PathBuf>,

    #[arg(long, group = "input")]
    pub stdin: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DemoArgs {
    /// Identity for the second pass; differs from the first to show a switch.
    #[arg(long)]
    pub switch_to: Option<String>,

    /// Initial query string, e.g. `status=archived&page=3`.
    #[arg(long, default_value = "")]
    pub url: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode a value the way it is written into the URL.
    Encode(EncodeArgs),
    /// Decode a query-parameter value into a typed value.
    Decode(DecodeArgs),
    /// Pretty-print a stored class payload.
    Inspect(InspectArgs),
    /// Run scripted page passes against an in-memory store.
    Demo(DemoArgs),
}
