use std::io::Read;

use anyhow::Context;
use page_state_core::api as core_api;

use crate::commands::cli::InspectArgs;

pub fn handle_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let raw = match &args.path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let fields = core_api::deserialize_state(raw.trim())?;
    if fields.is_empty() {
        println!("(no fields)");
        return Ok(());
    }
    let width = fields.keys().map(String::len).max().unwrap_or(0);
    for (name, value) in &fields {
        println!("{name:<width$}  {:<8}  {value}", value.kind_name());
    }
    Ok(())
}
