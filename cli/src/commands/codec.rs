use anyhow::Context;
use page_state_core::api::{self as core_api, TypeDescriptor, ValueMap};

use crate::commands::cli::{DecodeArgs, EncodeArgs};

pub fn handle_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let value = core_api::parse_value(&args.value)?;
    let map = parse_value_map(&args.map)?;
    let token = core_api::encode(&args.key, &value, map.as_ref())?;
    println!("{token}");
    Ok(())
}

pub fn handle_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let ty: TypeDescriptor = args
        .ty
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .with_context(|| format!("invalid --type '{}'", args.ty))?;
    let map = parse_value_map(&args.map)?;
    let value = core_api::decode(&args.key, &args.raw, &ty, map.as_ref())
        .map_err(core_api::PageStateError::from)?;
    println!("{}", core_api::render_value(&value)?);
    Ok(())
}

/// Parses repeated `INTERNAL=EXTERNAL` flags; `None` when none were given.
pub fn parse_value_map(entries: &[String]) -> anyhow::Result<Option<ValueMap>> {
    if entries.is_empty() {
        return Ok(None);
    }
    let mut pairs = Vec::with_capacity(entries.len());
    for entry in entries {
        let (internal, external) = entry
            .split_once('=')
            .with_context(|| format!("--map expects INTERNAL=EXTERNAL, got '{entry}'"))?;
        let internal = core_api::parse_value(internal)
            .or_else(|_| core_api::parse_value(&format!("{internal:?}")))?;
        pairs.push((internal, external.to_string()));
    }
    Ok(Some(ValueMap::new(pairs)))
}
