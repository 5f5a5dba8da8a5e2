//! Command execution. Each command prints one JSON document.

use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, bail};
use serde::Serialize;
use serde_json::{Value, json};
use stint_core::record::{Payload, RecordId};
use stint_remote::HttpRemote;
use stint_sync::SyncContext;

use crate::{Command, Engine};

pub async fn run(
  engine: &Engine,
  remote: Arc<HttpRemote>,
  ctx: &SyncContext,
  command: Command,
  interval: Duration,
) -> anyhow::Result<()> {
  match command {
    Command::Add { kind, json, fields } => {
      let payload = build_payload(json.as_deref(), fields)?;
      let outcome = engine.add_record(ctx, kind, payload).await?;
      if outcome.offline {
        eprintln!("Saved offline. Will sync when online.");
      }
      print(&outcome)
    }
    Command::List { kind } => print(&engine.get_records(ctx, kind).await?),
    Command::Remove { kind, id } => {
      let id = RecordId::from(id);
      engine.remove_record(ctx, kind, &id).await?;
      print(&json!({ "removed": id }))
    }
    Command::Reset { kind } => {
      let deleted = engine.reset_kind(ctx, kind).await?;
      print(&json!({ "deleted": deleted }))
    }
    Command::Pending { kind } => print(&engine.pending(ctx, kind).await?),
    Command::Sync => print(&engine.reconcile(ctx).await?),
    Command::Watch { interval: secs } => {
      let interval = secs.map_or(interval, Duration::from_secs);
      watch(engine, remote, ctx.clone(), interval).await
    }
  }
}

/// Ping the remote store until interrupted, reconciling on every reconnect.
async fn watch(
  engine: &Engine,
  remote: Arc<HttpRemote>,
  ctx: SyncContext,
  interval: Duration,
) -> anyhow::Result<()> {
  if ctx.owner().is_none() {
    bail!("watch needs an owner (--owner or `owner` in the config file)");
  }

  let transitions = engine.connectivity().subscribe();
  let reconciler  = engine.spawn_reconciler(move || ctx.clone(), transitions);
  let heartbeat   = engine.connectivity().spawn_heartbeat(remote, interval);

  tracing::info!(online = engine.connectivity().is_online(), "watching for connectivity changes");
  tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

  heartbeat.abort();
  reconciler.abort();
  Ok(())
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn build_payload(json: Option<&str>, fields: Vec<(String, Value)>) -> anyhow::Result<Payload> {
  let mut payload = match json {
    Some(raw) => {
      let value: Value = serde_json::from_str(raw).context("parsing --json")?;
      Payload::from_value(value).context("--json must be an object")?
    }
    None => Payload::new(),
  };
  for (key, value) in fields {
    payload.insert(key, value);
  }
  if payload.is_empty() {
    bail!("nothing to record; pass --json or --field");
  }
  Ok(payload)
}

/// `key=value`; the value is JSON if it parses as JSON, a string otherwise.
pub fn parse_field(raw: &str) -> Result<(String, Value), String> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
  if key.is_empty() {
    return Err(format!("empty key in {raw:?}"));
  }
  let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
  Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fields_are_json_when_possible() {
    assert_eq!(parse_field("minutes=30").unwrap(), ("minutes".to_string(), json!(30)));
    assert_eq!(parse_field("title=Evidence").unwrap(), ("title".to_string(), json!("Evidence")));
    assert_eq!(parse_field("notes=").unwrap(), ("notes".to_string(), json!("")));
    assert_eq!(parse_field("a=b=c").unwrap(), ("a".to_string(), json!("b=c")));
    assert!(parse_field("minutes").is_err());
    assert!(parse_field("=30").is_err());
  }

  #[test]
  fn fields_override_json() {
    let payload = build_payload(
      Some(r#"{"artist":"Monk","title":"Evidence"}"#),
      vec![("title".to_string(), json!("Epistrophy"))],
    )
    .unwrap();
    assert_eq!(payload.get("artist"), Some(&json!("Monk")));
    assert_eq!(payload.get("title"), Some(&json!("Epistrophy")));
  }

  #[test]
  fn refuses_empty_or_non_object_payloads() {
    assert!(build_payload(None, Vec::new()).is_err());
    assert!(build_payload(Some("[1, 2]"), Vec::new()).is_err());
  }
}
