use crate::model::{Inventory, RunSpec};
use crate::query;
use crate::runner::error::{Diagnostics, ErrorCode, RunError, RunResult};
use crate::secrets::{validate_known_host, validate_private_key};
use std::collections::BTreeSet;
use std::path::{Component, Path};

/// Check every input that can be checked without touching the host.
pub fn validate_spec(spec: &RunSpec) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let mut key_names = BTreeSet::new();
    for key in &spec.private_keys {
        diagnostics.record(validate_private_key(key));
        if !key_names.insert(key.name.as_str()) {
            diagnostics.push_error(&RunError::validation(
                ErrorCode::PrivateKey,
                "private key names must be unique",
                serde_json::json!({"name": key.name}),
            ));
        }
    }

    for host in spec.known_hosts.iter().flatten() {
        diagnostics.record(validate_known_host(host));
    }

    for (name, query) in &spec.artifact_queries {
        if let Err(mut err) = query::validate(&query.filter) {
            if let Some(serde_json::Value::Object(context)) = err.context.as_mut() {
                context.insert("query".to_string(), serde_json::json!(name));
            }
            diagnostics.push_error(&err);
        }
    }

    validate_inventory_names(&spec.inventories, &mut diagnostics);
    validate_inventory_names(&spec.previous_inventories, &mut diagnostics);

    diagnostics
}

fn validate_inventory_names(inventories: &[Inventory], diagnostics: &mut Diagnostics) {
    let mut seen = BTreeSet::new();
    for inventory in inventories {
        diagnostics.record(check_file_name(&inventory.name));
        if !seen.insert(inventory.name.as_str()) {
            diagnostics.push_error(&RunError::validation(
                ErrorCode::InvalidName,
                "inventory names must be unique",
                serde_json::json!({"name": inventory.name}),
            ));
        }
    }
}

/// A name usable as a single file inside the run directory.
fn check_file_name(name: &str) -> RunResult<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(RunError::validation(
            ErrorCode::InvalidName,
            "inventory name must be a plain file name",
            serde_json::json!({"name": name}),
        )),
    }
}
