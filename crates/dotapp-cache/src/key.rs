//! Deterministic storage-key derivation.
//!
//! Every driver addresses its durable store through identifiers produced
//! here, so the rules must be stable within and across processes:
//!
//! - The context is rendered into a canonical textual form: objects are
//!   serialized with their keys in ascending byte order (recursively),
//!   arrays keep their order, scalars use compact JSON formatting. The
//!   walk is explicit and does not depend on how `serde_json` happens to
//!   order map entries.
//! - The derived identifier is the md5 hex digest of
//!   `prefix + key [+ ":" + canonicalContext] + instanceName`.
//! - The file backend additionally derives a display-safe file stem,
//!   `cache_<derivedId>_<sha256Prefix8>`: the full identifier keeps sweep
//!   operations able to map a unit back to its shadow entry, and the
//!   SHA-256 prefix guards against md5 collisions while staying short
//!   enough to read in a directory listing.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Leading marker of every file-backend storage unit.
pub const FILE_UNIT_PREFIX: &str = "cache_";

/// Extension of every file-backend storage unit.
pub const FILE_UNIT_EXT: &str = "cache";

/// Returns `true` when the context carries no distinguishing content.
///
/// `null`, `{}` and `[]` all mean "no context"; they derive the same
/// identifier as an omitted context.
#[must_use]
pub fn is_empty_context(context: &Value) -> bool {
    match context {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Renders the context into its canonical textual form.
///
/// Returns `None` for an empty context so callers can skip the `:` joiner.
#[must_use]
pub fn canonical_context(context: &Value) -> Option<String> {
    if is_empty_context(context) {
        return None;
    }
    let mut out = String::new();
    write_canonical(context, &mut out);
    Some(out)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// The combined pre-hash string shared by all derivations.
fn combined(prefix: &str, instance_name: &str, key: &str, context: &Value) -> String {
    let mut raw = String::with_capacity(prefix.len() + key.len() + instance_name.len());
    raw.push_str(prefix);
    raw.push_str(key);
    if let Some(canonical) = canonical_context(context) {
        raw.push(':');
        raw.push_str(&canonical);
    }
    raw.push_str(instance_name);
    raw
}

/// Derives the stable identifier for an entry.
///
/// Equal inputs always yield the same identifier; any difference in
/// context content yields a different one.
#[must_use]
pub fn derive_id(prefix: &str, instance_name: &str, key: &str, context: &Value) -> String {
    let raw = combined(prefix, instance_name, key, context);
    format!("{:x}", md5::compute(raw.as_bytes()))
}

/// Derives the file stem for an entry: `cache_<derivedId>_<sha256Prefix8>`.
#[must_use]
pub fn file_stem(prefix: &str, instance_name: &str, key: &str, context: &Value) -> String {
    let raw = combined(prefix, instance_name, key, context);
    let derived = format!("{:x}", md5::compute(raw.as_bytes()));
    let crypto = hex::encode(Sha256::digest(raw.as_bytes()));
    format!("{FILE_UNIT_PREFIX}{derived}_{}", &crypto[..8])
}

/// Extracts the derived identifier back out of a file stem.
///
/// Returns `None` for names that do not follow the storage-unit pattern.
#[must_use]
pub fn parse_file_stem(stem: &str) -> Option<&str> {
    let rest = stem.strip_prefix(FILE_UNIT_PREFIX)?;
    let (derived, crypto) = rest.rsplit_once('_')?;
    if derived.len() == 32 && crypto.len() == 8 {
        Some(derived)
    } else {
        None
    }
}

/// Durable key for the network backends:
/// `cache:<md5(folder)>:<instanceName>:<derivedId>`.
#[must_use]
pub fn entry_key(folder: &str, instance_name: &str, derived_id: &str) -> String {
    let folder_hash = format!("{:x}", md5::compute(folder.as_bytes()));
    format!("cache:{folder_hash}:{instance_name}:{derived_id}")
}

/// Redis membership-set key for namespace-scoped clearing:
/// `cache:folder:<md5(folder)>:<instanceName>:keys`.
#[must_use]
pub fn member_set_key(folder: &str, instance_name: &str) -> String {
    let folder_hash = format!("{:x}", md5::compute(folder.as_bytes()));
    format!("cache:folder:{folder_hash}:{instance_name}:keys")
}

/// Recovers the derived identifier from a durable entry key.
///
/// Used when clearing a namespace to purge the matching shadow entries.
#[must_use]
pub fn derived_id_of_entry_key(entry_key: &str) -> Option<&str> {
    entry_key.rsplit(':').next().filter(|id| id.len() == 32)
}
