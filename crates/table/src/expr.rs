//! Update-statement generation
//!
//! For backends that accept a textual statement form, an update is
//! generated from a structural diff between the old and new item: one
//! `SET path = value` or `REMOVE path` per changed leaf, walking maps and
//! lists recursively, or a single `list_append` when new elements only
//! extend a list's tail.
//!
//! Bytes and set-typed leaves are unsupported: a diff that would have to
//! write one fails with [`CodecError::UnsupportedType`] rather than
//! generate an incorrect statement. Unchanged unsupported leaves are left
//! alone.

use dynarow_codec::encode::render_attr_text;
use dynarow_core::{AttrValue, CodecError, CodecResult, Item};

/// One generated statement clause.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateStatement {
    /// `SET path = value`
    Set {
        /// Document path of the changed leaf
        path: String,
        /// New value to store
        value: AttrValue,
    },
    /// `REMOVE path`
    Remove {
        /// Document path of the removed leaf
        path: String,
    },
    /// `SET path = list_append(path, items)`
    ListAppend {
        /// Document path of the extended list
        path: String,
        /// Elements appended at the tail
        items: Vec<AttrValue>,
    },
}

impl UpdateStatement {
    /// Render this clause as statement text.
    pub fn render(&self) -> String {
        match self {
            UpdateStatement::Set { path, value } => {
                format!("SET {} = {}", path, render_attr_text(value))
            }
            UpdateStatement::Remove { path } => format!("REMOVE {}", path),
            UpdateStatement::ListAppend { path, items } => {
                let list = AttrValue::List(items.clone());
                format!("SET {} = list_append({}, {})", path, path, render_attr_text(&list))
            }
        }
    }
}

/// Render a whole diff as one update expression.
///
/// `SET` clauses (including appends) are grouped first, `REMOVE` paths
/// after, matching the statement grammar.
pub fn render_update_expression(statements: &[UpdateStatement]) -> String {
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    for statement in statements {
        match statement {
            UpdateStatement::Set { path, value } => {
                sets.push(format!("{} = {}", path, render_attr_text(value)));
            }
            UpdateStatement::ListAppend { path, items } => {
                let list = AttrValue::List(items.clone());
                sets.push(format!(
                    "{} = list_append({}, {})",
                    path,
                    path,
                    render_attr_text(&list)
                ));
            }
            UpdateStatement::Remove { path } => removes.push(path.clone()),
        }
    }

    let mut out = String::new();
    if !sets.is_empty() {
        out.push_str("SET ");
        out.push_str(&sets.join(", "));
    }
    if !removes.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("REMOVE ");
        out.push_str(&removes.join(", "));
    }
    out
}

/// Structural diff between two items, as statement clauses.
///
/// Statements come out in sorted path order so output is deterministic.
pub fn diff_items(old: &Item, new: &Item) -> CodecResult<Vec<UpdateStatement>> {
    let mut out = Vec::new();
    diff_maps("", old, new, &mut out)?;
    out.sort_by(|a, b| statement_path(a).cmp(statement_path(b)));
    Ok(out)
}

fn statement_path(statement: &UpdateStatement) -> &str {
    match statement {
        UpdateStatement::Set { path, .. }
        | UpdateStatement::Remove { path }
        | UpdateStatement::ListAppend { path, .. } => path,
    }
}

fn join_path(prefix: &str, attr: &str) -> String {
    if prefix.is_empty() {
        attr.to_string()
    } else {
        format!("{}.{}", prefix, attr)
    }
}

/// Reject any value that contains a bytes or set kind anywhere inside.
fn ensure_writable(value: &AttrValue) -> CodecResult<()> {
    if value.is_diff_unsupported() {
        return Err(CodecError::UnsupportedType {
            kind: value.type_name(),
        });
    }
    match value {
        AttrValue::List(items) => items.iter().try_for_each(ensure_writable),
        AttrValue::Map(entries) => entries.values().try_for_each(ensure_writable),
        _ => Ok(()),
    }
}

fn diff_maps(
    prefix: &str,
    old: &std::collections::HashMap<String, AttrValue>,
    new: &std::collections::HashMap<String, AttrValue>,
    out: &mut Vec<UpdateStatement>,
) -> CodecResult<()> {
    for (attr, new_value) in new {
        let path = join_path(prefix, attr);
        match old.get(attr) {
            Some(old_value) => diff_value(&path, old_value, new_value, out)?,
            None => {
                ensure_writable(new_value)?;
                out.push(UpdateStatement::Set {
                    path,
                    value: new_value.clone(),
                });
            }
        }
    }
    for attr in old.keys() {
        if !new.contains_key(attr) {
            out.push(UpdateStatement::Remove {
                path: join_path(prefix, attr),
            });
        }
    }
    Ok(())
}

fn diff_value(
    path: &str,
    old: &AttrValue,
    new: &AttrValue,
    out: &mut Vec<UpdateStatement>,
) -> CodecResult<()> {
    if old == new {
        return Ok(());
    }
    // A changed leaf involving an unsupported kind fails, whichever side
    // carries it.
    if old.is_diff_unsupported() {
        return Err(CodecError::UnsupportedType {
            kind: old.type_name(),
        });
    }
    match (old, new) {
        (AttrValue::Map(old_map), AttrValue::Map(new_map)) => {
            diff_maps(path, old_map, new_map, out)
        }
        (AttrValue::List(old_list), AttrValue::List(new_list)) => {
            diff_lists(path, old_list, new_list, out)
        }
        _ => {
            ensure_writable(new)?;
            out.push(UpdateStatement::Set {
                path: path.to_string(),
                value: new.clone(),
            });
            Ok(())
        }
    }
}

fn diff_lists(
    path: &str,
    old: &[AttrValue],
    new: &[AttrValue],
    out: &mut Vec<UpdateStatement>,
) -> CodecResult<()> {
    if new.len() > old.len() && new[..old.len()] == *old {
        // New elements only appended at the tail: one append statement.
        let tail = new[old.len()..].to_vec();
        tail.iter().try_for_each(ensure_writable)?;
        out.push(UpdateStatement::ListAppend {
            path: path.to_string(),
            items: tail,
        });
        Ok(())
    } else if new.len() == old.len() {
        for (index, (old_item, new_item)) in old.iter().zip(new).enumerate() {
            diff_value(&format!("{}[{}]", path, index), old_item, new_item, out)?;
        }
        Ok(())
    } else {
        // Shrunk or rewritten: replace the whole list.
        let value = AttrValue::List(new.to_vec());
        ensure_writable(&value)?;
        out.push(UpdateStatement::Set {
            path: path.to_string(),
            value,
        });
        Ok(())
    }
}
