//! Operation classification by naming convention.

use serde::Serialize;

/// The lifecycle role an operation plays for its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OpType {
    /// Creates one resource.
    Create,
    /// Reads one resource.
    Get,
    /// Reads many resources.
    List,
    /// Modifies one resource.
    Update,
    /// Deletes one resource.
    Delete,
    /// Reads the attribute map of one resource.
    GetAttributes,
    /// Writes the attribute map of one resource.
    SetAttributes,
}

impl OpType {
    /// Classify an operation name, returning its type and resource name.
    ///
    /// Returns `None` for names that follow none of the conventions.
    #[must_use]
    pub fn classify(op_name: &str) -> Option<(Self, String)> {
        if let Some(rest) = op_name.strip_prefix("Create") {
            return non_empty(rest).map(|r| (Self::Create, singularize(r)));
        }
        if let Some(rest) = op_name.strip_prefix("Get") {
            if let Some(resource) = rest.strip_suffix("Attributes") {
                return non_empty(resource).map(|r| (Self::GetAttributes, r.to_owned()));
            }
            return non_empty(rest).map(|r| (Self::Get, r.to_owned()));
        }
        if let Some(rest) = op_name.strip_prefix("Set") {
            if let Some(resource) = rest.strip_suffix("Attributes") {
                return non_empty(resource).map(|r| (Self::SetAttributes, r.to_owned()));
            }
            return None;
        }
        if let Some(rest) = op_name.strip_prefix("Describe") {
            let rest = non_empty(rest)?;
            let singular = singularize(rest);
            let op_type = if singular == rest { Self::Get } else { Self::List };
            return Some((op_type, singular));
        }
        if let Some(rest) = op_name.strip_prefix("List") {
            return non_empty(rest).map(|r| (Self::List, singularize(r)));
        }
        if let Some(rest) = op_name
            .strip_prefix("Update")
            .or_else(|| op_name.strip_prefix("Modify"))
        {
            return non_empty(rest).map(|r| (Self::Update, singularize(r)));
        }
        if let Some(rest) = op_name.strip_prefix("Delete") {
            return non_empty(rest).map(|r| (Self::Delete, singularize(r)));
        }
        None
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Naive English singularization of a resource name.
#[must_use]
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if name.ends_with("ss") || name.ends_with("us") || name.ends_with("Status") {
        return name.to_owned();
    }
    name.strip_suffix('s').unwrap_or(name).to_owned()
}
