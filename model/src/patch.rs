use crate::error::{self, Result};
use json_patch::{Patch, PatchOperation, RemoveOperation};
use serde_json::Value;
use snafu::ResultExt;

/// Remove every JSON pointer in `pointers` that exists in `document`; missing ones are skipped.
///
/// Pointers are removed in order, so a pointer nested under one removed earlier is simply missing
/// by the time it is reached.
pub fn remove_pointers<I, S>(document: &mut Value, pointers: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for pointer in pointers {
        let pointer = pointer.as_ref();
        if document.pointer(pointer).is_none() {
            continue;
        }
        let removal = Patch(vec![PatchOperation::Remove(RemoveOperation {
            path: pointer.to_string(),
        })]);
        json_patch::patch(document, &removal).context(error::JsonPatchSnafu)?;
    }
    Ok(())
}
