use serde_json::Value;

/// Recursively merge `src` into `dest`, returning `dest`.
///
/// Where both sides hold an object under the same key, the objects are merged key by key.
/// Anything else in `src` (scalars, arrays, `null`, or an object replacing a non-object)
/// overwrites what `dest` had. Keys only present in `dest` are left alone, so a merge can add and
/// replace but never remove a key.
///
/// This is how a proposed change is laid over a freshly fetched document before the whole
/// document is sent back with a PUT.
pub fn merge<'a>(src: &Value, dest: &'a mut Value) -> &'a mut Value {
    match (src, &mut *dest) {
        (Value::Object(from), Value::Object(into)) => {
            for (key, value) in from {
                let both_objects = value.is_object()
                    && into.get(key).map(Value::is_object).unwrap_or(false);
                if !both_objects {
                    into.insert(key.clone(), value.clone());
                } else if let Some(existing) = into.get_mut(key) {
                    merge(value, existing);
                }
            }
        }
        (from, into) => *into = from.clone(),
    }
    dest
}

/// Like `merge`, but leaves `dest` untouched and returns the merged copy.
pub fn merged(src: &Value, dest: &Value) -> Value {
    let mut dest = dest.clone();
    merge(src, &mut dest);
    dest
}
