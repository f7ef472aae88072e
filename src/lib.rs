pub mod action;
pub mod error;
pub mod form;
pub mod leaf;
pub mod merge;
pub mod navigator;
pub mod parser;
pub mod path;
pub mod settings;
pub mod tree;

use action::SharedStore;
use serde_json::Value;

pub use action::{UpdateVariable, UpdateVariableSettings, VariableStore};
pub use error::{ActionError, PathError};
pub use leaf::LeafOp;
pub use merge::{deep_assign, deep_assign_path};
pub use path::{Key, Path};

// ── WASM FFI ────────────────────────────────────────────────────────

/// Allocate `len` bytes in WASM memory, returning a pointer (null if `len`
/// is not a valid allocation size).
/// The caller must free the returned pointer with `dealloc(ptr, len)`.
#[no_mangle]
pub extern "C" fn alloc(len: usize) -> *mut u8 {
    match std::alloc::Layout::from_size_align(len.max(1), 1) {
        Ok(layout) => unsafe { std::alloc::alloc(layout) },
        Err(_) => std::ptr::null_mut(),
    }
}

/// Free a buffer previously returned by `alloc` or by any of the
/// `wasm_*` functions. For null-terminated strings returned by those
/// functions, pass `strlen(ptr) + 1` as `len`.
#[no_mangle]
pub unsafe extern "C" fn dealloc(ptr: *mut u8, len: usize) {
    if let Ok(layout) = std::alloc::Layout::from_size_align(len.max(1), 1) {
        unsafe { std::alloc::dealloc(ptr, layout) };
    }
}

// ── Store handles ───────────────────────────────────────────────────

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

// WASM is single-threaded, so thread_local is just a convenient safe wrapper.
thread_local! {
    static STORES: RefCell<HashMap<u32, SharedStore>> = RefCell::new(HashMap::new());
    static NEXT_STORE_ID: Cell<u32> = const { Cell::new(1) };
}

fn store_handle(id: u32) -> Option<SharedStore> {
    STORES.with(|s| s.borrow().get(&id).cloned())
}

fn next_id() -> u32 {
    NEXT_STORE_ID.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}

/// Create a new, empty variable store. Returns its handle.
#[no_mangle]
pub extern "C" fn wasm_store_new() -> u32 {
    let id = next_id();
    STORES.with(|s| s.borrow_mut().insert(id, VariableStore::new().shared()));
    id
}

/// Run the update-variable action against a store. `payload` is the
/// settings JSON (`{"dataElementId", "data", "transforms"}`) and `event`
/// the triggering event JSON (may be empty).
/// Returns a pointer to a null-terminated JSON array of errors.
#[no_mangle]
pub unsafe extern "C" fn wasm_store_update(
    id: u32,
    payload_ptr: *const u8,
    payload_len: usize,
    event_ptr: *const u8,
    event_len: usize,
) -> *const u8 {
    let store = match store_handle(id) {
        Some(store) => store,
        None => return string_to_c_ptr(unknown_store_json(id)),
    };
    let result = unsafe { read_str(payload_ptr, payload_len) }
        .and_then(UpdateVariableSettings::from_json)
        .and_then(|settings| {
            let event = match unsafe { read_str(event_ptr, event_len) }? {
                "" => Value::Null,
                text => serde_json::from_str(text)?,
            };
            UpdateVariable::new(store).run(&settings, &event)
        });
    let errors: Vec<ActionError> = result.err().into_iter().collect();
    string_to_c_ptr(errors_to_json(&errors))
}

/// Replace a store's contents with the entries of a JSON object.
/// Returns a pointer to a null-terminated JSON array of errors.
#[no_mangle]
pub unsafe extern "C" fn wasm_store_load(id: u32, json_ptr: *const u8, json_len: usize) -> *const u8 {
    let store = match store_handle(id) {
        Some(store) => store,
        None => return string_to_c_ptr(unknown_store_json(id)),
    };
    let loaded = unsafe { read_str(json_ptr, json_len) }
        .and_then(|text| Ok(serde_json::from_str::<VariableStore>(text)?));
    match loaded {
        Ok(values) => {
            *store.borrow_mut() = values;
            string_to_c_ptr("[]".to_string())
        }
        Err(err) => string_to_c_ptr(errors_to_json(&[err])),
    }
}

/// Serialize one entry of a store to JSON (`null` if absent).
#[no_mangle]
pub unsafe extern "C" fn wasm_store_get(id: u32, key_ptr: *const u8, key_len: usize) -> *const u8 {
    let json = match (store_handle(id), unsafe { read_str(key_ptr, key_len) }) {
        (Some(store), Ok(key)) => {
            let json = store
                .borrow()
                .get(key)
                .map_or_else(|| "null".to_string(), Value::to_string);
            json
        }
        _ => "null".to_string(),
    };
    string_to_c_ptr(json)
}

/// Serialize a whole store to JSON (`{}` for an unknown handle).
#[no_mangle]
pub extern "C" fn wasm_store_snapshot(id: u32) -> *const u8 {
    let json = match store_handle(id) {
        Some(store) => {
            let json = serde_json::to_string(&*store.borrow()).unwrap_or_else(|_| "{}".to_string());
            json
        }
        None => "{}".to_string(),
    };
    string_to_c_ptr(json)
}

/// Free a store handle, dropping its values.
#[no_mangle]
pub extern "C" fn wasm_store_free(id: u32) {
    STORES.with(|s| s.borrow_mut().remove(&id));
}

/// Borrow `len` bytes at `ptr` as UTF-8. A null or empty buffer is "".
unsafe fn read_str<'a>(ptr: *const u8, len: usize) -> Result<&'a str, ActionError> {
    if ptr.is_null() || len == 0 {
        return Ok("");
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    std::str::from_utf8(bytes).map_err(|err| {
        ActionError::Settings(serde::de::Error::custom(format!("payload is not UTF-8: {}", err)))
    })
}

fn unknown_store_json(id: u32) -> String {
    serde_json::json!([{
        "code": "unknown-store",
        "message": format!("no variable store with handle {}", id),
    }])
    .to_string()
}

/// `[{"code", "message", "path"?, "offset"?}]`
pub fn errors_to_json(errors: &[ActionError]) -> String {
    let entries: Vec<Value> = errors
        .iter()
        .map(|err| {
            let mut entry = serde_json::json!({
                "code": err.code(),
                "message": err.to_string(),
            });
            if let ActionError::Path(path_err) = err {
                entry["path"] = Value::from(path_err.path());
                if let PathError::Parse { offset, .. } = path_err {
                    entry["offset"] = Value::from(*offset);
                }
            }
            entry
        })
        .collect();
    Value::Array(entries).to_string()
}

/// Convert a String to a null-terminated C pointer with exact allocation size.
/// The allocation size is exactly `s.len() + 1` bytes, so the caller can
/// free with `dealloc(ptr, strlen(ptr) + 1)`.
fn string_to_c_ptr(s: String) -> *const u8 {
    let mut bytes = s.into_bytes();
    bytes.push(0);
    // into_boxed_slice guarantees allocation size == bytes.len()
    let boxed = bytes.into_boxed_slice();
    Box::into_raw(boxed) as *mut u8
}
