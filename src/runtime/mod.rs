//! Host functions backing the native classes, called from compiled queries.
//!
//! Every native method `m` of a class tagged `[Native("n")]` is bound to the
//! symbol `eql_n_m` (method name in snake case). Handles are raw pointers to
//! the Rust values below; the caller keeps them alive for the whole call.

pub mod map;
pub mod path;

pub use map::{AggregateMap, EntryLayout};
pub use path::{Event, EventCursor, EventPath, PathError};

/// Runtime symbol bound to `method` of the native class `native`.
pub fn native_symbol(native: &str, method: &str) -> String {
    let mut symbol = format!("eql_{native}_");
    for (i, c) in method.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                symbol.push('_');
            }
            symbol.push(c.to_ascii_lowercase());
        } else {
            symbol.push(c);
        }
    }
    symbol
}

/// Name and address of every runtime function, for registration with the JIT.
pub fn symbols() -> Vec<(&'static str, *const u8)> {
    vec![
        ("eql_path_events", eql_path_events as *const u8),
        ("eql_path_object_id", eql_path_object_id as *const u8),
        ("eql_cursor_eof", eql_cursor_eof as *const u8),
        ("eql_cursor_next", eql_cursor_next as *const u8),
        ("eql_map_get", eql_map_get as *const u8),
        ("eql_map_count", eql_map_count as *const u8),
    ]
}

/// Opens a new cursor owned by `path`.
///
/// # Safety
/// `path` must point to a live `EventPath`.
pub unsafe extern "C" fn eql_path_events(path: *mut EventPath) -> *mut EventCursor {
    let path = unsafe { &mut *path };
    path.events()
}

/// # Safety
/// `path` must point to a live `EventPath`.
pub unsafe extern "C" fn eql_path_object_id(path: *mut EventPath) -> i64 {
    unsafe { (*path).object_id }
}

/// # Safety
/// `cursor` must point to a live `EventCursor`.
pub unsafe extern "C" fn eql_cursor_eof(cursor: *mut EventCursor) -> i8 {
    let cursor = unsafe { &mut *cursor };
    i8::from(cursor.eof())
}

/// # Safety
/// `cursor` must point to a live `EventCursor` and `event` to writable `Event` storage.
pub unsafe extern "C" fn eql_cursor_next(cursor: *mut EventCursor, event: *mut Event) {
    let cursor = unsafe { &mut *cursor };
    let next = cursor.next_event();
    unsafe { event.write(next) };
}

/// # Safety
/// `map` must point to a live `AggregateMap` and `layout` to an `EntryLayout`.
pub unsafe extern "C" fn eql_map_get(map: *mut AggregateMap, key: i64, layout: *const EntryLayout) -> *mut i64 {
    let (map, layout) = unsafe { (&mut *map, *layout) };
    map.get_or_insert(key, layout).as_mut_ptr()
}

/// # Safety
/// `map` must point to a live `AggregateMap`.
pub unsafe extern "C" fn eql_map_count(map: *mut AggregateMap) -> i64 {
    let map = unsafe { &*map };
    map.len() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_are_snake_case() {
        assert_eq!(native_symbol("path", "objectId"), "eql_path_object_id");
        assert_eq!(native_symbol("cursor", "eof"), "eql_cursor_eof");
        assert_eq!(native_symbol("map", "get"), "eql_map_get");
    }

    #[test]
    fn every_symbol_is_registered() {
        let names: Vec<_> = symbols().into_iter().map(|(name, _)| name).collect();
        for name in [
            native_symbol("path", "events"),
            native_symbol("path", "objectId"),
            native_symbol("cursor", "eof"),
            native_symbol("cursor", "next"),
            native_symbol("map", "get"),
            native_symbol("map", "count"),
        ] {
            assert!(names.contains(&name.as_str()), "{name} is not registered");
        }
    }

    #[test]
    fn map_get_through_raw_pointers() {
        let mut map = AggregateMap::new();
        let layout = EntryLayout { slots: 2, key_slot: 0 };
        unsafe {
            let entry = eql_map_get(&mut map, 9, &layout);
            *entry.add(1) += 3;
            assert_eq!(eql_map_count(&mut map), 1);
        }
        assert_eq!(map.get(9), Some(&[9, 3][..]));
    }

    #[test]
    fn cursors_from_one_path_advance_independently() {
        let mut path = EventPath::from_bytes(b"\x01\x00\x00\x00\x14\x00\x00\x00\
                                               \x01\x05\x00\x00\x00\x00\x00\x00\x00\x03\x00\
                                               \x00\x06\x00\x00\x00\x00\x00\x00\x00")
        .unwrap();
        let mut event = Event::default();
        unsafe {
            let outer = eql_path_events(&mut path);
            eql_cursor_next(outer, &mut event);
            assert_eq!(event, Event { timestamp: 5, action_id: 3 });

            let inner = eql_path_events(&mut path);
            eql_cursor_next(inner, &mut event);
            assert_eq!(event.timestamp, 5);
            eql_cursor_next(inner, &mut event);
            assert_eq!(event.timestamp, 6);
            assert_eq!(eql_cursor_eof(inner), 1);

            assert_eq!(eql_cursor_eof(outer), 0);
            eql_cursor_next(outer, &mut event);
            assert_eq!(event, Event { timestamp: 6, action_id: 0 });
        }
    }
}
