// src/dispatch.rs
//
// Control message dispatcher: resolves inbound addresses to parameter slots
// through a static lookup table and writes clamped values into the buffer.
//
// Runs inline in the scheduler's drain phase, so it must stay cheap and
// perform no I/O. Unknown addresses are business as usual on this link (the
// sender emits routes the bridge does not track) and are dropped without
// logging.

use std::collections::HashMap;

use crate::io::IoError;
use crate::params::ParamVector;

/// Immutable address-to-slot lookup, built once at startup from the
/// configured parameter routes. Slot index is the route's position in the
/// configuration, matching the payload order on the wire.
pub struct AddressTable {
    map: HashMap<String, usize>,
}

impl AddressTable {
    pub fn from_routes<'a, I>(routes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let map = routes
            .into_iter()
            .enumerate()
            .map(|(index, route)| (route.to_string(), index))
            .collect();
        AddressTable { map }
    }

    pub fn resolve(&self, address: &str) -> Option<usize> {
        self.map.get(address).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Apply one inbound `(address, value)` update to the buffer.
///
/// A miss in the table returns `Ok` and mutates nothing. A hit clamps the
/// value and stores it; `InvalidSlot` can only surface if the table and the
/// vector were built from different configurations.
pub fn dispatch(
    table: &AddressTable,
    params: &mut ParamVector,
    address: &str,
    value: i32,
) -> Result<(), IoError> {
    match table.resolve(address) {
        Some(index) => params.set(index, value),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_setup() -> (AddressTable, ParamVector) {
        let routes = ["/out/brightness", "/out/radius", "/out/palette"];
        let table = AddressTable::from_routes(routes);
        let params = ParamVector::new(
            routes
                .iter()
                .map(|r| (r.trim_start_matches("/out/").to_string(), 0u8)),
        );
        (table, params)
    }

    #[test]
    fn test_resolve_order_matches_configuration() {
        let (table, _) = test_setup();
        assert_eq!(table.resolve("/out/brightness"), Some(0));
        assert_eq!(table.resolve("/out/palette"), Some(2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_dispatch_hit_clamps_and_stores() {
        let (table, mut params) = test_setup();
        dispatch(&table, &mut params, "/out/radius", 500).unwrap();
        assert_eq!(params.snapshot(), &[0, 253, 0]);
    }

    #[test]
    fn test_dispatch_unknown_address_is_silent_noop() {
        let (table, mut params) = test_setup();
        let before = params.snapshot().to_vec();
        dispatch(&table, &mut params, "/out/unmapped", 100).unwrap();
        dispatch(&table, &mut params, "", 1).unwrap();
        assert_eq!(params.snapshot(), before.as_slice());
    }

    #[test]
    fn test_dispatch_latest_value_wins() {
        let (table, mut params) = test_setup();
        dispatch(&table, &mut params, "/out/brightness", 10).unwrap();
        dispatch(&table, &mut params, "/out/brightness", 20).unwrap();
        assert_eq!(params.snapshot()[0], 20);
    }
}
