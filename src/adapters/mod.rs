// Adapters layer: concrete implementations for external systems (http, storage, URL list API).

pub mod http;
pub mod storage;
pub mod urllist_api;

#[cfg(test)]
pub(crate) mod fakes;
