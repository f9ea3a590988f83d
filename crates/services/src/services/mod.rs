pub mod call_log;
pub mod config;
pub mod events;
pub mod generation;
pub mod progression;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_utils;
