pub mod activity;
pub mod agent_call;
pub mod assessment;
pub mod course;
pub mod lesson;

#[cfg(test)]
pub(crate) mod test_utils;
