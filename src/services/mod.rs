pub mod metadata_recorder;
pub mod notifier;
pub mod object_store;
pub mod processor;
pub mod sdk_errors;
pub mod secret_store;

#[cfg(test)]
pub mod fakes;
