pub mod observer;

#[cfg(test)]
pub mod recording_observer;
