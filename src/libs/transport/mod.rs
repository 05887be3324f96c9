pub mod transport;

#[cfg(test)]
pub mod scripted_transport;
