pub mod deliveries;
pub mod innings;
pub mod matches;
pub mod ws;
