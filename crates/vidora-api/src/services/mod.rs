pub mod events;
pub mod streamer;
