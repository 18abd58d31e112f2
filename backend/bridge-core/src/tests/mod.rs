mod handshake;
mod messenger;
mod protocol;
