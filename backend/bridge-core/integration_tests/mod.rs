mod helpers;
mod host;
mod messenger;
mod transport;
