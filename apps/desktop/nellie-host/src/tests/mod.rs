mod error;
mod logger;
mod paths;
