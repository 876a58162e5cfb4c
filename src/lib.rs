pub mod interferometry;
pub mod logger;
