pub mod projection;
pub mod viewport;
