pub mod dispatch;
pub mod internal;
pub mod record;
pub mod upstream;
