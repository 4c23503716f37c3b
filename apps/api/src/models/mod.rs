pub mod email;
pub mod event;
