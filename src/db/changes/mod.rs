pub mod accept;
pub mod reject;
