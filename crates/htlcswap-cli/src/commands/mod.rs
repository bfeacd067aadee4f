pub mod offers;
pub mod status;
