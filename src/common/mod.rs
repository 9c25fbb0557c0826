pub mod addr_check;
pub mod clock;
pub mod frame;
pub mod limits;
pub mod sample;
pub(crate) mod validation;
