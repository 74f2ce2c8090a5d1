pub mod info;
pub mod port_forward;
