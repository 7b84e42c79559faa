mod set_role;

pub use set_role::cmd_set_role;
