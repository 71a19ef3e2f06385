pub mod generate;
pub mod init;

pub use generate::generate_command;
pub use init::init_command;
