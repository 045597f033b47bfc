pub mod attendance;
pub mod complaint;
pub mod decimal;
pub mod errors;
pub mod ids;
pub mod rights;
pub mod student;
