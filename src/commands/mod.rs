// Reports
pub mod list;
pub mod status;

// Declarative commands
pub mod apply;

// Convergence waits
pub mod wait;
