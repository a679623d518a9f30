//! Motor de instancias: state machine sobre un grafo cargado.
mod machine;

pub use machine::InstanceMachine;
