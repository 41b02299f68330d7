pub mod introspection;
pub mod options;
pub mod proc_loader;
pub mod proc_validator;
pub mod settings;
