pub mod deploy;
pub mod prepare_data;
pub mod stack_outputs;
pub mod transfer;
