pub mod export_message;
pub mod turn_pair;
