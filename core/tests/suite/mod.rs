// Aggregates all former standalone integration tests as modules.
mod contract_agent;
mod config_file;
