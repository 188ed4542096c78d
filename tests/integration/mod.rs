//! Integration tests for dotvault

mod cli_commands;
mod config_loading;
mod conflicts;
mod decrypt_callback;
mod init_then_link;
mod test_utils;
mod update_cycle;
