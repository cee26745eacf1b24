//! Paths command handler.
//!
//! Displays resolved paths for diagnostics.

use crate::bootstrap::CliEnv;

/// Execute the paths command.
pub fn execute(env: &CliEnv) {
    println!("data_dir = {}", env.data_dir.display());
    println!("state_file = {}", env.state_file.display());
    println!("settings_file = {}", env.settings_file.display());
    match &env.engine {
        Some(engine) => println!("engine = {}", engine.display()),
        None => println!("engine = {} (from PATH)", crimson_install::engine::ENGINE_BINARY),
    }
}
