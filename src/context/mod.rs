pub mod runlog;
pub mod state;

pub use runlog::{run_log_basename, save_run_log};
pub use state::{
    agent_dir, create_agent, get_run_history, list_agents, load_state, save_state_external,
    set_agent_status, state_at_start, update_state,
};
