pub mod dispatcher;
pub mod effectors;

pub use dispatcher::dispatch;
