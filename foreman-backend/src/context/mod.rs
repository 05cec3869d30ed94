pub mod run_context;
pub mod user_context;

pub use run_context::{RunContext, RunContextBuilder};
pub use user_context::{InvocationIdentity, RequestContext, UserContext, UserContextStore};
