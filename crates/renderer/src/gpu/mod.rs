mod context;
mod pipeline;
mod query;
mod state;
pub(crate) mod uniforms;

pub(crate) use state::GpuState;
