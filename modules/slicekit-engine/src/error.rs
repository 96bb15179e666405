use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("dispatch called from inside a reducer or middleware")]
    ReentrantDispatch,
}
