use mapping_rules::RulesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
