use thiserror::Error;

#[derive(Debug, Error)]
pub enum TomtomError {
    #[error("pwm has {rows} rows (expected 4) and {cols} columns")]
    InvalidShape { rows: usize, cols: usize },

    #[error("{which} is empty: at least one pwm is required")]
    EmptyInput { which: &'static str },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("cache mutex was poisoned by a panicking worker; cache was reset")]
    PoisonedCache,
}

pub type TomtomResult<T> = Result<T, TomtomError>;
