use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CnaError {
    #[error("Input matrix contains no probes or no samples")]
    EmptyInput,

    #[error("Invalid matrix shape: {0}")]
    InvalidMatrixShape(String),

    #[error("Non-finite value in input matrix at probe {probe} sample {sample}")]
    NonFiniteValue { probe: usize, sample: usize },

    #[error(
        "Permutation sampler accepted only {accepted} of {requested} trials after {attempts} attempts"
    )]
    PermutationConvergenceFailure {
        accepted: usize,
        requested: usize,
        attempts: usize,
    },

    #[error("Can't parse value '{value}' on line {line} of matrix file '{filename}'")]
    Parse {
        filename: Utf8PathBuf,
        line: usize,
        value: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CnaResult<T> = Result<T, CnaError>;
