//! Content tokens identifying the input file of a run.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Computes the token stamped on every row of a run
pub trait ContentTokenizer: Send + Sync + Debug {
    fn token(&self, path: &Path) -> Result<String>;
}

/// Lowercase hex SHA-256 of the file bytes as stored on disk
#[derive(Debug, Clone, Default)]
pub struct Sha256Tokenizer;

impl ContentTokenizer for Sha256Tokenizer {
    fn token(&self, path: &Path) -> Result<String> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];

        loop {
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}
